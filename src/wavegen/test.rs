// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Scenario tests for background propagation and the full reverberation
chain
*/
use super::*;
use crate::geo::{Orientation, WVector};
use crate::ocean::Ocean;
use crate::pairs::{PairListener, PairManager, PairStage};
use crate::sensors::{SensorManager, SensorModel, SensorRef, XmitRcvMode};
use crate::tasks::WorkerPool;
use std::sync::Mutex;
use std::time::Duration;

const SPEED: f64 = 1500.0;

fn make_ctx() -> WaveContext {
    let ocean = Ocean::constant(2000.0, SPEED);
    let pool = Arc::new(WorkerPool::new(2).unwrap());
    WaveContext::new(ocean, pool)
        .with_travel_times(Arc::new(Seq::linear(0.0, 0.05, 161).unwrap()))
}

/// Sensor tuned for fast scenario runs: narrow azimuth window aimed at
/// `az_centre`, 1 degree DE fan, 6 second runs.
fn make_sensor(key: i32, mode: XmitRcvMode, lat: f64, lng: f64, az_centre: f64) -> SensorRef {
    let mut model = SensorModel::new(key, &format!("sensor {key}"), mode);
    model.de_fan = Arc::new(Seq::linear(-80.0, 1.0, 161).unwrap());
    model.az_fan = Arc::new(Seq::linear(az_centre - 20.0, 10.0, 5).unwrap());
    model.frequencies = Arc::new(Seq::linear(900.0, 100.0, 2).unwrap());
    model.time_step = 0.05;
    model.time_max = 6.0;
    model.pulse_length = 0.1;
    let sensor = Arc::new(model);
    sensor.set_kinematics(
        &WVector::from_geodetic(lat, lng, -100.0),
        &Orientation::default(),
        0.0,
    );
    sensor
}

#[derive(Default)]
struct StageRecorder {
    stages: Mutex<Vec<(String, PairStage)>>,
}

impl PairListener for StageRecorder {
    fn pair_updated(&self, pair_key: &str, stage: PairStage) {
        self.stages
            .lock()
            .unwrap()
            .push((pair_key.to_string(), stage));
    }
}

#[test]
fn test_monostatic_reverberation_chain() {
    let ctx = make_ctx();
    let mut sensors = SensorManager::new();
    let sensor = make_sensor(1, XmitRcvMode::Both, 36.0, 16.0, 0.0);
    sensors.add(sensor.clone()).unwrap();
    let mut pairs = PairManager::new(ctx.clone());
    pairs.update_pairs(&sensors);
    assert_eq!(pairs.len(), 1);

    let recorder = Arc::new(StageRecorder::default());
    let pair = pairs.find("1_1").unwrap().clone();
    pair.add_pair_listener(recorder.clone());

    let position = sensor.position();
    let orientation = sensor.orientation();
    let task = update_sensor(&sensor, &position, &orientation, true, &ctx);
    assert!(task.is_some());
    assert!(ctx.pool.wait_for_idle(Duration::from_secs(300)));

    // the whole chain published
    assert!(pair.dirpaths().is_some());
    let verbs = pair.src_eigenverbs().expect("no source eigenverbs");
    assert!(Arc::ptr_eq(&verbs, &pair.rcv_eigenverbs().unwrap()));
    assert!(!verbs.is_empty());
    let biverbs = pair.biverbs().expect("no biverbs");
    assert!(!biverbs.is_empty());
    let envelopes = pair.envelopes().expect("no envelopes");

    // publication order: direct paths, then eigenverbs, then biverbs,
    // then envelopes
    let stages: Vec<PairStage> = recorder
        .stages
        .lock()
        .unwrap()
        .iter()
        .map(|(_, s)| *s)
        .collect();
    let direct = stages.iter().position(|&s| s == PairStage::DirectPaths);
    let everbs = stages.iter().position(|&s| s == PairStage::Eigenverbs);
    let biverb_stage = stages.iter().position(|&s| s == PairStage::Biverbs);
    let env_stage = stages.iter().position(|&s| s == PairStage::Envelopes);
    assert!(direct.is_some() && everbs.is_some());
    assert!(biverb_stage.is_some() && env_stage.is_some());
    assert!(direct < everbs && everbs < biverb_stage && biverb_stage < env_stage);

    // the first bottom return arrives at twice the one way travel time
    // of the steepest ray in the fan
    let bottom = biverbs.biverbs(0);
    assert!(!bottom.is_empty());
    let earliest = bottom.iter().map(|b| b.time).fold(f64::INFINITY, f64::min);
    let steepest = 1900.0 / (SPEED * 80.0_f64.to_radians().sin());
    assert!(
        (earliest - 2.0 * steepest).abs() < 0.3,
        "earliest bottom biverb {earliest}, expected near {}",
        2.0 * steepest
    );

    // the envelope has measurable energy at the bottom return time
    let times = envelopes.travel_times().clone();
    let mut bottom_energy = 0.0;
    for t in 0..times.size() {
        if times.value(t) > 2.4 && times.value(t) < 3.5 {
            bottom_energy += envelopes.intensity(0, 0, 0, t);
        }
    }
    assert!(bottom_energy > 0.0, "no envelope energy at the bottom return");
}

#[test]
fn test_bistatic_pair_scenario() {
    let ctx = make_ctx();
    let mut sensors = SensorManager::new();
    // sensor 1 looks north at sensor 2, sensor 2 looks back south
    let s1 = make_sensor(1, XmitRcvMode::Both, 36.0, 16.0, 0.0);
    let s2 = make_sensor(2, XmitRcvMode::Both, 36.05, 16.0, 180.0);
    sensors.add(s1.clone()).unwrap();
    sensors.add(s2.clone()).unwrap();
    let mut pairs = PairManager::new(ctx.clone());
    pairs.update_pairs(&sensors);

    // monostatic and cross pairs all exist
    let mut keys = pairs.keys();
    keys.sort();
    assert_eq!(keys, vec!["1_1", "1_2", "2_1", "2_2"]);

    for sensor in [&s1, &s2] {
        let position = sensor.position();
        let orientation = sensor.orientation();
        update_sensor(sensor, &position, &orientation, true, &ctx);
    }
    assert!(ctx.pool.wait_for_idle(Duration::from_secs(600)));

    // the cross pair has at least 4 direct-path eigenrays
    let pair = pairs.find("1_2").unwrap();
    let dirpaths = pair.dirpaths().expect("no direct paths");
    let rays = dirpaths.eigenrays(0, 0);
    assert!(
        rays.len() >= 4,
        "expected at least 4 direct paths, found {}",
        rays.len()
    );

    // the direct blast arrives at range / c
    let (range, _) = s1.position().gc_range(&s2.position());
    let direct = rays
        .iter()
        .find(|r| r.surface == 0 && r.bottom == 0)
        .expect("no direct path");
    assert!(
        (direct.time - range / SPEED).abs() < 0.05,
        "direct time {} for range {range}",
        direct.time
    );

    // transmission loss close to spherical spreading at the direct range
    let tl = -10.0 * direct.intensity[0].max(1e-30).log10();
    let spherical = 20.0 * range.log10();
    assert!(
        (tl - spherical).abs() < 1.0,
        "direct TL {tl} dB vs spherical {spherical} dB"
    );

    // both verb sides eventually arrive on the cross pair, producing
    // bistatic reverberation
    assert!(pair.src_eigenverbs().is_some());
    assert!(pair.rcv_eigenverbs().is_some());
    assert!(pair.biverbs().is_some());
    assert!(pair.envelopes().is_some());
}

#[test]
fn test_second_update_aborts_first() {
    let ctx = make_ctx();
    let mut sensors = SensorManager::new();
    let sensor = make_sensor(1, XmitRcvMode::Both, 36.0, 16.0, 0.0);
    sensors.add(sensor.clone()).unwrap();
    let mut pairs = PairManager::new(ctx.clone());
    pairs.update_pairs(&sensors);

    let position = sensor.position();
    let orientation = sensor.orientation();
    let first = update_sensor(&sensor, &position, &orientation, true, &ctx).unwrap();
    let second = update_sensor(&sensor, &position, &orientation, true, &ctx).unwrap();
    assert_ne!(first.id(), second.id());
    assert!(ctx.pool.wait_for_idle(Duration::from_secs(300)));
    // the first task was told to abort and both have terminated
    assert!(first.abort_flag().is_aborted());
    assert!(first.is_done() && second.is_done());
    // the surviving update still published a full chain
    let pair = pairs.find("1_1").unwrap();
    assert!(pair.dirpaths().is_some());
}

#[test]
fn test_threshold_suppresses_update() {
    let ctx = make_ctx();
    let sensor = make_sensor(1, XmitRcvMode::Both, 36.0, 16.0, 0.0);
    let position = sensor.position();
    let orientation = sensor.orientation();
    // a tiny move stays inside the 10 m position threshold
    let nudged = WVector::new(position.rho + 1.0, position.theta, position.phi);
    assert!(update_sensor(&sensor, &nudged, &orientation, false, &ctx).is_none());
    // a large move forces a new run
    let moved = WVector::new(position.rho + 100.0, position.theta, position.phi);
    assert!(update_sensor(&sensor, &moved, &orientation, false, &ctx).is_some());
    assert!(ctx.pool.wait_for_idle(Duration::from_secs(300)));
}
