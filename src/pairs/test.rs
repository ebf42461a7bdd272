// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Unit tests for bistatic pairs and the pair manager
*/
use super::*;
use crate::eigenverbs::{Eigenverb, EigenverbCollection, InterfaceType};
use crate::geo::Orientation;
use crate::ocean::Ocean;
use crate::seq::Seq;
use crate::sensors::{SensorModel, XmitRcvMode};
use crate::tasks::WorkerPool;
use std::sync::Mutex;
use std::time::Duration;

fn make_ctx() -> WaveContext {
    let ocean = Ocean::constant(2000.0, 1500.0);
    let pool = Arc::new(WorkerPool::new(2).unwrap());
    WaveContext::new(ocean, pool)
        .with_travel_times(Arc::new(Seq::linear(0.0, 0.05, 241).unwrap()))
}

fn make_sensor(key: i32, mode: XmitRcvMode, lat: f64, lng: f64) -> SensorRef {
    let sensor = SensorModel::new(key, &format!("sensor {key}"), mode);
    let sensor = Arc::new(sensor);
    sensor.set_kinematics(
        &WVector::from_geodetic(lat, lng, -100.0),
        &Orientation::default(),
        0.0,
    );
    sensor
}

/// Listener that records the publication order.
#[derive(Default)]
struct StageRecorder {
    stages: Mutex<Vec<(String, PairStage)>>,
    aborted: Mutex<Vec<String>>,
}

impl PairListener for StageRecorder {
    fn pair_updated(&self, pair_key: &str, stage: PairStage) {
        self.stages
            .lock()
            .unwrap()
            .push((pair_key.to_string(), stage));
    }

    fn pair_aborted(&self, pair_key: &str) {
        self.aborted.lock().unwrap().push(pair_key.to_string());
    }
}

fn make_verb(lat: f64, lng: f64) -> Eigenverb {
    let mut verb = Eigenverb {
        time: 1.5,
        power: vec![1e-4],
        length: 120.0,
        length2: 120.0 * 120.0,
        width: 60.0,
        width2: 60.0 * 60.0,
        position: WVector::from_geodetic(lat, lng, -2000.0),
        direction: 0.0,
        grazing: 30.0_f64.to_radians(),
        sound_speed: 1500.0,
        de_index: 3,
        az_index: 1,
        source_de: -0.5,
        source_az: 0.0,
        surface: 0,
        bottom: 1,
        caustic: 0,
        upper: 0,
        lower: 0,
        bounding_box: Default::default(),
    };
    verb.update_bounding_box();
    verb
}

fn make_rays(frequencies: crate::seq::SeqRef, source: &SensorRef, target: &SensorRef) -> EigenrayCollectionRef {
    let targets = TargetList::from_column(vec![target.position()], vec![target.key()]);
    let mut rays = EigenrayCollection::new(frequencies, source.position(), targets);
    rays.add_eigenray(
        0,
        0,
        Arc::new(Eigenray {
            time: 1.0,
            intensity: vec![1e-6],
            phase: vec![0.0],
            source_de: 0.25,
            source_az: 0.5,
            target_de: -0.25,
            target_az: 3.0,
            ..Default::default()
        }),
    );
    rays.sum_eigenrays();
    Arc::new(rays)
}

fn make_verbs(lat: f64, lng: f64) -> EigenverbCollectionRef {
    let mut verbs = EigenverbCollection::new(0);
    for k in 0..3 {
        verbs.add_eigenverb(InterfaceType::Bottom, make_verb(lat, lng + 0.001 * k as f64));
    }
    verbs.build_indexes();
    Arc::new(verbs)
}

#[test]
fn test_monostatic_pair_formation() {
    let ctx = make_ctx();
    let mut sensors = crate::sensors::SensorManager::new();
    sensors.add(make_sensor(1, XmitRcvMode::Both, 36.0, 16.0)).unwrap();
    let mut pairs = PairManager::new(ctx);
    pairs.update_pairs(&sensors);
    // when source = receiver, exactly one pair is created
    assert_eq!(pairs.keys(), vec!["1_1".to_string()]);
    let pair = pairs.find("1_1").unwrap();
    assert!(pair.is_monostatic());
}

#[test]
fn test_five_sensor_pair_set() {
    // plus pattern: #1 monostatic, #2 centre omni, #3 source only,
    // #4 receiver only below #3, #5 east with a 1 m minimum range
    let ctx = make_ctx();
    let mut sensors = crate::sensors::SensorManager::new();

    let s1 = {
        let mut model = SensorModel::new(1, "sensor 1", XmitRcvMode::Both);
        model.monostatic = true;
        let s = Arc::new(model);
        s.set_kinematics(
            &WVector::from_geodetic(36.1, 16.0, -100.0),
            &Orientation::default(),
            0.0,
        );
        s
    };
    let s5 = {
        let mut model = SensorModel::new(5, "sensor 5", XmitRcvMode::Both);
        model.min_range = 1.0;
        let s = Arc::new(model);
        s.set_kinematics(
            &WVector::from_geodetic(36.0, 16.1, -100.0),
            &Orientation::default(),
            0.0,
        );
        s
    };
    sensors.add(s1).unwrap();
    sensors.add(make_sensor(2, XmitRcvMode::Both, 36.0, 16.0)).unwrap();
    sensors.add(make_sensor(3, XmitRcvMode::Source, 36.0, 15.9)).unwrap();
    sensors.add(make_sensor(4, XmitRcvMode::Receiver, 35.9, 15.9)).unwrap();
    sensors.add(s5).unwrap();

    let mut pairs = PairManager::new(ctx);
    pairs.update_pairs(&sensors);
    let mut keys = pairs.keys();
    keys.sort();
    let mut expected = vec![
        "1_1", "2_2", "2_4", "2_5", "3_2", "3_4", "3_5", "5_2", "5_4",
    ];
    expected.sort_unstable();
    assert_eq!(keys, expected);
}

#[test]
fn test_duplicate_sensor_key_rejected() {
    let mut sensors = crate::sensors::SensorManager::new();
    sensors.add(make_sensor(7, XmitRcvMode::Both, 36.0, 16.0)).unwrap();
    let result = sensors.add(make_sensor(7, XmitRcvMode::Both, 36.0, 16.0));
    assert!(matches!(result, Err(ManagerError::KeyDuplicate(_))));
    assert!(matches!(
        sensors.remove(99),
        Err(ManagerError::KeyMissing(_))
    ));
}

#[test]
fn test_publication_order() {
    let ctx = make_ctx();
    let source = make_sensor(1, XmitRcvMode::Both, 36.0, 16.0);
    let pair = BistaticPair::new(source.clone(), source.clone(), ctx.clone());
    let recorder = Arc::new(StageRecorder::default());
    pair.add_pair_listener(recorder.clone());

    let frequencies = Arc::new(Seq::linear(1000.0, 0.0, 1).unwrap());
    let rays = make_rays(frequencies, &source, &source);
    let verbs = make_verbs(36.0, 16.0);
    pair.update_wavefront_data(source.key(), rays, Some(verbs));
    assert!(ctx.pool.wait_for_idle(Duration::from_secs(30)));

    let stages: Vec<PairStage> = recorder
        .stages
        .lock()
        .unwrap()
        .iter()
        .map(|(_, s)| *s)
        .collect();
    // direct paths before eigenverbs before biverbs before envelopes
    let direct = stages.iter().position(|&s| s == PairStage::DirectPaths);
    let verbs = stages.iter().position(|&s| s == PairStage::Eigenverbs);
    let biverbs = stages.iter().position(|&s| s == PairStage::Biverbs);
    let envelopes = stages.iter().position(|&s| s == PairStage::Envelopes);
    assert!(direct.is_some() && verbs.is_some());
    assert!(biverbs.is_some() && envelopes.is_some());
    assert!(direct < verbs && verbs < biverbs && biverbs < envelopes);

    // artifacts are all published
    assert!(pair.dirpaths().is_some());
    assert!(pair.src_eigenverbs().is_some());
    assert!(pair.rcv_eigenverbs().is_some());
    assert!(pair.biverbs().is_some());
    assert!(pair.envelopes().is_some());
    assert!(!pair.biverbs().unwrap().is_empty());
}

#[test]
fn test_monostatic_update_sets_both_verb_sides() {
    let ctx = make_ctx();
    let source = make_sensor(1, XmitRcvMode::Both, 36.0, 16.0);
    let pair = BistaticPair::new(source.clone(), source.clone(), ctx.clone());
    let frequencies = Arc::new(Seq::linear(1000.0, 0.0, 1).unwrap());
    let rays = make_rays(frequencies, &source, &source);
    let verbs = make_verbs(36.0, 16.0);
    pair.update_wavefront_data(source.key(), rays, Some(verbs.clone()));
    assert!(ctx.pool.wait_for_idle(Duration::from_secs(30)));
    assert!(Arc::ptr_eq(&pair.src_eigenverbs().unwrap(), &verbs));
    assert!(Arc::ptr_eq(&pair.rcv_eigenverbs().unwrap(), &verbs));
}

#[test]
fn test_receiver_update_swaps_ray_sense() {
    let ctx = make_ctx();
    let source = make_sensor(1, XmitRcvMode::Both, 36.0, 16.0);
    let receiver = make_sensor(2, XmitRcvMode::Both, 36.05, 16.0);
    let pair = BistaticPair::new(source.clone(), receiver.clone(), ctx.clone());

    // update arrives from the receiver side: the rays it computed point
    // at the source, and their sense must be reversed
    let frequencies = Arc::new(Seq::linear(1000.0, 0.0, 1).unwrap());
    let rays = make_rays(frequencies, &receiver, &source);
    pair.update_wavefront_data(receiver.key(), rays, None);
    assert!(ctx.pool.wait_for_idle(Duration::from_secs(30)));

    let dirpaths = pair.dirpaths().unwrap();
    let ray = &dirpaths.eigenrays(0, 0)[0];
    assert_eq!(ray.source_de, -0.25);
    assert_eq!(ray.target_de, 0.25);
    assert_eq!(ray.source_az, 3.0);
    assert_eq!(ray.target_az, 0.5);

    // only the receiver side verb pointer was touched
    assert!(pair.src_eigenverbs().is_none());
}

#[test]
fn test_source_update_keeps_ray_sense() {
    let ctx = make_ctx();
    let source = make_sensor(1, XmitRcvMode::Both, 36.0, 16.0);
    let receiver = make_sensor(2, XmitRcvMode::Both, 36.05, 16.0);
    let pair = BistaticPair::new(source.clone(), receiver.clone(), ctx.clone());
    let frequencies = Arc::new(Seq::linear(1000.0, 0.0, 1).unwrap());
    let rays = make_rays(frequencies, &source, &receiver);
    pair.update_wavefront_data(source.key(), rays, None);
    assert!(ctx.pool.wait_for_idle(Duration::from_secs(30)));
    let dirpaths = pair.dirpaths().unwrap();
    let ray = &dirpaths.eigenrays(0, 0)[0];
    assert_eq!(ray.source_de, 0.25);
    assert_eq!(ray.target_de, -0.25);
}

#[test]
fn test_reverb_disabled_stops_at_dirpaths() {
    let ctx = make_ctx();
    let sensor = {
        let mut model = SensorModel::new(3, "no reverb", XmitRcvMode::Both);
        model.compute_reverb = false;
        let s = Arc::new(model);
        s.set_kinematics(
            &WVector::from_geodetic(36.0, 16.0, -100.0),
            &Orientation::default(),
            0.0,
        );
        s
    };
    let pair = BistaticPair::new(sensor.clone(), sensor.clone(), ctx.clone());
    let recorder = Arc::new(StageRecorder::default());
    pair.add_pair_listener(recorder.clone());
    let frequencies = Arc::new(Seq::linear(1000.0, 0.0, 1).unwrap());
    let rays = make_rays(frequencies, &sensor, &sensor);
    pair.update_wavefront_data(sensor.key(), rays, Some(make_verbs(36.0, 16.0)));
    assert!(ctx.pool.wait_for_idle(Duration::from_secs(30)));
    let stages = recorder.stages.lock().unwrap();
    assert!(stages.iter().all(|(_, s)| *s == PairStage::DirectPaths));
    assert!(pair.biverbs().is_none());
    assert!(pair.envelopes().is_none());
}

#[test]
fn test_complement() {
    let ctx = make_ctx();
    let source = make_sensor(1, XmitRcvMode::Both, 36.0, 16.0);
    let receiver = make_sensor(2, XmitRcvMode::Both, 36.05, 16.0);
    let pair = BistaticPair::new(source.clone(), receiver.clone(), ctx);
    assert_eq!(pair.complement(1).key(), 2);
    assert_eq!(pair.complement(2).key(), 1);
    assert_eq!(pair.hash_key(), "1_2");
    // targets offered to each sensor are its complement
    let (id, _) = pair.target_for(1).unwrap();
    assert_eq!(id, 2);
    let (id, _) = pair.target_for(2).unwrap();
    assert_eq!(id, 1);
}
