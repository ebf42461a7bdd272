// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Unit tests for the wavefront propagator
*/
use super::*;
use crate::ocean::Ocean;
use crate::seq::Seq;

const SPEED: f64 = 1500.0;

fn arc(seq: Seq) -> SeqRef {
    Arc::new(seq)
}

/// Iso-velocity scenario: source at 100 m depth in a 2 km deep ocean,
/// single target 2 km to the north at the same depth.
fn make_queue(spreading: SpreadingType, with_target: bool) -> WaveQueue {
    let ocean = Ocean::constant(2000.0, SPEED);
    let source = WVector::from_geodetic(36.0, 16.0, -100.0);
    let target = source.gc_position(2000.0, 0.0);
    let mut target = target;
    target.rho = source.rho; // same depth
    let targets = if with_target {
        TargetList::from_column(vec![target], vec![42])
    } else {
        TargetList::default()
    };
    WaveQueue::new(
        ocean,
        arc(Seq::linear(1000.0, 0.0, 1).unwrap()),
        source,
        arc(Seq::linear(-80.0, 2.0, 81).unwrap()),
        arc(Seq::linear(-10.0, 5.0, 5).unwrap()),
        0.05,
        targets,
        spreading,
    )
}

#[test]
fn test_direction_magnitude_invariant() {
    // for every cell and every time step the direction stays unit length
    let mut queue = make_queue(SpreadingType::ClassicRay, false);
    for _ in 0..40 {
        queue.step();
        let front = queue.curr();
        for d in 0..front.num_de() {
            for a in 0..front.num_az() {
                let n = front.index(d, a);
                if !front.valid[n] {
                    continue;
                }
                let norm = front.ndirection.get(d, a).vnorm();
                assert!(
                    (norm - 1.0).abs() < 1e-10,
                    "cell ({d},{a}) norm {norm} at step {}",
                    queue.step_count()
                );
            }
        }
    }
}

#[test]
fn test_wavefront_expands_at_sound_speed() {
    let mut queue = make_queue(SpreadingType::ClassicRay, false);
    let source = *queue.source_position();
    for _ in 0..10 {
        queue.step();
    }
    // a level ray that has not hit anything is c*t from the source
    let front = queue.curr();
    let d_level = 40; // de = 0 degrees
    let n = front.index(d_level, 2);
    assert!(front.valid[n]);
    assert_eq!(front.surface[n] + front.bottom[n], 0);
    let range = front.position.get(d_level, 2).distance(&source);
    let expected = SPEED * queue.time();
    assert!(
        (range - expected).abs() < 1.0,
        "range {range}, expected {expected}"
    );
    // cumulative path length agrees with the geometry
    assert!((front.path_length[n] - expected).abs() < 1.0);
}

#[test]
fn test_direct_and_bounce_eigenrays() {
    let mut queue = make_queue(SpreadingType::ClassicRay, true);
    while queue.time() < 4.0 {
        queue.step();
    }
    let (rays, _, _) = queue.into_collections();
    let list = rays.find_eigenrays(42);
    assert!(
        list.len() >= 4,
        "expected at least 4 eigenrays, found {}",
        list.len()
    );

    // the direct path arrives at r/c with no interface interactions
    let direct = list
        .iter()
        .find(|r| r.surface == 0 && r.bottom == 0)
        .expect("no direct path found");
    let expected_time = 2000.0 / SPEED;
    assert!(
        (direct.time - expected_time).abs() < 0.02,
        "direct time {} expected {expected_time}",
        direct.time
    );
    // spherical spreading plus a trace of absorption
    let tl = -10.0 * direct.intensity[0].max(1e-30).log10();
    let spherical = 20.0 * 2000.0_f64.log10();
    assert!(
        (tl - spherical).abs() < 1.2,
        "direct TL {tl} dB, spherical {spherical} dB"
    );
    // launch and arrival angles are nearly level
    assert!(direct.source_de.abs() < 0.05);
    assert!(direct.target_de.abs() < 0.05);

    // a surface bounce and a bottom bounce both show up
    let surface = list.iter().find(|r| r.surface == 1 && r.bottom == 0);
    assert!(surface.is_some(), "no surface bounce path");
    let bottom = list.iter().find(|r| r.bottom == 1 && r.surface == 0);
    assert!(bottom.is_some(), "no bottom bounce path");

    // the surface bounce is the longer path
    let surface = surface.unwrap();
    assert!(surface.time > direct.time);
    // surface reflection inverted the phase
    assert!((surface.phase[0] - std::f64::consts::PI).abs() < 0.5);
}

#[test]
fn test_eigenray_times_increase_with_bounces() {
    let mut queue = make_queue(SpreadingType::ClassicRay, true);
    while queue.time() < 4.0 {
        queue.step();
    }
    let (rays, _, _) = queue.into_collections();
    for ray in rays.find_eigenrays(42) {
        let direct_time = 2000.0 / SPEED;
        assert!(ray.time >= direct_time - 0.02);
        if ray.surface + ray.bottom > 0 {
            assert!(ray.time > direct_time);
        }
    }
}

#[test]
fn test_hybrid_gaussian_direct_path() {
    let mut queue = make_queue(SpreadingType::HybridGaussian, true);
    while queue.time() < 2.0 {
        queue.step();
    }
    let (rays, _, _) = queue.into_collections();
    let list = rays.find_eigenrays(42);
    let direct = list.iter().find(|r| r.surface == 0 && r.bottom == 0);
    let direct = direct.expect("no direct path found");
    let tl = -10.0 * direct.intensity[0].max(1e-30).log10();
    let spherical = 20.0 * 2000.0_f64.log10();
    assert!(
        (tl - spherical).abs() < 2.0,
        "hybrid TL {tl} dB, spherical {spherical} dB"
    );
}

#[test]
fn test_eigenverb_generation() {
    let mut queue = make_queue(SpreadingType::ClassicRay, false);
    queue.enable_eigenverbs();
    while queue.time() < 4.0 {
        queue.step();
    }
    let (_, verbs, _) = queue.into_collections();
    let verbs = verbs.expect("eigenverbs were enabled");

    let bottom = verbs.eigenverbs(InterfaceType::Bottom.index());
    let surface = verbs.eigenverbs(InterfaceType::Surface.index());
    assert!(!bottom.is_empty(), "no bottom eigenverbs");
    assert!(!surface.is_empty(), "no surface eigenverbs");

    for verb in bottom {
        assert!(verb.time > 0.0 && verb.time < 4.1);
        assert!(verb.grazing > 0.0 && verb.grazing <= std::f64::consts::FRAC_PI_2 + 1e-6);
        assert!(verb.length > 0.0 && verb.width > 0.0);
        assert!(verb.length >= verb.width * 0.99);
        assert!(verb.power.iter().all(|&p| p.is_finite() && p >= 0.0));
        assert!(verb.power.iter().any(|&p| p > 0.0));
        assert!((0.0..crate::geo::TWO_PI).contains(&verb.direction));
        assert!(verb.bottom >= 1);
        // impact point is on the bottom
        assert!((verb.position.altitude() + 2000.0).abs() < 5.0);
    }

    // the first bottom strike comes from the steepest ray
    let earliest = bottom
        .iter()
        .map(|v| v.time)
        .fold(f64::INFINITY, f64::min);
    let steep_time = 1900.0 / (SPEED * 80.0_f64.to_radians().sin());
    assert!(
        (earliest - steep_time).abs() < 0.2,
        "earliest bottom verb {earliest}, expected near {steep_time}"
    );
}

#[test]
fn test_trace_recording() {
    let mut queue = make_queue(SpreadingType::ClassicRay, false);
    queue.enable_trace();
    for _ in 0..5 {
        queue.step();
    }
    let (_, _, trace) = queue.into_collections();
    let trace = trace.expect("trace was enabled");
    assert_eq!(trace.travel_times.len(), 6);
    assert_eq!(trace.latitude.len(), 6);
    assert_eq!(trace.latitude[0].len(), 81 * 5);
    // frame zero is the source position
    assert!((trace.altitude[0][0] + 100.0).abs() < 1e-6);
    assert!((trace.travel_times[5] - 0.25).abs() < 1e-9);
}

#[test]
fn test_invalid_cells_do_not_emit() {
    let mut queue = make_queue(SpreadingType::ClassicRay, true);
    // poison one cell; it must never produce an eigenray
    let n = queue.curr.index(40, 2);
    queue.curr.valid[n] = false;
    queue.next.valid[n] = false;
    while queue.time() < 2.0 {
        queue.step();
    }
    let (rays, _, _) = queue.into_collections();
    // the direct path would have come from the poisoned cell
    let list = rays.find_eigenrays(42);
    assert!(list
        .iter()
        .all(|r| r.surface + r.bottom > 0 || r.source_de.abs() > 0.01));
}
