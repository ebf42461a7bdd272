// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Unit tests for bistatic eigenverb generation
*/
use super::*;
use crate::geo::WVector;
use crate::ocean::Ocean;

fn make_verb(lat: f64, lng: f64, length: f64, width: f64, direction: f64) -> Eigenverb {
    let mut verb = Eigenverb {
        time: 2.0,
        power: vec![1e-4],
        length,
        length2: length * length,
        width,
        width2: width * width,
        position: WVector::from_geodetic(lat, lng, -2000.0),
        direction,
        grazing: 30.0_f64.to_radians(),
        sound_speed: 1500.0,
        de_index: 5,
        az_index: 6,
        source_de: -0.6,
        source_az: 0.1,
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

#[test]
fn test_overlap_identical_circular_verbs() {
    // analytic case: two identical circular footprints at the same spot
    let sigma = 100.0;
    let src = make_verb(36.0, 16.0, sigma, sigma, 0.0);
    let rcv = make_verb(36.0, 16.0, sigma, sigma, 0.0);
    let scatter = [1e-3];
    let pulse = 0.1;
    let biverb = compute_overlap(&src, &rcv, &scatter, pulse).unwrap();

    // power = 2 pi Ps Pr s / sqrt(4 sigma^4)
    let expected_power =
        2.0 * PI * 1e-4 * 1e-4 * 1e-3 / (4.0 * sigma.powi(4)).sqrt();
    assert!(
        (biverb.power[0] - expected_power).abs() < expected_power * 1e-9,
        "power {} expected {expected_power}",
        biverb.power[0]
    );

    // duration from sigma_t^2 = sigma^2 / 2
    let factor = rcv.grazing.cos() / rcv.sound_speed;
    let expected_duration =
        0.5 * (pulse * pulse + factor * factor * sigma * sigma / 2.0).sqrt();
    assert!(
        (biverb.duration - expected_duration).abs() < 1e-12,
        "duration {} expected {expected_duration}",
        biverb.duration
    );

    // two way travel time adds the verbs
    assert!((biverb.time - 4.0).abs() < 1e-12);
    assert_eq!(biverb.source_de_index, 5);
    assert_eq!(biverb.receiver_az_index, 6);
}

#[test]
fn test_overlap_decays_with_separation() {
    let sigma = 100.0;
    let src_near = make_verb(36.0, 16.0, sigma, sigma, 0.0);
    let src_far = make_verb(36.0 + 150.0 / 111_000.0, 16.0, sigma, sigma, 0.0);
    let rcv = make_verb(36.0, 16.0, sigma, sigma, 0.0);
    let scatter = [1e-3];
    let near = compute_overlap(&src_near, &rcv, &scatter, 0.1).unwrap();
    let far = compute_overlap(&src_far, &rcv, &scatter, 0.1).unwrap();
    assert!(far.power[0] < near.power[0]);
}

#[test]
fn test_overlap_distance_gate() {
    let sigma = 100.0;
    // peak 7 footprint lengths to the north: outside the 6 sigma gate
    let src = make_verb(36.0 + 7.0 * sigma / 111_000.0 * 6.0, 16.0, sigma, sigma, 0.0);
    let rcv = make_verb(36.0, 16.0, sigma, sigma, 0.0);
    let scatter = [1e-3];
    assert!(compute_overlap(&src, &rcv, &scatter, 0.1).is_none());
}

#[test]
fn test_overlap_intensity_threshold() {
    let sigma = 100.0;
    let mut src = make_verb(36.0, 16.0, sigma, sigma, 0.0);
    src.power = vec![1e-140];
    let mut rcv = make_verb(36.0, 16.0, sigma, sigma, 0.0);
    rcv.power = vec![1e-140];
    let scatter = [1e-40];
    assert!(compute_overlap(&src, &rcv, &scatter, 0.1).is_none());
}

#[test]
fn test_generate_biverbs_monostatic() {
    let ocean = Ocean::constant(2000.0, 1500.0);
    let freq = Seq::linear(1000.0, 10.0, 1).unwrap();
    let mut verbs = EigenverbCollection::new(0);
    for k in 0..5 {
        verbs.add_eigenverb(
            InterfaceType::Bottom,
            make_verb(36.0, 16.0 + 0.002 * k as f64, 120.0, 60.0, 0.1),
        );
    }
    verbs.build_indexes();
    let abort = AbortFlag::new();
    let collection =
        generate_biverbs(&ocean, &freq, &verbs, &verbs, 0.1, &abort).unwrap();
    // every verb at least overlaps itself
    assert!(collection.len() >= 5, "only {} biverbs", collection.len());
    assert_eq!(collection.num_interfaces(), 2);
    assert!(collection.biverbs(1).is_empty());
    for biverb in collection.biverbs(0) {
        assert!(biverb.power[0] > 0.0);
        assert!(biverb.duration > 0.05, "duration {}", biverb.duration);
        assert!((biverb.time - 4.0).abs() < 1e-9);
    }
}

#[test]
fn test_generate_biverbs_abort() {
    let ocean = Ocean::constant(2000.0, 1500.0);
    let freq = Seq::linear(1000.0, 10.0, 1).unwrap();
    let mut verbs = EigenverbCollection::new(0);
    verbs.add_eigenverb(InterfaceType::Bottom, make_verb(36.0, 16.0, 120.0, 60.0, 0.0));
    verbs.build_indexes();
    let abort = AbortFlag::new();
    abort.abort();
    assert!(generate_biverbs(&ocean, &freq, &verbs, &verbs, 0.1, &abort).is_none());
}

#[test]
fn test_wrap_angle() {
    assert!((wrap_angle(0.0) - 0.0).abs() < 1e-12);
    assert!((wrap_angle(PI) - PI).abs() < 1e-12);
    assert!((wrap_angle(-0.3) - 0.3).abs() < 1e-12);
    assert!((wrap_angle(2.0 * PI + 0.3) - 0.3).abs() < 1e-12);
    assert!((wrap_angle(2.0 * PI - 0.3) - 0.3).abs() < 1e-12);
}
