// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Unit tests for the spreading models
*/
use super::*;
use crate::ocean::Ocean;
use crate::seq::Seq;

const TIME_STEP: f64 = 0.1;
const SPEED: f64 = 1500.0;

/// Place every ray of a fan at radius `range` from the source using the
/// first order tangent-frame offsets. The same mapping positions the
/// targets, so closest points of approach land exactly on cell centres.
fn shell(source: &WVector, de_fan: &Seq, az_fan: &Seq, range: f64) -> WaveFront {
    let mut front = WaveFront::new(de_fan.size(), az_fan.size(), 1, 0);
    for d in 0..de_fan.size() {
        for a in 0..az_fan.size() {
            let dir = WVector::from_de_az(
                de_fan.value(d).to_radians(),
                az_fan.value(a).to_radians(),
            );
            let pos = offset_position(source, &dir, range);
            front.position.set(d, a, &pos);
            front.ndirection.set(d, a, &dir);
            let n = front.index(d, a);
            front.path_length[n] = range;
        }
    }
    front
}

fn offset_position(source: &WVector, dir: &WVector, range: f64) -> WVector {
    WVector::new(
        source.rho + range * dir.rho,
        source.theta + range * dir.theta / source.rho,
        source.phi + range * dir.phi / (source.rho * source.theta.sin()),
    )
}

struct Shells {
    prev: WaveFront,
    curr: WaveFront,
    next: WaveFront,
    de_fan: Seq,
    az_fan: Seq,
    frequencies: Seq,
    ocean: crate::ocean::OceanRef,
}

fn make_shells(range: f64) -> (Shells, WVector) {
    let source = WVector::from_geodetic(30.0, -45.0, -1000.0);
    let de_fan = Seq::linear(-10.0, 5.0, 5).unwrap();
    let az_fan = Seq::linear(-10.0, 5.0, 5).unwrap();
    let frequencies = Seq::linear(1000.0, 10.0, 1).unwrap();
    let ocean = Ocean::constant(30_000.0, SPEED);
    let shells = Shells {
        prev: shell(&source, &de_fan, &az_fan, range - SPEED * TIME_STEP),
        curr: shell(&source, &de_fan, &az_fan, range),
        next: shell(&source, &de_fan, &az_fan, range + SPEED * TIME_STEP),
        de_fan,
        az_fan,
        frequencies,
        ocean,
    };
    (shells, source)
}

impl Shells {
    fn ctx(&self) -> SpreadContext<'_> {
        SpreadContext {
            prev: &self.prev,
            curr: &self.curr,
            next: &self.next,
            de_fan: &self.de_fan,
            az_fan: &self.az_fan,
            frequencies: &self.frequencies,
            time_step: TIME_STEP,
            ocean: &*self.ocean,
        }
    }
}

#[test]
fn test_classic_ray_spherical_spreading() {
    // for a constant speed ocean and a spherical source, the classic ray
    // model reproduces 1/r^2 within 0.5 dB from 100 m to 100 km
    for range in [100.0, 1000.0, 10_000.0, 100_000.0] {
        let (shells, source) = make_shells(range);
        let spreading = Spreading::new(
            SpreadingType::ClassicRay,
            &shells.de_fan,
            &shells.az_fan,
            SPEED,
        );
        let dir = WVector::from_de_az(0.0, 0.0);
        let target = offset_position(&source, &dir, range);
        let mut intensity = [0.0];
        spreading.intensity(
            &shells.ctx(),
            &target,
            2,
            2,
            &[0.0, 0.0, 0.0],
            &mut intensity,
        );
        let db_error = 10.0 * (intensity[0] * range * range).log10();
        assert!(
            db_error.abs() < 0.5,
            "range {range}: {db_error} dB from spherical spreading"
        );
    }
}

#[test]
fn test_hybrid_gaussian_matches_ray_in_smooth_field() {
    let range = 10_000.0;
    let (shells, source) = make_shells(range);
    let spreading = Spreading::new(
        SpreadingType::HybridGaussian,
        &shells.de_fan,
        &shells.az_fan,
        SPEED,
    );
    let dir = WVector::from_de_az(0.0, 0.0);
    let target = offset_position(&source, &dir, range);
    let mut intensity = [0.0];
    spreading.intensity(
        &shells.ctx(),
        &target,
        2,
        2,
        &[0.0, 0.0, 0.0],
        &mut intensity,
    );
    let db_error = 10.0 * (intensity[0] * range * range).log10();
    assert!(
        db_error.abs() < 1.0,
        "{db_error} dB from spherical spreading"
    );
}

#[test]
fn test_hybrid_gaussian_decays_off_fan() {
    // a target several beam widths outside the fan sees a weaker field,
    // with no artificial clamp to zero
    let range = 10_000.0;
    let (shells, source) = make_shells(range);
    let spreading = Spreading::new(
        SpreadingType::HybridGaussian,
        &shells.de_fan,
        &shells.az_fan,
        SPEED,
    );
    let inside_dir = WVector::from_de_az(0.0, 0.0);
    let outside_dir = WVector::from_de_az(25.0_f64.to_radians(), 0.0);
    let inside = offset_position(&source, &inside_dir, range);
    let outside = offset_position(&source, &outside_dir, range);
    let mut on_fan = [0.0];
    let mut off_fan = [0.0];
    spreading.intensity(&shells.ctx(), &inside, 2, 2, &[0.0, 0.0, 0.0], &mut on_fan);
    spreading.intensity(&shells.ctx(), &outside, 4, 2, &[0.0, 0.4, 0.0], &mut off_fan);
    assert!(off_fan[0] < on_fan[0]);
    assert!(off_fan[0] >= 0.0);
}

#[test]
fn test_widths_scale_with_range() {
    let (near, _) = make_shells(1000.0);
    let (far, _) = make_shells(10_000.0);
    let spreading = Spreading::new(
        SpreadingType::HybridGaussian,
        &near.de_fan,
        &near.az_fan,
        SPEED,
    );
    let w_near = spreading.width_de(&near.ctx(), 2, 2);
    let w_far = spreading.width_de(&far.ctx(), 2, 2);
    // beam width grows linearly with range for a spherical wavefront
    assert!((w_far / w_near - 10.0).abs() < 0.1);
    // half of the 5 degree spacing at 1 km is about 43.6 m
    assert!((w_near - 1000.0 * 5.0_f64.to_radians() / 2.0).abs() < 2.0);
}

#[test]
fn test_width_az_narrows_with_de() {
    // azimuthal spacing shrinks as cos(de) away from the horizontal
    let (shells, _) = make_shells(10_000.0);
    let spreading = Spreading::new(
        SpreadingType::HybridGaussian,
        &shells.de_fan,
        &shells.az_fan,
        SPEED,
    );
    let level = spreading.width_az(&shells.ctx(), 2, 2);
    let tilted = spreading.width_az(&shells.ctx(), 4, 2);
    assert!(tilted < level);
}

#[test]
fn test_solid_angle() {
    let de_fan = Seq::linear(-10.0, 5.0, 5).unwrap();
    let az_fan = Seq::linear(-10.0, 5.0, 5).unwrap();
    let spreading = Spreading::new(SpreadingType::ClassicRay, &de_fan, &az_fan, SPEED);
    let expected = (5.0_f64.to_radians().sin() - 0.0_f64.sin()) * 5.0_f64.to_radians();
    assert!((spreading.solid_angle(2, 2, SPEED) - expected).abs() < 1e-12);
}
