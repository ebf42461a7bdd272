// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Unit tests for ocean environment models
*/
use super::*;
use crate::geo::WVector;
use crate::grid::DataGrid;
use crate::seq::Seq;
use std::sync::Arc;

#[test]
fn test_mackenzie_reference_values() {
    // reference values from the UK National Physical Laboratory tables
    let cases = [
        (25.8543, 34.6954, 0.0, 1535.978),
        (4.3149, 34.5221, 1000.0, 1483.646),
        (1.4465, 34.6968, 5000.0, 1540.647),
    ];
    for (t, s, d, expected) in cases {
        let c = mackenzie(t, s, d);
        let tolerance = expected * 1e-5;
        assert!(
            (c - expected).abs() < tolerance,
            "mackenzie({t},{s},{d}) = {c}, expected {expected}"
        );
    }
}

#[test]
fn test_mackenzie_grid_builder() {
    let lat = 36.0;
    let rho_axis = Arc::new(
        Seq::linear(crate::geo::earth_radius(lat) - 1000.0, 500.0, 3).unwrap(),
    );
    let theta_axis = Arc::new(Seq::linear(crate::geo::to_colatitude(lat), 0.01, 2).unwrap());
    let phi_axis = Arc::new(Seq::linear(0.28, 0.01, 2).unwrap());
    let mut temp = DataGrid::zeroed([rho_axis.clone(), theta_axis.clone(), phi_axis.clone()]);
    let mut salt = DataGrid::zeroed([rho_axis, theta_axis, phi_axis]);
    for i in 0..3 {
        for j in 0..2 {
            for k in 0..2 {
                temp.set_data(&[i, j, k], 10.0);
                salt.set_data(&[i, j, k], 35.0);
            }
        }
    }
    let speed = mackenzie_grid(&temp, &salt).unwrap();
    // deepest node is index 0 on an ascending rho axis
    let shallow = speed.data(&[2, 0, 0]);
    let deep = speed.data(&[0, 0, 0]);
    assert!(deep > shallow, "speed should increase with depth");
    assert!((shallow - mackenzie(10.0, 35.0, 0.0)).abs() < 0.5);
}

#[test]
fn test_chapman_scattering_reference() {
    // wind 5 m/s, 1 kHz, 10 degree grazing
    let freq = Seq::linear(1000.0, 1.0, 1).unwrap();
    let model = ScatteringChapman::new(5.0);
    let mut amp = [0.0];
    let grazing = 10.0_f64.to_radians();
    let pos = WVector::from_geodetic(36.0, 16.0, 0.0);
    model.scattering(&pos, &freq, grazing, grazing, 0.0, 0.0, &mut amp);

    let knots = 5.0 * 1.94384449;
    let beta = 158.0 * (knots * 1000.0_f64.cbrt()).powf(-0.58);
    let expected_db = 2.6 - 42.4 * beta.log10() + 3.3 * beta * (10.0_f64 / 30.0).log10();
    let got_db = 10.0 * amp[0].log10();
    assert!(
        (got_db - expected_db).abs() < 1e-6,
        "chapman strength {got_db} dB, expected {expected_db} dB"
    );
}

#[test]
fn test_lambert_scattering() {
    let freq = Seq::linear(1000.0, 1.0, 1).unwrap();
    let model = ScatteringLambert::default();
    let pos = WVector::from_geodetic(0.0, 0.0, -2000.0);
    let mut amp = [0.0];
    let g = 30.0_f64.to_radians();
    model.scattering(&pos, &freq, g, g, 0.0, 0.0, &mut amp);
    let expected = 10.0_f64.powf(-2.7) * g.sin() * g.sin();
    assert!((amp[0] - expected).abs() < 1e-12);
}

#[test]
fn test_profile_linear_gradient() {
    let profile = ProfileLinear::linear(1500.0, 0.017);
    let pos = WVector::from_geodetic(0.0, 0.0, -1000.0);
    let (c, g) = profile.sound_speed(&pos);
    assert!((c - 1517.0).abs() < 1e-9);
    // c increases with depth so it decreases with rho
    assert!((g.rho + 0.017).abs() < 1e-12);
}

#[test]
fn test_profile_bilinear_break() {
    let profile = ProfileLinear::bilinear(1500.0, -0.05, 1000.0, 0.017);
    let above = WVector::from_geodetic(0.0, 0.0, -500.0);
    let below = WVector::from_geodetic(0.0, 0.0, -2000.0);
    let (c_above, g_above) = profile.sound_speed(&above);
    let (c_below, g_below) = profile.sound_speed(&below);
    assert!((c_above - 1475.0).abs() < 1e-9);
    assert!((c_below - (1500.0 - 50.0 + 17.0)).abs() < 1e-9);
    assert!((g_above.rho - 0.05).abs() < 1e-12);
    assert!((g_below.rho + 0.017).abs() < 1e-12);
}

#[test]
fn test_profile_munk_axis_minimum() {
    let profile = ProfileMunk::default();
    let axis = WVector::from_geodetic(0.0, 0.0, -1300.0);
    let (c_axis, g_axis) = profile.sound_speed(&axis);
    assert!((c_axis - 1500.0).abs() < 1e-9);
    assert!(g_axis.rho.abs() < 1e-9, "gradient at axis {}", g_axis.rho);
    // speed grows away from the channel axis in both directions
    let shallow = WVector::from_geodetic(0.0, 0.0, -300.0);
    let deep = WVector::from_geodetic(0.0, 0.0, -3300.0);
    assert!(profile.sound_speed(&shallow).0 > c_axis);
    assert!(profile.sound_speed(&deep).0 > c_axis);
}

#[test]
fn test_profile_n2_and_catenary() {
    // N-squared linear: c(z) = c0 / sqrt(1 + 2 g0 z / c0)
    let n2 = ProfileN2::new(1500.0, 0.017);
    let pos = WVector::from_geodetic(0.0, 0.0, -1000.0);
    let (c, g) = n2.sound_speed(&pos);
    let expected = 1500.0 / (1.0 + 2.0 * 0.017 * 1000.0 / 1500.0_f64).sqrt();
    assert!((c - expected).abs() < 1e-9);
    // speed falls with depth here, so it rises with rho
    assert!(g.rho > 0.0);

    // catenary has its minimum at the channel axis
    let catenary = ProfileCatenary::new(1500.0, 0.017, 1300.0);
    let axis = WVector::from_geodetic(0.0, 0.0, -1300.0);
    let (c_axis, g_axis) = catenary.sound_speed(&axis);
    assert!((c_axis - 1500.0).abs() < 1e-9);
    assert!(g_axis.rho.abs() < 1e-9);
    let shallow = WVector::from_geodetic(0.0, 0.0, -300.0);
    assert!(catenary.sound_speed(&shallow).0 > c_axis);
}

#[test]
fn test_profile_grid_matches_linear() {
    // 1-D gridded profile sampled from a linear profile reproduces it
    let analytic = ProfileLinear::linear(1500.0, 0.017);
    let earth = crate::geo::earth_radius(0.0);
    let rho_axis = Arc::new(Seq::linear(earth - 3000.0, 100.0, 31).unwrap());
    let mut grid = DataGrid::zeroed([rho_axis.clone()]);
    for i in 0..31 {
        let depth = earth - rho_axis.value(i);
        grid.set_data(&[i], 1500.0 + 0.017 * depth);
    }
    let profile = ProfileGrid::new(grid);
    let pos = WVector::from_geodetic(0.0, 0.0, -1234.5);
    let (c_grid, g_grid) = profile.sound_speed(&pos);
    let (c_true, g_true) = analytic.sound_speed(&pos);
    assert!((c_grid - c_true).abs() < 1e-6, "{c_grid} vs {c_true}");
    assert!((g_grid.rho - g_true.rho).abs() < 1e-9);
}

#[test]
fn test_flat_earth_correction() {
    let profile = ProfileLinear::constant(1500.0).with_flat_earth();
    let pos = WVector::from_geodetic(0.0, 0.0, -1000.0);
    let (c, g) = profile.sound_speed(&pos);
    let scale = pos.rho / crate::geo::earth_radius(0.0);
    assert!((c - 1500.0 * scale).abs() < 1e-9);
    // constant profile picks up a c/R pseudo-gradient
    assert!((g.rho - 1500.0 / crate::geo::earth_radius(0.0)).abs() < 1e-12);
}

#[test]
fn test_thorp_attenuation_magnitude() {
    let att = AttenuationThorp;
    let freq = Seq::linear(1000.0, 1000.0, 2).unwrap();
    let pos = WVector::from_geodetic(0.0, 0.0, -100.0);
    let mut loss = [0.0; 2];
    att.attenuation(&pos, &freq, 10_000.0, &mut loss);
    // roughly 0.06 dB/km at 1 kHz, and increasing with frequency
    assert!(loss[0] > 0.3 && loss[0] < 1.5, "1 kHz loss {}", loss[0]);
    assert!(loss[1] > loss[0]);
}

#[test]
fn test_boundary_flat_heights() {
    let surface = BoundaryFlat::surface();
    let bottom = BoundaryFlat::bottom(2000.0);
    let pos = WVector::from_geodetic(36.0, 16.0, -100.0);
    let (s_rho, s_normal) = surface.height(&pos);
    let (b_rho, b_normal) = bottom.height(&pos);
    assert!((s_rho - crate::geo::earth_radius(36.0)).abs() < 1e-6);
    assert!((s_rho - b_rho - 2000.0).abs() < 1e-6);
    assert_eq!(s_normal, WVector::new(1.0, 0.0, 0.0));
    assert_eq!(b_normal, WVector::new(1.0, 0.0, 0.0));
}

#[test]
fn test_boundary_grid_slope_normal() {
    // bottom sloping up toward the north at 45 degrees
    let lat0 = 0.0;
    let earth = crate::geo::earth_radius(lat0);
    let theta_axis = Arc::new(Seq::linear(1.4, 0.01, 20).unwrap());
    let phi_axis = Arc::new(Seq::linear(0.0, 0.01, 20).unwrap());
    let mut grid = DataGrid::zeroed([theta_axis.clone(), phi_axis]);
    for i in 0..20 {
        for j in 0..20 {
            // depth shoals to the north (theta decreasing)
            let depth = 2000.0 + (theta_axis.value(i) - 1.5) * earth;
            grid.set_data(&[i, j], earth - depth);
        }
    }
    let boundary = BoundaryGrid::new(
        grid,
        Arc::new(ReflectLossConstant::new(0.0)),
        Arc::new(ScatteringLambert::default()),
    );
    let pos = WVector::new(earth - 1000.0, 1.45, 0.05);
    let (_rho, normal) = boundary.height(&pos);
    // slope of 1 m/m: normal tilts 45 degrees downslope, toward +theta
    assert!((normal.theta - (0.5_f64).sqrt()).abs() < 0.02, "n_theta {}", normal.theta);
    assert!((normal.rho - (0.5_f64).sqrt()).abs() < 0.02, "n_rho {}", normal.rho);
}

#[test]
fn test_rayleigh_total_internal_reflection() {
    let freq = Seq::linear(1000.0, 1.0, 1).unwrap();
    let pos = WVector::from_geodetic(0.0, 0.0, -2000.0);
    let model = ReflectLossRayleigh::new(1.9, 1.1, 0.0);
    let mut shallow = [0.0];
    let mut steep = [0.0];
    // below the critical angle reflection is nearly perfect
    model.reflect_loss(&pos, &freq, 2.0_f64.to_radians(), &mut shallow, None);
    // steep angles transmit energy into the bottom
    model.reflect_loss(&pos, &freq, 80.0_f64.to_radians(), &mut steep, None);
    assert!(shallow[0] < 0.5, "shallow loss {}", shallow[0]);
    assert!(steep[0] > shallow[0] + 1.0, "steep loss {}", steep[0]);
}

#[test]
fn test_volume_flat_layer() {
    let layer = VolumeFlat::new(500.0, 100.0);
    let pos = WVector::from_geodetic(10.0, 10.0, -100.0);
    let (rho, thickness) = layer.depth(&pos);
    assert!((crate::geo::earth_radius(10.0) - rho - 500.0).abs() < 1e-6);
    assert_eq!(thickness, 100.0);
}

#[test]
fn test_ocean_aggregate() {
    let mut ocean = Ocean::new(
        Arc::new(BoundaryFlat::surface()),
        Arc::new(BoundaryFlat::bottom(2000.0)),
        Arc::new(ProfileLinear::constant(1500.0)),
    );
    ocean.add_volume(Arc::new(VolumeFlat::new(500.0, 100.0)));
    assert_eq!(ocean.num_volumes(), 1);
    let pos = WVector::from_geodetic(36.0, 16.0, -100.0);
    let (c, _) = ocean.profile().sound_speed(&pos);
    assert_eq!(c, 1500.0);
}
