// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Unit tests for gridded data sets
*/
use super::*;
use crate::seq::Seq;
use std::sync::Arc;

fn axis(first: f64, inc: f64, size: usize) -> SeqRef {
    Arc::new(Seq::linear(first, inc, size).unwrap())
}

#[test]
fn test_size_mismatch() {
    let result = DataGrid::new([axis(0.0, 1.0, 3), axis(0.0, 1.0, 4)], vec![0.0; 11]);
    assert!(matches!(
        result,
        Err(GridError::SizeMismatch {
            expected: 12,
            actual: 11
        })
    ));
}

#[test]
fn test_linear_1d() {
    let data = vec![0.0, 10.0, 20.0, 30.0];
    let grid = DataGrid::new([axis(0.0, 1.0, 4)], data).unwrap();
    assert_eq!(grid.interpolate(&[1.5]), 15.0);
    let mut grad = [0.0];
    let v = grid.interpolate_gradient(&[2.25], &mut grad);
    assert!((v - 22.5).abs() < 1e-12);
    assert!((grad[0] - 10.0).abs() < 1e-12);
}

#[test]
fn test_linear_extrapolation_and_clamp() {
    let data = vec![0.0, 10.0];
    let mut grid = DataGrid::new([axis(0.0, 1.0, 2)], data).unwrap();
    // default edge policy extrapolates with the boundary slope
    assert!((grid.interpolate(&[2.0]) - 20.0).abs() < 1e-12);
    assert!((grid.interpolate(&[-1.0]) + 10.0).abs() < 1e-12);
    // clamped policy returns the boundary value
    grid.set_edge_limit(0, true);
    assert_eq!(grid.interpolate(&[2.0]), 10.0);
    assert_eq!(grid.interpolate(&[-1.0]), 0.0);
}

#[test]
fn test_nearest_1d() {
    let data = vec![1.0, 2.0, 3.0];
    let mut grid = DataGrid::new([axis(0.0, 1.0, 3)], data).unwrap();
    grid.set_interp(0, InterpKind::Nearest);
    assert_eq!(grid.interpolate(&[0.4]), 1.0);
    assert_eq!(grid.interpolate(&[0.6]), 2.0);
    assert_eq!(grid.interpolate(&[1.9]), 3.0);
}

#[test]
fn test_linear_2d_bilinear() {
    // f(x, y) = 2x + 3y is reproduced exactly by bilinear interpolation
    let ax = axis(0.0, 1.0, 3);
    let ay = axis(0.0, 2.0, 3);
    let mut grid = DataGrid::zeroed([ax.clone(), ay.clone()]);
    for i in 0..3 {
        for j in 0..3 {
            grid.set_data(&[i, j], 2.0 * ax.value(i) + 3.0 * ay.value(j));
        }
    }
    let mut grad = [0.0; 2];
    let v = grid.interpolate_gradient(&[1.25, 2.5], &mut grad);
    assert!((v - (2.0 * 1.25 + 3.0 * 2.5)).abs() < 1e-12);
    assert!((grad[0] - 2.0).abs() < 1e-12);
    assert!((grad[1] - 3.0).abs() < 1e-12);
}

#[test]
fn test_pchip_node_reproduction() {
    // interpolation at an exact node reproduces the node value exactly
    let values = vec![0.0, 1.0, 8.0, 27.0, 64.0, 125.0];
    let ax = axis(0.0, 1.0, 6);
    let mut grid = DataGrid::new([ax.clone()], values.clone()).unwrap();
    grid.set_interp(0, InterpKind::Pchip);
    for (i, &v) in values.iter().enumerate() {
        let got = grid.interpolate(&[ax.value(i)]);
        assert!(
            (got - v).abs() < 1e-12,
            "node {i}: expected {v}, got {got}"
        );
    }
}

#[test]
fn test_pchip_derivative_matches_fritsch_carlson() {
    let values = [0.0, 1.0, 8.0, 27.0, 64.0, 125.0];
    let ax = axis(0.0, 1.0, 6);
    let mut grid = DataGrid::new([ax.clone()], values.to_vec()).unwrap();
    grid.set_interp(0, InterpKind::Pchip);
    // derivative at an interior node equals the Fritsch-Carlson formula
    for i in 2..4 {
        let s_prev = values[i] - values[i - 1];
        let s = values[i + 1] - values[i];
        let expected = fritsch_carlson(1.0, 1.0, s_prev, s);
        let mut grad = [0.0];
        grid.interpolate_gradient(&[ax.value(i)], &mut grad);
        assert!(
            (grad[0] - expected).abs() < 1e-9,
            "node {i}: expected {expected}, got {}",
            grad[0]
        );
    }
}

#[test]
fn test_pchip_monotone_no_overshoot() {
    // a step-like profile must not overshoot between nodes
    let values = vec![0.0, 0.0, 0.0, 10.0, 10.0, 10.0];
    let mut grid = DataGrid::new([axis(0.0, 1.0, 6)], values).unwrap();
    grid.set_interp(0, InterpKind::Pchip);
    for k in 0..200 {
        let x = 5.0 * k as f64 / 199.0;
        let v = grid.interpolate(&[x]);
        assert!((-1e-9..=10.0 + 1e-9).contains(&v), "overshoot {v} at {x}");
    }
}

#[test]
fn test_pchip_forces_edge_clamp() {
    let values = vec![0.0, 1.0, 4.0, 9.0];
    let mut grid = DataGrid::new([axis(0.0, 1.0, 4)], values).unwrap();
    grid.set_interp(0, InterpKind::Pchip);
    // queries beyond the domain return the boundary value
    assert_eq!(grid.interpolate(&[100.0]), 9.0);
    assert_eq!(grid.interpolate(&[-100.0]), 0.0);
}

#[test]
fn test_mixed_interp_3d() {
    // nearest x linear x linear over a separable function
    let ax = axis(0.0, 1.0, 2);
    let ay = axis(0.0, 1.0, 3);
    let az = axis(0.0, 1.0, 3);
    let mut grid = DataGrid::zeroed([ax, ay, az]);
    for i in 0..2 {
        for j in 0..3 {
            for k in 0..3 {
                grid.set_data(&[i, j, k], 100.0 * i as f64 + 10.0 * j as f64 + k as f64);
            }
        }
    }
    grid.set_interp(0, InterpKind::Nearest);
    let v = grid.interpolate(&[0.2, 1.5, 0.5]);
    assert!((v - 15.5).abs() < 1e-12);
    let v = grid.interpolate(&[0.8, 1.5, 0.5]);
    assert!((v - 115.5).abs() < 1e-12);
}
