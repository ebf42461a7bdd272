// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Integration utilities for the wavefront ordinary differential equations.

The propagator uses a third order Runge-Kutta scheme to start up, then
switches to a third order Adams-Bashforth predictor once three prior
derivative evaluations are available. All estimates operate on whole
wavefront snapshots at a time.
*/

use crate::wavefront::WaveFront;


const AB3_A2: f64 = 23.0 / 12.0;
const AB3_A1: f64 = 16.0 / 12.0;
const AB3_A0: f64 = 5.0 / 12.0;

/// First position estimate in 3rd order Runge-Kutta: a half step along
/// the current derivative.
pub fn rk1_pos(dt: f64, y0: &WaveFront, y1: &mut WaveFront) {
    for n in 0..y0.position.rho.len() {
        y1.position.rho[n] = y0.position.rho[n] + 0.5 * dt * y0.pos_gradient.rho[n];
        y1.position.theta[n] = y0.position.theta[n] + 0.5 * dt * y0.pos_gradient.theta[n];
        y1.position.phi[n] = y0.position.phi[n] + 0.5 * dt * y0.pos_gradient.phi[n];
    }
}

/// First direction estimate in 3rd order Runge-Kutta.
pub fn rk1_ndir(dt: f64, y0: &WaveFront, y1: &mut WaveFront) {
    for n in 0..y0.ndirection.rho.len() {
        y1.ndirection.rho[n] = y0.ndirection.rho[n] + 0.5 * dt * y0.ndir_gradient.rho[n];
        y1.ndirection.theta[n] = y0.ndirection.theta[n] + 0.5 * dt * y0.ndir_gradient.theta[n];
        y1.ndirection.phi[n] = y0.ndirection.phi[n] + 0.5 * dt * y0.ndir_gradient.phi[n];
    }
}

/// Second position estimate in 3rd order Runge-Kutta.
pub fn rk2_pos(dt: f64, y0: &WaveFront, y1: &WaveFront, y2: &mut WaveFront) {
    for n in 0..y0.position.rho.len() {
        y2.position.rho[n] = y0.position.rho[n]
            + dt * (2.0 * y1.pos_gradient.rho[n] - y0.pos_gradient.rho[n]);
        y2.position.theta[n] = y0.position.theta[n]
            + dt * (2.0 * y1.pos_gradient.theta[n] - y0.pos_gradient.theta[n]);
        y2.position.phi[n] = y0.position.phi[n]
            + dt * (2.0 * y1.pos_gradient.phi[n] - y0.pos_gradient.phi[n]);
    }
}

/// Second direction estimate in 3rd order Runge-Kutta.
pub fn rk2_ndir(dt: f64, y0: &WaveFront, y1: &WaveFront, y2: &mut WaveFront) {
    for n in 0..y0.ndirection.rho.len() {
        y2.ndirection.rho[n] = y0.ndirection.rho[n]
            + dt * (2.0 * y1.ndir_gradient.rho[n] - y0.ndir_gradient.rho[n]);
        y2.ndirection.theta[n] = y0.ndirection.theta[n]
            + dt * (2.0 * y1.ndir_gradient.theta[n] - y0.ndir_gradient.theta[n]);
        y2.ndirection.phi[n] = y0.ndirection.phi[n]
            + dt * (2.0 * y1.ndir_gradient.phi[n] - y0.ndir_gradient.phi[n]);
    }
}

/// Third and final position estimate in 3rd order Runge-Kutta, using
/// Simpson's rule weights over the three derivative evaluations.
pub fn rk3_pos(dt: f64, y0: &WaveFront, y1: &WaveFront, y2: &WaveFront, y3: &mut WaveFront) {
    for n in 0..y0.position.rho.len() {
        y3.position.rho[n] = y0.position.rho[n]
            + dt / 6.0
                * (y0.pos_gradient.rho[n]
                    + 4.0 * y1.pos_gradient.rho[n]
                    + y2.pos_gradient.rho[n]);
        y3.position.theta[n] = y0.position.theta[n]
            + dt / 6.0
                * (y0.pos_gradient.theta[n]
                    + 4.0 * y1.pos_gradient.theta[n]
                    + y2.pos_gradient.theta[n]);
        y3.position.phi[n] = y0.position.phi[n]
            + dt / 6.0
                * (y0.pos_gradient.phi[n]
                    + 4.0 * y1.pos_gradient.phi[n]
                    + y2.pos_gradient.phi[n]);
    }
}

/// Third and final direction estimate in 3rd order Runge-Kutta.
pub fn rk3_ndir(dt: f64, y0: &WaveFront, y1: &WaveFront, y2: &WaveFront, y3: &mut WaveFront) {
    for n in 0..y0.ndirection.rho.len() {
        y3.ndirection.rho[n] = y0.ndirection.rho[n]
            + dt / 6.0
                * (y0.ndir_gradient.rho[n]
                    + 4.0 * y1.ndir_gradient.rho[n]
                    + y2.ndir_gradient.rho[n]);
        y3.ndirection.theta[n] = y0.ndirection.theta[n]
            + dt / 6.0
                * (y0.ndir_gradient.theta[n]
                    + 4.0 * y1.ndir_gradient.theta[n]
                    + y2.ndir_gradient.theta[n]);
        y3.ndirection.phi[n] = y0.ndirection.phi[n]
            + dt / 6.0
                * (y0.ndir_gradient.phi[n]
                    + 4.0 * y1.ndir_gradient.phi[n]
                    + y2.ndir_gradient.phi[n]);
    }
}

/// Adams-Bashforth (3rd order) estimate of position. Also computes the
/// chord length travelled by each cell during this step, using the
/// spherical metric at the current position.
///
/// # Arguments
///
/// * `dt` - Time step (seconds).
///
/// * `y0` - Wavefront from 2 iterations ago.
///
/// * `y1` - Wavefront from 1 iteration ago.
///
/// * `y2` - Current wavefront.
///
/// * `y3` - New wavefront estimate (output).
///
pub fn ab3_pos(dt: f64, y0: &WaveFront, y1: &WaveFront, y2: &WaveFront, y3: &mut WaveFront) {
    for n in 0..y0.position.rho.len() {
        let drho = dt
            * (AB3_A2 * y2.pos_gradient.rho[n] - AB3_A1 * y1.pos_gradient.rho[n]
                + AB3_A0 * y0.pos_gradient.rho[n]);
        let dtheta = dt
            * (AB3_A2 * y2.pos_gradient.theta[n] - AB3_A1 * y1.pos_gradient.theta[n]
                + AB3_A0 * y0.pos_gradient.theta[n]);
        let dphi = dt
            * (AB3_A2 * y2.pos_gradient.phi[n] - AB3_A1 * y1.pos_gradient.phi[n]
                + AB3_A0 * y0.pos_gradient.phi[n]);

        let rho = y2.position.rho[n];
        let sin_theta = y2.position.theta[n].sin();
        y3.distance[n] = (drho * drho
            + (rho * dtheta) * (rho * dtheta)
            + (rho * sin_theta * dphi) * (rho * sin_theta * dphi))
            .sqrt();

        y3.position.rho[n] = y2.position.rho[n] + drho;
        y3.position.theta[n] = y2.position.theta[n] + dtheta;
        y3.position.phi[n] = y2.position.phi[n] + dphi;
    }
}

/// Adams-Bashforth (3rd order) estimate of direction.
pub fn ab3_ndir(dt: f64, y0: &WaveFront, y1: &WaveFront, y2: &WaveFront, y3: &mut WaveFront) {
    for n in 0..y0.ndirection.rho.len() {
        y3.ndirection.rho[n] = y2.ndirection.rho[n]
            + dt * (AB3_A2 * y2.ndir_gradient.rho[n] - AB3_A1 * y1.ndir_gradient.rho[n]
                + AB3_A0 * y0.ndir_gradient.rho[n]);
        y3.ndirection.theta[n] = y2.ndirection.theta[n]
            + dt * (AB3_A2 * y2.ndir_gradient.theta[n] - AB3_A1 * y1.ndir_gradient.theta[n]
                + AB3_A0 * y0.ndir_gradient.theta[n]);
        y3.ndirection.phi[n] = y2.ndirection.phi[n]
            + dt * (AB3_A2 * y2.ndir_gradient.phi[n] - AB3_A1 * y1.ndir_gradient.phi[n]
                + AB3_A0 * y0.ndir_gradient.phi[n]);
    }
}

/// Adams-Bashforth position update for a single cell, re-integrating the
/// remainder of a step after a reflection. The historical derivatives
/// are supplied directly so that the reflection solver can mirror them
/// about the interface normal.
pub fn ab3_pos_cell(
    dt: f64,
    start: &crate::geo::WVector,
    g0: &crate::geo::WVector,
    g1: &crate::geo::WVector,
    g2: &crate::geo::WVector,
) -> crate::geo::WVector {
    crate::geo::WVector::new(
        start.rho + dt * (AB3_A2 * g2.rho - AB3_A1 * g1.rho + AB3_A0 * g0.rho),
        start.theta + dt * (AB3_A2 * g2.theta - AB3_A1 * g1.theta + AB3_A0 * g0.theta),
        start.phi + dt * (AB3_A2 * g2.phi - AB3_A1 * g1.phi + AB3_A0 * g0.phi),
    )
}
