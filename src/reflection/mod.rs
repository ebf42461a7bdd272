// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Collision detection and reflection of wavefront cells at the ocean
boundaries.

When a cell of the `next` wavefront ends a step on the wrong side of the
surface or bottom, the solver back-solves a quadratic for the fraction
of the step at which the ray met the interface, refines the collision
point with a second order Taylor series around the current wavefront,
reflects the direction about the interface normal, and re-integrates the
remainder of the step with the same Adams-Bashforth coefficients so the
cell ends the step on the far side. Multiple reflections inside one step
recurse up to a small fixed depth; beyond that the cell is marked
invalid and the task continues.
*/

use log::warn;

use crate::eigenverbs::InterfaceType;
use crate::geo::WVector;
use crate::ocean::Ocean;
use crate::ode::ab3_pos_cell;
use crate::seq::Seq;
use crate::wavefront::{direction_rate, position_rate, WaveFront};


/// Reflections per cell per step before the solver gives up and marks
/// the cell invalid.
pub const MAX_REFLECTIONS_PER_STEP: usize = 4;

/// Everything the propagator needs to know about one boundary collision,
/// captured before the bounce so eigenverb power excludes the loss of
/// the bounce itself.
#[derive(Clone, Debug)]
pub struct Collision {
    /// DE index of the colliding cell.
    pub de: usize,
    /// AZ index of the colliding cell.
    pub az: usize,
    /// Which interface was struck.
    pub interface: InterfaceType,
    /// Travel time at the collision (seconds from the launch).
    pub time: f64,
    /// Refined collision position.
    pub position: WVector,
    /// Incident unit direction at the collision point.
    pub direction: WVector,
    /// Grazing angle relative to the interface (radians, positive).
    pub grazing: f64,
    /// Sound speed at the collision point (m/s).
    pub sound_speed: f64,
    /// Path attenuation at the collision, per frequency (dB), not
    /// including the loss of this bounce.
    pub attenuation: Vec<f64>,
}

/// Process every boundary crossing for one cell of the `next` wavefront.
/// Returns the collisions found, already applied to the cell state:
/// counters incremented, reflection losses accumulated, position and
/// direction re-integrated past the interface.
///
/// # Arguments
///
/// * `ocean` - Shared environment.
///
/// * `frequencies` - Frequencies of the wavefront (Hz).
///
/// * `prev`, `curr` - Prior snapshots supplying derivative history.
///
/// * `next` - Snapshot being corrected in place.
///
/// * `de`, `az` - Cell being processed.
///
/// * `time` - Travel time of the `curr` snapshot (seconds).
///
/// * `dt` - Step size (seconds).
///
#[allow(clippy::too_many_arguments)]
pub fn detect_reflections(
    ocean: &Ocean,
    frequencies: &Seq,
    prev: &WaveFront,
    curr: &WaveFront,
    next: &mut WaveFront,
    de: usize,
    az: usize,
    time: f64,
    dt: f64,
) -> Vec<Collision> {
    let mut collisions = Vec::new();
    let n = next.index(de, az);
    let mut step_start = time;
    let mut remainder = dt;

    for bounce in 0..=MAX_REFLECTIONS_PER_STEP {
        if !next.valid[n] {
            break;
        }
        let pos_next = next.position.get(de, az);
        if !pos_next.rho.is_finite() || !pos_next.theta.is_finite() || !pos_next.phi.is_finite() {
            next.valid[n] = false;
            break;
        }

        // which interface, if any, did this cell cross?
        let (bottom_rho, _) = ocean.bottom().height(&pos_next);
        let (surface_rho, _) = ocean.surface().height(&pos_next);
        let interface = if pos_next.rho < bottom_rho {
            InterfaceType::Bottom
        } else if pos_next.rho > surface_rho {
            InterfaceType::Surface
        } else {
            break;
        };

        if bounce == MAX_REFLECTIONS_PER_STEP {
            warn!(
                "cell ({de},{az}) exceeded {MAX_REFLECTIONS_PER_STEP} reflections in one step, marking invalid"
            );
            next.valid[n] = false;
            break;
        }

        let collision = reflect_cell(
            ocean, frequencies, prev, curr, next, de, az, step_start, remainder, interface,
        );
        match collision {
            Some(c) => {
                // the remainder of the step shrinks with every bounce
                remainder = (step_start + remainder - c.time).max(1e-6 * dt);
                step_start = c.time;
                collisions.push(c);
            }
            None => {
                next.valid[n] = false;
                break;
            }
        }
    }
    collisions
}

/// Handle a single collision for one cell: solve for the collision time,
/// refine the geometry, apply the boundary loss, reflect, and
/// re-integrate the remainder of the step.
#[allow(clippy::too_many_arguments)]
fn reflect_cell(
    ocean: &Ocean,
    frequencies: &Seq,
    prev: &WaveFront,
    curr: &WaveFront,
    next: &mut WaveFront,
    de: usize,
    az: usize,
    time: f64,
    dt: f64,
    interface: InterfaceType,
) -> Option<Collision> {
    let n = curr.index(de, az);
    let boundary = match interface {
        InterfaceType::Bottom => ocean.bottom(),
        InterfaceType::Surface => ocean.surface(),
        _ => return None,
    };

    // signed height above the interface at both ends of the step
    let pos_curr = curr.position.get(de, az);
    let pos_next = next.position.get(de, az);
    let (rho_curr, normal_curr) = boundary.height(&pos_curr);
    let (rho_next, _) = boundary.height(&pos_next);
    let sign = match interface {
        InterfaceType::Bottom => 1.0,
        _ => -1.0,
    };
    let d_curr = sign * (pos_curr.rho - rho_curr);
    let d_next = sign * (pos_next.rho - rho_next);

    // quadratic back-solve for the crossing fraction epsilon in (0, 1]:
    // d(eps) = A eps^2 + B eps + C with C and d(1) known, and B from the
    // rate of change of the height difference at the current wavefront
    let c_sound = curr.sound_speed[n];
    let dir_curr = curr.ndirection.get(de, az);
    let slope_theta = if normal_curr.rho.abs() > 1e-9 {
        -normal_curr.theta / normal_curr.rho
    } else {
        0.0
    };
    let slope_phi = if normal_curr.rho.abs() > 1e-9 {
        -normal_curr.phi / normal_curr.rho
    } else {
        0.0
    };
    let height_rate = curr.pos_gradient.get(de, az).rho
        - slope_theta * c_sound * dir_curr.theta
        - slope_phi * c_sound * dir_curr.phi;
    let b = sign * height_rate * dt;
    let c0 = d_curr;
    let a = d_next - c0 - b;
    let epsilon = solve_crossing(a, b, c0, d_next)?;
    let tau = epsilon * dt;

    // second order Taylor refinement of the collision point around the
    // current wavefront
    let pg_curr = curr.pos_gradient.get(de, az);
    let pg_next = next.pos_gradient.get(de, az);
    let accel = WVector::new(
        (pg_next.rho - pg_curr.rho) / dt,
        (pg_next.theta - pg_curr.theta) / dt,
        (pg_next.phi - pg_curr.phi) / dt,
    );
    let position = WVector::new(
        pos_curr.rho + tau * pg_curr.rho + 0.5 * tau * tau * accel.rho,
        pos_curr.theta + tau * pg_curr.theta + 0.5 * tau * tau * accel.theta,
        pos_curr.phi + tau * pg_curr.phi + 0.5 * tau * tau * accel.phi,
    );
    let ng_curr = curr.ndir_gradient.get(de, az);
    let mut direction = WVector::new(
        dir_curr.rho + tau * ng_curr.rho,
        dir_curr.theta + tau * ng_curr.theta,
        dir_curr.phi + tau * ng_curr.phi,
    );
    direction.normalize();

    // grazing angle from the refined geometry
    let (_, normal) = boundary.height(&position);
    let dot = direction.vdot(&normal);
    let grazing = dot.abs().asin().max(1e-6);
    let (speed, grad) = ocean.profile().sound_speed(&position);

    let collision = Collision {
        de,
        az,
        interface,
        time: time + tau,
        position,
        direction,
        grazing,
        sound_speed: speed,
        attenuation: (0..frequencies.size())
            .map(|f| next.attenuation[n * frequencies.size() + f])
            .collect(),
    };

    // boundary loss and phase accumulate into the cell spectra; a
    // surface bounce also inverts the phase
    let num_freq = frequencies.size();
    let mut amplitude = vec![0.0; num_freq];
    let mut phase = vec![0.0; num_freq];
    boundary.reflect_loss(
        &position,
        frequencies,
        grazing,
        &mut amplitude,
        Some(&mut phase),
    );
    for f in 0..num_freq {
        next.attenuation[n * num_freq + f] += amplitude[f];
        next.phase[n * num_freq + f] += phase[f];
        if interface == InterfaceType::Surface {
            next.phase[n * num_freq + f] += std::f64::consts::PI;
        }
    }
    match interface {
        InterfaceType::Bottom => next.bottom[n] += 1,
        InterfaceType::Surface => next.surface[n] += 1,
        _ => {}
    }

    // reflect the incident direction about the interface normal
    let reflected = reflect_about(&direction, &normal);

    // re-integrate the remainder of the step with the AB3 coefficients,
    // mirroring the derivative history about the normal so it describes
    // the outgoing ray
    let h = dt - tau;
    let g_col = position_rate(&position, &reflected, speed);
    let g_curr = reflect_rate(&pos_curr, &pg_curr, &normal, &position);
    let g_prev = reflect_rate(
        &prev.position.get(de, az),
        &prev.pos_gradient.get(de, az),
        &normal,
        &position,
    );
    let new_pos = ab3_pos_cell(h, &position, &g_prev, &g_curr, &g_col);
    next.position.set(de, az, &new_pos);

    let ndir_rate = direction_rate(&position, &reflected, speed, &grad);
    let mut new_dir = WVector::new(
        reflected.rho + h * ndir_rate.rho,
        reflected.theta + h * ndir_rate.theta,
        reflected.phi + h * ndir_rate.phi,
    );
    new_dir.normalize();
    next.ndirection.set(de, az, &new_dir);

    // refresh the derivative caches of this cell at its new state
    next.update_cell_derivs(ocean, de, az);

    Some(collision)
}

/// Reflect a unit direction about a unit interface normal.
pub fn reflect_about(direction: &WVector, normal: &WVector) -> WVector {
    let dot = direction.vdot(normal);
    let mut out = WVector::new(
        direction.rho - 2.0 * dot * normal.rho,
        direction.theta - 2.0 * dot * normal.theta,
        direction.phi - 2.0 * dot * normal.phi,
    );
    out.normalize();
    out
}

/// Mirror a position rate (coordinate units per second) about the
/// interface normal, re-expressed at the collision point. Converts to
/// tangent-frame meters per second, reflects, and converts back.
fn reflect_rate(pos: &WVector, rate: &WVector, normal: &WVector, at: &WVector) -> WVector {
    let v = WVector::new(
        rate.rho,
        rate.theta * pos.rho,
        rate.phi * pos.rho * pos.theta.sin(),
    );
    let reflected = reflect_about_unnormalized(&v, normal);
    WVector::new(
        reflected.rho,
        reflected.theta / at.rho,
        reflected.phi / (at.rho * at.theta.sin()),
    )
}

/// Reflect a vector about a unit normal without renormalizing, so speed
/// magnitudes survive.
fn reflect_about_unnormalized(v: &WVector, normal: &WVector) -> WVector {
    let dot = v.vdot(normal);
    WVector::new(
        v.rho - 2.0 * dot * normal.rho,
        v.theta - 2.0 * dot * normal.theta,
        v.phi - 2.0 * dot * normal.phi,
    )
}

/// Smallest root of `A e^2 + B e + C = 0` inside (0, 1]. Falls back to
/// linear interpolation between the step endpoints when the quadratic
/// degenerates.
fn solve_crossing(a: f64, b: f64, c: f64, d_next: f64) -> Option<f64> {
    let linear = || {
        let denom = c - d_next;
        if denom.abs() < 1e-30 {
            None
        } else {
            let eps = c / denom;
            if (0.0..=1.0).contains(&eps) {
                Some(eps.max(1e-6))
            } else {
                None
            }
        }
    };
    if a.abs() < 1e-12 * (b.abs() + c.abs()).max(1.0) {
        return linear();
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return linear();
    }
    let sqrt_disc = disc.sqrt();
    let r1 = (-b - sqrt_disc) / (2.0 * a);
    let r2 = (-b + sqrt_disc) / (2.0 * a);
    let mut best: Option<f64> = None;
    for r in [r1, r2] {
        if r > 0.0 && r <= 1.0 {
            best = Some(match best {
                Some(prev) => prev.min(r),
                None => r,
            });
        }
    }
    best.map(|e| e.max(1e-6)).or_else(linear)
}

/// Detect crossings of a volume scattering layer between `curr` and
/// `next`. Volume layers do not reflect the ray; the crossing only
/// produces an eigenverb contribution and bumps the upper/lower
/// counters.
#[allow(clippy::too_many_arguments)]
pub fn detect_volume_crossings(
    ocean: &Ocean,
    frequencies: &Seq,
    curr: &WaveFront,
    next: &mut WaveFront,
    de: usize,
    az: usize,
    time: f64,
    dt: f64,
) -> Vec<Collision> {
    let mut collisions = Vec::new();
    let n = curr.index(de, az);
    if !next.valid[n] {
        return collisions;
    }
    let pos_curr = curr.position.get(de, az);
    let pos_next = next.position.get(de, az);
    for layer in 0..ocean.num_volumes() {
        let (layer_rho, _thickness) = ocean.volume(layer).depth(&pos_curr);
        let above_before = pos_curr.rho > layer_rho;
        let above_after = pos_next.rho > layer_rho;
        if above_before == above_after {
            continue;
        }
        let interface = if above_before {
            InterfaceType::VolumeUpper(layer)
        } else {
            InterfaceType::VolumeLower(layer)
        };
        match interface {
            InterfaceType::VolumeUpper(_) => next.upper[n] += 1,
            _ => next.lower[n] += 1,
        }

        // linear estimate of the crossing fraction
        let denom = pos_curr.rho - pos_next.rho;
        let eps = if denom.abs() < 1e-30 {
            0.5
        } else {
            ((pos_curr.rho - layer_rho) / denom).clamp(0.0, 1.0)
        };
        let tau = eps * dt;
        let pg = curr.pos_gradient.get(de, az);
        let position = WVector::new(
            pos_curr.rho + tau * pg.rho,
            pos_curr.theta + tau * pg.theta,
            pos_curr.phi + tau * pg.phi,
        );
        let ng = curr.ndir_gradient.get(de, az);
        let dir0 = curr.ndirection.get(de, az);
        let mut direction = WVector::new(
            dir0.rho + tau * ng.rho,
            dir0.theta + tau * ng.theta,
            dir0.phi + tau * ng.phi,
        );
        direction.normalize();
        let grazing = direction.rho.abs().asin().max(1e-6);
        let (speed, _) = ocean.profile().sound_speed(&position);
        collisions.push(Collision {
            de,
            az,
            interface,
            time: time + tau,
            position,
            direction,
            grazing,
            sound_speed: speed,
            attenuation: (0..frequencies.size())
                .map(|f| next.attenuation[n * frequencies.size() + f])
                .collect(),
        });
    }
    collisions
}
