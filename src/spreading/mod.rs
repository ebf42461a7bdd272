// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Spreading loss models for the wavefront propagator.

Two models share one contract. The classic ray model treats propagation
loss as the change in ensonified area between rays: if the initial
intensity is unity, the intensity at the target is
`(A0 / c0) / (A / c)` where A0 and A are the initial and current areas
bounded by the four neighbouring rays. The hybrid Gaussian model treats
every cell of the wavefront as a Gaussian beam and sums the
contributions of the beams whose first Fresnel zone covers the target,
which smooths the artifacts that pure ray theory produces near fold
caustics and shadow boundaries.
*/

use crate::geo::WVector;
use crate::ocean::Ocean;
use crate::seq::Seq;
use crate::wavefront::WaveFront;

#[cfg(test)]
mod test;

/// Which spreading model a wave queue applies to its eigenrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SpreadingType {
    /// Classic ray theory area ratios.
    ClassicRay,
    /// Gaussian beam summation over the first Fresnel zone.
    #[default]
    HybridGaussian,
}

/// Borrowed view of the propagator state needed by the spreading models.
pub struct SpreadContext<'a> {
    /// Snapshot one step behind the current one.
    pub prev: &'a WaveFront,
    /// Current snapshot, the one CPA offsets are measured from.
    pub curr: &'a WaveFront,
    /// Snapshot one step ahead of the current one.
    pub next: &'a WaveFront,
    /// Launch depression/elevation angles (degrees).
    pub de_fan: &'a Seq,
    /// Launch azimuth angles (degrees).
    pub az_fan: &'a Seq,
    /// Frequencies of the wavefront (Hz).
    pub frequencies: &'a Seq,
    /// Time step between snapshots (seconds).
    pub time_step: f64,
    /// Shared ocean, used for the sound speed at the target.
    pub ocean: &'a Ocean,
}

/// Spreading state carried by a wave queue for the lifetime of a run.
pub struct Spreading {
    kind: SpreadingType,
    /// Initial ensonified area for each ray span, divided by the initial
    /// sound speed. The area for each span is assigned to the ray that
    /// precedes it in DE and AZ, with the last row and column copied
    /// from the one before.
    init_area: Vec<f64>,
    num_de: usize,
    num_az: usize,
}

impl Spreading {
    /// Estimate the initial ensonified areas between rays at a radius of
    /// one meter:
    /// `A = (sin(de2) - sin(de1)) * (az2 - az1)`.
    ///
    /// # Arguments
    ///
    /// * `kind` - Spreading model variant.
    ///
    /// * `de_fan` - Launch depression/elevation angles (degrees).
    ///
    /// * `az_fan` - Launch azimuth angles (degrees).
    ///
    /// * `init_speed` - Sound speed at the source (m/s).
    ///
    pub fn new(kind: SpreadingType, de_fan: &Seq, az_fan: &Seq, init_speed: f64) -> Self {
        let num_de = de_fan.size();
        let num_az = az_fan.size();
        let mut init_area = vec![0.0; num_de * num_az];
        for d in 0..num_de.saturating_sub(1) {
            for a in 0..num_az.saturating_sub(1) {
                let de1 = de_fan.value(d).to_radians();
                let de2 = de_fan.value(d + 1).to_radians();
                let az1 = az_fan.value(a).to_radians();
                let az2 = az_fan.value(a + 1).to_radians();
                init_area[d * num_az + a] = (de2.sin() - de1.sin()) * (az2 - az1);
            }
            if num_az > 1 {
                init_area[d * num_az + num_az - 1] = init_area[d * num_az + num_az - 2];
            }
        }
        if num_de > 1 {
            for a in 0..num_az {
                init_area[(num_de - 1) * num_az + a] = init_area[(num_de - 2) * num_az + a];
            }
        }
        for v in init_area.iter_mut() {
            *v /= init_speed;
        }
        Spreading {
            kind,
            init_area,
            num_de,
            num_az,
        }
    }

    /// Raw launch solid angle of one ray span (steradians), before the
    /// initial sound speed normalization. Used for eigenverb power.
    pub fn solid_angle(&self, de: usize, az: usize, init_speed: f64) -> f64 {
        self.init_area[de.min(self.num_de - 1) * self.num_az + az.min(self.num_az - 1)]
            * init_speed
    }

    /// Broadband intensity of the wavefront at a target location.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Propagator state.
    ///
    /// * `target` - Target location.
    ///
    /// * `de` - DE index of the closest point of approach.
    ///
    /// * `az` - AZ index of the closest point of approach.
    ///
    /// * `offset` - Fractional (time, DE, AZ) offsets of the CPA from the
    ///   centre of that cell, each in [-1/2, +1/2).
    ///
    /// * `intensity` - Spreading intensity ratio per frequency (output).
    ///
    pub fn intensity(
        &self,
        ctx: &SpreadContext,
        target: &WVector,
        de: usize,
        az: usize,
        offset: &[f64; 3],
        intensity: &mut [f64],
    ) {
        match self.kind {
            SpreadingType::ClassicRay => {
                let level = self.ray_intensity(ctx, target, de, az, offset);
                intensity.fill(level);
            }
            SpreadingType::HybridGaussian => {
                self.gaussian_intensity(ctx, target, de, az, offset, intensity);
            }
        }
    }

    /// Classic ray estimate: ratio of the current quad area to the
    /// initial area, linearly interpolated between the two wavefronts
    /// that bracket the CPA time.
    fn ray_intensity(
        &self,
        ctx: &SpreadContext,
        target: &WVector,
        de: usize,
        az: usize,
        offset: &[f64; 3],
    ) -> f64 {
        // which box has the target in it?
        let mut de = de;
        let mut az = az;
        if offset[1] < 0.0 && de > 0 {
            de -= 1;
        }
        if offset[2] < 0.0 && az > 0 {
            az -= 1;
        }
        de = de.min(self.num_de.saturating_sub(2));
        az = az.min(self.num_az.saturating_sub(2));

        let (speed, _) = ctx.ocean.profile().sound_speed(target);

        let area1 = quad_area(ctx.curr, de, az);
        let bracket = if offset[0] < 0.0 { ctx.prev } else { ctx.next };
        let area2 = quad_area(bracket, de, az);
        let u = offset[0].abs();
        let area = (1.0 - u) * area1 + u * area2;
        if area <= 0.0 || !area.is_finite() {
            return 0.0;
        }
        let mut loss = self.init_area[de * self.num_az + az] * speed / area;

        // attenuate signals outside of the ray fan, keeping a constant
        // level for a few extra beam widths
        if offset[1].abs() - 1.0 > 4.0 || offset[2].abs() - 1.0 > 4.0 {
            loss = 0.0;
        }
        loss
    }

    /// Hybrid Gaussian estimate: sum beam contributions from the
    /// neighbourhood of the CPA cell out to the first Fresnel zone
    /// radius. Each beam contributes a separable Gaussian in DE and AZ
    /// whose half-widths come from the local ray spacing, normalised so
    /// that a smooth wavefront reproduces the classic ray level. Outside
    /// the ray fan the Gaussian tail decays naturally.
    fn gaussian_intensity(
        &self,
        ctx: &SpreadContext,
        target: &WVector,
        de: usize,
        az: usize,
        offset: &[f64; 3],
        intensity: &mut [f64],
    ) {
        let norm = 2.0 / (2.0 * std::f64::consts::PI).sqrt();
        let range = ctx.curr.position.get(de, az).distance(target)
            + ctx.curr.path_length[ctx.curr.index(de, az)];
        let (speed, _) = ctx.ocean.profile().sound_speed(target);

        for (f, freq) in ctx.frequencies.iter().enumerate() {
            let wavelength = speed / freq;
            let fresnel = (wavelength * range.max(wavelength) / 2.0).sqrt();

            let sigma_de0 = self.width_de(ctx, de, az).max(1e-6);
            let sigma_az0 = self.width_az(ctx, de, az).max(1e-6);
            let window_de = ((fresnel / (2.0 * sigma_de0)).ceil() as usize).clamp(1, self.num_de);
            let window_az = ((fresnel / (2.0 * sigma_az0)).ceil() as usize).clamp(1, self.num_az);

            let mut total = 0.0;
            let d_lo = de.saturating_sub(window_de);
            let d_hi = (de + window_de).min(self.num_de - 1);
            let a_lo = az.saturating_sub(window_az);
            let a_hi = (az + window_az).min(self.num_az - 1);
            for dn in d_lo..=d_hi {
                let sigma_de = self.width_de(ctx, dn, az).max(1e-6);
                let du = (de as f64 + offset[1] - dn as f64) * 2.0 * sigma_de0;
                let wde = norm * (-0.5 * (du / sigma_de).powi(2)).exp();
                if wde <= 0.0 {
                    continue;
                }
                for an in a_lo..=a_hi {
                    let n = ctx.curr.index(dn, an);
                    if !ctx.curr.valid[n] {
                        continue;
                    }
                    let sigma_az = self.width_az(ctx, dn, an).max(1e-6);
                    let av = (az as f64 + offset[2] - an as f64) * 2.0 * sigma_az0;
                    let waz = norm * (-0.5 * (av / sigma_az).powi(2)).exp();
                    let cell = self.ray_intensity(
                        ctx,
                        target,
                        dn,
                        an,
                        &[offset[0], 0.0, 0.0],
                    );
                    total += cell * wde * waz;
                }
            }
            intensity[f] = total;
        }
    }

    /// Half-width of a cell in the DE direction: half the harmonic mean
    /// of the distances to the DE-1 and DE+1 neighbours on the current
    /// wavefront (meters).
    pub fn width_de(&self, ctx: &SpreadContext, de: usize, az: usize) -> f64 {
        let below = de.saturating_sub(1);
        let above = (de + 1).min(self.num_de - 1);
        let centre = ctx.curr.position.get(de, az);
        let d1 = ctx.curr.position.get(below, az).distance(&centre);
        let d2 = ctx.curr.position.get(above, az).distance(&centre);
        harmonic_half(d1, d2)
    }

    /// Half-width of a cell in the AZ direction: half the harmonic mean
    /// of the distances to the AZ-1 and AZ+1 neighbours on the current
    /// wavefront (meters).
    pub fn width_az(&self, ctx: &SpreadContext, de: usize, az: usize) -> f64 {
        let left = az.saturating_sub(1);
        let right = (az + 1).min(self.num_az - 1);
        let centre = ctx.curr.position.get(de, az);
        let d1 = ctx.curr.position.get(de, left).distance(&centre);
        let d2 = ctx.curr.position.get(de, right).distance(&centre);
        harmonic_half(d1, d2)
    }
}

/// Area of the wavefront quad whose lower corner is cell (de, az),
/// approximated as the sum of two triangles over the corner points.
fn quad_area(front: &WaveFront, de: usize, az: usize) -> f64 {
    let p1 = front.position.get(de, az);
    let p2 = front.position.get(de + 1, az);
    let p3 = front.position.get(de + 1, az + 1);
    let p4 = front.position.get(de, az + 1);
    p1.quad_area(&p2, &p3, &p4)
}

/// Half the harmonic mean of two neighbour distances. Falls back to the
/// surviving distance when one side is degenerate.
fn harmonic_half(d1: f64, d2: f64) -> f64 {
    if d1 <= 0.0 {
        return 0.5 * d2;
    }
    if d2 <= 0.0 {
        return 0.5 * d1;
    }
    d1 * d2 / (d1 + d2)
}
