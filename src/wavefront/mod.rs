// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
A single wavefront snapshot in time.

Holds the positions and normalised propagation directions of every
(DE, AZ) ray in the fan, their time derivatives, caches of the sound
speed field, the path-integrated distance and attenuation, interface
interaction counters, the on_edge mask that separates ray families, and
per-target distance tables used for closest point of approach detection.
*/

use crate::geo::{WVector, WVectorField};
use crate::ocean::Ocean;
use crate::seq::Seq;


/// Matrix of acoustic targets for eigenray generation. Targets keep the
/// (row, col) shape of the matrix they were supplied in, so that
/// eigenray collections can be indexed the same way.
#[derive(Clone, Debug, Default)]
pub struct TargetList {
    /// Target positions in spherical earth coordinates.
    pub positions: Vec<WVector>,
    /// Identifier of each target, used to look up eigenrays per sensor.
    pub ids: Vec<i32>,
    /// Number of rows in the target matrix.
    pub rows: usize,
    /// Number of columns in the target matrix.
    pub cols: usize,
}

impl TargetList {
    /// Single column of targets from parallel position/id lists.
    pub fn from_column(positions: Vec<WVector>, ids: Vec<i32>) -> Self {
        let rows = positions.len();
        TargetList {
            positions,
            ids,
            rows,
            cols: 1,
        }
    }

    /// Number of targets in the matrix.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True when the matrix holds no targets.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// One (DE x AZ) snapshot of a propagating wavefront.
#[derive(Clone, Debug)]
pub struct WaveFront {
    num_de: usize,
    num_az: usize,
    num_freq: usize,
    num_targets: usize,

    /// Location of each ray in spherical earth coordinates.
    pub position: WVectorField,
    /// Normalised propagation direction in the local tangent frame.
    pub ndirection: WVectorField,
    /// Time derivative of position (meters and radians per second).
    pub pos_gradient: WVectorField,
    /// Time derivative of the normalised direction.
    pub ndir_gradient: WVectorField,
    /// Local sound speed gradient cache (m/s per meter, tangent frame).
    pub sound_gradient: WVectorField,
    /// Local sound speed cache (m/s).
    pub sound_speed: Vec<f64>,
    /// Chord length travelled in the step that produced this snapshot.
    pub distance: Vec<f64>,
    /// Cumulative path length from the source (meters).
    pub path_length: Vec<f64>,
    /// Cumulative propagation loss other than spreading, per cell and
    /// frequency (dB, row-major cells x frequencies).
    pub attenuation: Vec<f64>,
    /// Cumulative phase change per cell and frequency (radians).
    pub phase: Vec<f64>,

    /// Number of interactions with the surface boundary.
    pub surface: Vec<u16>,
    /// Number of interactions with the bottom boundary.
    pub bottom: Vec<u16>,
    /// Number of caustics encountered along the path.
    pub caustic: Vec<u16>,
    /// Number of upper volume layer crossings.
    pub upper: Vec<u16>,
    /// Number of lower volume layer crossings.
    pub lower: Vec<u16>,

    /// True when the cell borders a different ray family.
    pub on_edge: Vec<bool>,
    /// False once a cell has produced a non-finite result; invalid cells
    /// are excluded from all later emissions and their counters freeze.
    pub valid: Vec<bool>,

    /// Square of the distance from each cell to each target
    /// (row-major targets x cells).
    pub target_dist2: Vec<f64>,
}

impl WaveFront {
    /// Allocate a zero-filled snapshot for the given fan shape.
    pub fn new(num_de: usize, num_az: usize, num_freq: usize, num_targets: usize) -> Self {
        let cells = num_de * num_az;
        WaveFront {
            num_de,
            num_az,
            num_freq,
            num_targets,
            position: WVectorField::new(num_de, num_az),
            ndirection: WVectorField::new(num_de, num_az),
            pos_gradient: WVectorField::new(num_de, num_az),
            ndir_gradient: WVectorField::new(num_de, num_az),
            sound_gradient: WVectorField::new(num_de, num_az),
            sound_speed: vec![0.0; cells],
            distance: vec![0.0; cells],
            path_length: vec![0.0; cells],
            attenuation: vec![0.0; cells * num_freq],
            phase: vec![0.0; cells * num_freq],
            surface: vec![0; cells],
            bottom: vec![0; cells],
            caustic: vec![0; cells],
            upper: vec![0; cells],
            lower: vec![0; cells],
            on_edge: vec![false; cells],
            valid: vec![true; cells],
            target_dist2: vec![f64::MAX; num_targets * cells],
        }
    }

    /// Number of depression/elevation angles in the fan.
    pub fn num_de(&self) -> usize {
        self.num_de
    }

    /// Number of azimuthal angles in the fan.
    pub fn num_az(&self) -> usize {
        self.num_az
    }

    /// Number of frequencies carried by per-cell spectra.
    pub fn num_freq(&self) -> usize {
        self.num_freq
    }

    /// Number of targets tracked by the distance tables.
    pub fn num_targets(&self) -> usize {
        self.num_targets
    }

    /// Flattened cell index for (de, az).
    #[inline]
    pub fn index(&self, de: usize, az: usize) -> usize {
        de * self.num_az + az
    }

    /// Flattened index into per-cell spectra for (de, az, freq).
    #[inline]
    pub fn freq_index(&self, de: usize, az: usize, freq: usize) -> usize {
        self.index(de, az) * self.num_freq + freq
    }

    /// Initialize all rays at the source position, pointed along their
    /// launch angles.
    ///
    /// # Arguments
    ///
    /// * `source` - Location of the wavefront source.
    ///
    /// * `de_fan` - Launch depression/elevation angles (degrees, up positive).
    ///
    /// * `az_fan` - Launch azimuthal angles (degrees clockwise from north).
    ///
    pub fn init_fan(&mut self, source: &WVector, de_fan: &Seq, az_fan: &Seq) {
        self.position.fill(source);
        for d in 0..self.num_de {
            let de = de_fan.value(d).to_radians();
            for a in 0..self.num_az {
                let az = az_fan.value(a).to_radians();
                let dir = WVector::from_de_az(de, az);
                self.ndirection.set(d, a, &dir);
            }
        }
    }

    /// Recompute the position and direction derivatives of every cell
    /// from the ocean sound speed field.
    ///
    /// The position derivative is `c` times the unit direction, expressed
    /// in coordinate rates: radial meters per second, and colatitude or
    /// longitude radians per second. The direction derivative combines the
    /// component of the sound speed gradient perpendicular to the ray with
    /// the rotation of the local tangent frame along the trajectory.
    pub fn update_derivs(&mut self, ocean: &Ocean) {
        for d in 0..self.num_de {
            for a in 0..self.num_az {
                let n = self.index(d, a);
                if !self.valid[n] {
                    continue;
                }
                let pos = self.position.get(d, a);
                let mut dir = self.ndirection.get(d, a);
                dir.normalize();
                self.ndirection.set(d, a, &dir);

                let (c, grad) = ocean.profile().sound_speed(&pos);
                self.sound_speed[n] = c;
                self.sound_gradient.set(d, a, &grad);

                let pos_grad = position_rate(&pos, &dir, c);
                self.pos_gradient.set(d, a, &pos_grad);
                let ndir_grad = direction_rate(&pos, &dir, c, &grad);
                self.ndir_gradient.set(d, a, &ndir_grad);

                if !pos_grad.rho.is_finite()
                    || !pos_grad.theta.is_finite()
                    || !pos_grad.phi.is_finite()
                    || !ndir_grad.rho.is_finite()
                {
                    self.valid[n] = false;
                }
            }
        }
    }

    /// Refresh the derivative caches of a single cell, after the
    /// reflection solver has moved it.
    pub fn update_cell_derivs(&mut self, ocean: &Ocean, de: usize, az: usize) {
        let n = self.index(de, az);
        if !self.valid[n] {
            return;
        }
        let pos = self.position.get(de, az);
        let mut dir = self.ndirection.get(de, az);
        dir.normalize();
        self.ndirection.set(de, az, &dir);
        let (c, grad) = ocean.profile().sound_speed(&pos);
        self.sound_speed[n] = c;
        self.sound_gradient.set(de, az, &grad);
        self.pos_gradient.set(de, az, &position_rate(&pos, &dir, c));
        self.ndir_gradient
            .set(de, az, &direction_rate(&pos, &dir, c, &grad));
    }

    /// Refresh the distance-squared table between every cell and every
    /// target.
    pub fn update_target_dist2(&mut self, targets: &TargetList) {
        let cells = self.num_de * self.num_az;
        for (t, target) in targets.positions.iter().enumerate() {
            for d in 0..self.num_de {
                for a in 0..self.num_az {
                    let n = self.index(d, a);
                    self.target_dist2[t * cells + n] = if self.valid[n] {
                        self.position.get(d, a).distance2(target)
                    } else {
                        f64::MAX
                    };
                }
            }
        }
    }

    /// Distance squared between one cell and one target.
    #[inline]
    pub fn dist2(&self, target: usize, de: usize, az: usize) -> f64 {
        self.target_dist2[target * self.num_de * self.num_az + self.index(de, az)]
    }

    /// Interface interaction signature that defines the ray family of a
    /// cell.
    #[inline]
    fn family(&self, n: usize) -> (u16, u16, u16, u16, u16) {
        (
            self.surface[n],
            self.bottom[n],
            self.caustic[n],
            self.upper[n],
            self.lower[n],
        )
    }

    /// Mark the cells that border a different ray family. Rays on the
    /// outside of the fan are always treated as edges, since they have no
    /// neighbours on one side to interpolate against.
    pub fn find_edges(&mut self) {
        for d in 0..self.num_de {
            for a in 0..self.num_az {
                let n = self.index(d, a);
                if d == 0 || d + 1 == self.num_de || a == 0 || a + 1 == self.num_az {
                    self.on_edge[n] = true;
                    continue;
                }
                let family = self.family(n);
                let neighbours = [
                    self.index(d - 1, a),
                    self.index(d + 1, a),
                    self.index(d, a - 1),
                    self.index(d, a + 1),
                ];
                self.on_edge[n] = neighbours
                    .iter()
                    .any(|&m| self.family(m) != family || !self.valid[m])
                    || !self.valid[n];
            }
        }
    }

    /// Copy the path-history state of another snapshot into this one:
    /// counters, attenuation, phase, cumulative path, and validity.
    /// Used when a new `next` snapshot inherits from `curr` before a step.
    pub fn inherit_history(&mut self, from: &WaveFront) {
        self.surface.copy_from_slice(&from.surface);
        self.bottom.copy_from_slice(&from.bottom);
        self.caustic.copy_from_slice(&from.caustic);
        self.upper.copy_from_slice(&from.upper);
        self.lower.copy_from_slice(&from.lower);
        self.attenuation.copy_from_slice(&from.attenuation);
        self.phase.copy_from_slice(&from.phase);
        self.path_length.copy_from_slice(&from.path_length);
        self.valid.copy_from_slice(&from.valid);
    }
}

/// Rate of change of the spherical position coordinates for a ray moving
/// at speed `c` along the unit direction `dir`: radial meters per second
/// and colatitude/longitude radians per second.
pub fn position_rate(pos: &WVector, dir: &WVector, c: f64) -> WVector {
    let sin_theta = pos.theta.sin();
    WVector::new(
        c * dir.rho,
        c * dir.theta / pos.rho,
        c * dir.phi / (pos.rho * sin_theta),
    )
}

/// Rate of change of the unit propagation direction: the component of
/// the sound speed gradient perpendicular to the ray, plus the rotation
/// of the local tangent frame along the trajectory. The rotation terms
/// are antisymmetric, so the direction stays unit length in an
/// iso-velocity ocean.
pub fn direction_rate(pos: &WVector, dir: &WVector, c: f64, grad: &WVector) -> WVector {
    let sin_theta = pos.theta.sin();
    let tdot = c * dir.theta / pos.rho;
    let psdot = c * dir.phi / pos.rho;
    let pcdot = psdot * pos.theta.cos() / sin_theta;
    let along = dir.vdot(grad);
    WVector::new(
        -(grad.rho - along * dir.rho) + tdot * dir.theta + psdot * dir.phi,
        -(grad.theta - along * dir.theta) - tdot * dir.rho + pcdot * dir.phi,
        -(grad.phi - along * dir.phi) - psdot * dir.rho - pcdot * dir.theta,
    )
}

/// Solve for the minimum of a quadratic fit through a 3x3x3 block of
/// distance-squared samples centred on a wavefront cell. The three axes
/// are (time, DE, AZ) in units of one step or one cell.
///
/// # Arguments
///
/// * `d` - Samples indexed as `d[time][de][az]` with index 1 the centre.
///
/// # Returns
///
/// * Offsets of the minimum from the centre along each axis, when the
///   fit succeeds and the minimum falls inside the half-open cell box
///   [-1/2, +1/2) on every axis. `None` otherwise.
///
pub fn quadratic_offsets(d: &[[[f64; 3]; 3]; 3]) -> Option<[f64; 3]> {
    // gradient at the centre
    let g = [
        0.5 * (d[2][1][1] - d[0][1][1]),
        0.5 * (d[1][2][1] - d[1][0][1]),
        0.5 * (d[1][1][2] - d[1][1][0]),
    ];
    // symmetric Hessian from central differences
    let h00 = d[2][1][1] - 2.0 * d[1][1][1] + d[0][1][1];
    let h11 = d[1][2][1] - 2.0 * d[1][1][1] + d[1][0][1];
    let h22 = d[1][1][2] - 2.0 * d[1][1][1] + d[1][1][0];
    let h01 = 0.25 * (d[2][2][1] - d[2][0][1] - d[0][2][1] + d[0][0][1]);
    let h02 = 0.25 * (d[2][1][2] - d[2][1][0] - d[0][1][2] + d[0][1][0]);
    let h12 = 0.25 * (d[1][2][2] - d[1][2][0] - d[1][0][2] + d[1][0][0]);

    // solve H x = -g with the adjugate of the symmetric 3x3 matrix
    let det = h00 * (h11 * h22 - h12 * h12) - h01 * (h01 * h22 - h12 * h02)
        + h02 * (h01 * h12 - h11 * h02);
    if det.abs() < 1e-30 || !det.is_finite() {
        return None;
    }
    let a00 = h11 * h22 - h12 * h12;
    let a01 = h02 * h12 - h01 * h22;
    let a02 = h01 * h12 - h02 * h11;
    let a11 = h00 * h22 - h02 * h02;
    let a12 = h01 * h02 - h00 * h12;
    let a22 = h00 * h11 - h01 * h01;
    let x = [
        -(a00 * g[0] + a01 * g[1] + a02 * g[2]) / det,
        -(a01 * g[0] + a11 * g[1] + a12 * g[2]) / det,
        -(a02 * g[0] + a12 * g[1] + a22 * g[2]) / det,
    ];
    for v in x {
        if !v.is_finite() || !(-0.5..0.5).contains(&v) {
            return None;
        }
    }
    Some(x)
}
