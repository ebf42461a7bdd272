// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Eigenrays and their per-target collections.

An eigenray is a single acoustic path between a source and a target. The
collection groups eigenrays by the (row, col) cell of the target matrix
supplied at construction, and sums them into broadband transmission loss
either coherently (adding complex pressures) or incoherently (adding
intensities). Angles are stored in radians; all intensities are linear.
Conversion to degrees and decibels happens in the persistence layer.
*/

use std::f64::consts::PI;
use std::sync::Arc;

use crate::geo::WVector;
use crate::seq::SeqRef;
use crate::wavefront::TargetList;


/// Shared reference to an immutable eigenray.
pub type EigenrayRef = Arc<Eigenray>;

/// Shared reference to an immutable eigenray collection.
pub type EigenrayCollectionRef = Arc<EigenrayCollection>;

/// A single acoustic path between a source and a target. Created by the
/// propagator on CPA detection and immutable thereafter.
#[derive(Clone, Debug, Default)]
pub struct Eigenray {
    /// One way travel time (seconds).
    pub time: f64,
    /// Propagation loss as a linear intensity ratio, per frequency.
    pub intensity: Vec<f64>,
    /// Phase change along the path (radians), per frequency.
    pub phase: Vec<f64>,
    /// Launch depression/elevation angle (radians, positive up).
    pub source_de: f64,
    /// Launch azimuth (radians, clockwise from true north).
    pub source_az: f64,
    /// Arrival depression/elevation angle (radians, positive up).
    pub target_de: f64,
    /// Arrival azimuth (radians, clockwise from true north).
    pub target_az: f64,
    /// Number of interactions with the surface boundary.
    pub surface: u16,
    /// Number of interactions with the bottom boundary.
    pub bottom: u16,
    /// Number of caustics along the path.
    pub caustic: u16,
    /// Number of upper vertices along the path.
    pub upper: u16,
    /// Number of lower vertices along the path.
    pub lower: u16,
}

/// Eigenrays for every target of one wavefront run, plus their coherent
/// and incoherent broadband sums.
pub struct EigenrayCollection {
    frequencies: SeqRef,
    source_position: WVector,
    targets: TargetList,
    rays: Vec<Vec<EigenrayRef>>,
    total_coherent: Vec<Vec<f64>>,
    total_incoherent: Vec<Vec<f64>>,
    summed: bool,
}

impl EigenrayCollection {
    /// Create an empty collection for a matrix of targets.
    ///
    /// # Arguments
    ///
    /// * `frequencies` - Frequencies at which intensities are computed (Hz).
    ///
    /// * `source_position` - Location of the wavefront source.
    ///
    /// * `targets` - Matrix of targets, kept for indexing and persistence.
    ///
    pub fn new(frequencies: SeqRef, source_position: WVector, targets: TargetList) -> Self {
        let count = targets.len();
        let num_freq = frequencies.size();
        EigenrayCollection {
            frequencies,
            source_position,
            targets,
            rays: (0..count).map(|_| Vec::new()).collect(),
            total_coherent: (0..count).map(|_| vec![0.0; num_freq]).collect(),
            total_incoherent: (0..count).map(|_| vec![0.0; num_freq]).collect(),
            summed: false,
        }
    }

    /// Frequencies at which intensities are computed (Hz).
    pub fn frequencies(&self) -> &SeqRef {
        &self.frequencies
    }

    /// Location of the wavefront source.
    pub fn source_position(&self) -> &WVector {
        &self.source_position
    }

    /// The target matrix supplied at construction.
    pub fn targets(&self) -> &TargetList {
        &self.targets
    }

    /// Flattened target index for a (row, col) cell.
    fn target_index(&self, row: usize, col: usize) -> usize {
        row * self.targets.cols + col
    }

    /// Add an eigenray for one target. Invalidates previous sums.
    pub fn add_eigenray(&mut self, row: usize, col: usize, ray: EigenrayRef) {
        let n = self.target_index(row, col);
        self.rays[n].push(ray);
        self.summed = false;
    }

    /// Eigenrays for one target cell.
    pub fn eigenrays(&self, row: usize, col: usize) -> &[EigenrayRef] {
        &self.rays[self.target_index(row, col)]
    }

    /// Eigenrays for the first target with the given identifier, or an
    /// empty slice when the target is not part of this collection.
    pub fn find_eigenrays(&self, target_id: i32) -> &[EigenrayRef] {
        match self.targets.ids.iter().position(|&id| id == target_id) {
            Some(n) => &self.rays[n],
            None => &[],
        }
    }

    /// Total number of eigenrays across all targets.
    pub fn len(&self) -> usize {
        self.rays.iter().map(|r| r.len()).sum()
    }

    /// True when no eigenrays have been collected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum the eigenrays for each target into broadband totals.
    ///
    /// The coherent total adds complex pressures,
    /// `|sum_i sqrt(I_i) exp(j (2 pi f t_i + phi_i))|^2`, so that
    /// multipath interference shows up in the result. The incoherent
    /// total is the plain sum of intensities. Both are computed in one
    /// pass; `coherent` selects which one later queries return by
    /// default.
    pub fn sum_eigenrays(&mut self) {
        for n in 0..self.rays.len() {
            for (f, freq) in self.frequencies.iter().enumerate() {
                let mut re = 0.0;
                let mut im = 0.0;
                let mut power = 0.0;
                for ray in &self.rays[n] {
                    let amplitude = ray.intensity[f].max(0.0).sqrt();
                    let angle = 2.0 * PI * freq * ray.time + ray.phase[f];
                    re += amplitude * angle.cos();
                    im += amplitude * angle.sin();
                    power += ray.intensity[f];
                }
                self.total_coherent[n][f] = re * re + im * im;
                self.total_incoherent[n][f] = power;
            }
        }
        self.summed = true;
    }

    /// True once `sum_eigenrays` has run against the current contents.
    pub fn is_summed(&self) -> bool {
        self.summed
    }

    /// Total propagation loss for one target as a linear intensity ratio
    /// per frequency.
    pub fn total_intensity(&self, row: usize, col: usize, coherent: bool) -> &[f64] {
        let n = self.target_index(row, col);
        if coherent {
            &self.total_coherent[n]
        } else {
            &self.total_incoherent[n]
        }
    }

    /// Transmission loss for one target in positive dB per frequency.
    pub fn transmission_loss(&self, row: usize, col: usize, coherent: bool) -> Vec<f64> {
        self.total_intensity(row, col, coherent)
            .iter()
            .map(|&i| -10.0 * i.max(1e-30).log10())
            .collect()
    }
}
