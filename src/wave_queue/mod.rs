// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Wavefront propagator for a single source.

Maintains a four snapshot ring (past, prev, curr, next) so that the
steady state integrator can run a third order Adams-Bashforth predictor
and the collision and closest-point-of-approach logic can fit second
order Taylor series with data on both sides of the current snapshot.
Each step detects boundary collisions, counts caustics, classifies ray
families, extracts eigenrays for every target, and projects eigenverbs
onto the reverberation interfaces.
*/

use std::sync::Arc;

use log::debug;

use crate::eigenrays::{Eigenray, EigenrayCollection};
use crate::eigenverbs::{wrap_compass, Eigenverb, EigenverbCollection, InterfaceType};
use crate::geo::WVector;
use crate::ocean::OceanRef;
use crate::ode;
use crate::reflection::{detect_reflections, detect_volume_crossings, Collision};
use crate::seq::SeqRef;
use crate::spreading::{SpreadContext, Spreading, SpreadingType};
use crate::wavefront::{quadratic_offsets, TargetList, WaveFront};

#[cfg(test)]
mod test;

/// Default minimum intensity for emitted eigenrays: linear equivalent
/// of -300 dB.
pub const DEFAULT_INTENSITY_THRESHOLD: f64 = 1e-30;

/// Propagates a wavefront from a single source through the ocean.
pub struct WaveQueue {
    ocean: OceanRef,
    frequencies: SeqRef,
    source_position: WVector,
    de_fan: SeqRef,
    az_fan: SeqRef,
    time_step: f64,
    time: f64,
    step_count: usize,

    past: Box<WaveFront>,
    prev: Box<WaveFront>,
    curr: Box<WaveFront>,
    next: Box<WaveFront>,

    targets: TargetList,
    spreading: Spreading,

    /// Minimum linear intensity for emitted eigenrays.
    pub intensity_threshold: f64,
    /// Eigenrays and eigenverbs with more bottom bounces are dropped.
    pub max_bottom: u16,
    /// Eigenrays and eigenverbs with more surface bounces are dropped.
    pub max_surface: u16,

    eigenrays: EigenrayCollection,
    eigenverbs: Option<EigenverbCollection>,
    trace: Option<WavefrontTrace>,
}

impl WaveQueue {
    /// Initialize a propagation scenario.
    ///
    /// # Arguments
    ///
    /// * `ocean` - Reference to the environmental parameters.
    ///
    /// * `frequencies` - Frequencies over which to compute intensity (Hz).
    ///
    /// * `source_position` - Location of the wavefront source.
    ///
    /// * `de_fan` - Initial depression/elevation angles (degrees, positive
    ///   up).
    ///
    /// * `az_fan` - Initial azimuthal angles (degrees, clockwise from true
    ///   north). Fans that wrap around all azimuths should include rays
    ///   for both 0 and 360 degrees.
    ///
    /// * `time_step` - Propagation step size (seconds).
    ///
    /// * `targets` - Acoustic targets for eigenray extraction.
    ///
    /// * `spreading_type` - Classic ray or hybrid Gaussian spreading.
    ///
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ocean: OceanRef,
        frequencies: SeqRef,
        source_position: WVector,
        de_fan: SeqRef,
        az_fan: SeqRef,
        time_step: f64,
        targets: TargetList,
        spreading_type: SpreadingType,
    ) -> Self {
        let num_de = de_fan.size();
        let num_az = az_fan.size();
        let num_freq = frequencies.size();
        let num_targets = targets.len();

        let mut curr = Box::new(WaveFront::new(num_de, num_az, num_freq, num_targets));
        curr.init_fan(&source_position, &de_fan, &az_fan);
        curr.update_derivs(&ocean);
        curr.update_target_dist2(&targets);
        let (init_speed, _) = ocean.profile().sound_speed(&source_position);
        let spreading = Spreading::new(spreading_type, &de_fan, &az_fan, init_speed);

        let past = curr.clone();
        let prev = curr.clone();
        let next = curr.clone();
        let eigenrays = EigenrayCollection::new(
            frequencies.clone(),
            source_position,
            targets.clone(),
        );

        WaveQueue {
            ocean,
            frequencies,
            source_position,
            de_fan,
            az_fan,
            time_step,
            time: 0.0,
            step_count: 0,
            past,
            prev,
            curr,
            next,
            targets,
            spreading,
            intensity_threshold: DEFAULT_INTENSITY_THRESHOLD,
            max_bottom: 999,
            max_surface: 999,
            eigenrays,
            eigenverbs: None,
            trace: None,
        }
    }

    /// Enable eigenverb generation for the reverberation model.
    pub fn enable_eigenverbs(&mut self) {
        self.eigenverbs = Some(EigenverbCollection::new(self.ocean.num_volumes()));
    }

    /// Enable recording of the wavefront history for persistence.
    pub fn enable_trace(&mut self) {
        let mut trace = WavefrontTrace::new(self.curr.num_de(), self.curr.num_az());
        trace.record(self.time, &self.curr);
        self.trace = Some(trace);
    }

    /// Travel time of the current snapshot (seconds).
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Propagation step size (seconds).
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Number of steps taken so far.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Location of the wavefront source.
    pub fn source_position(&self) -> &WVector {
        &self.source_position
    }

    /// The current wavefront snapshot.
    pub fn curr(&self) -> &WaveFront {
        &self.curr
    }

    /// Frequencies over which intensity is computed (Hz).
    pub fn frequencies(&self) -> &SeqRef {
        &self.frequencies
    }

    /// Eigenrays collected so far.
    pub fn eigenrays(&self) -> &EigenrayCollection {
        &self.eigenrays
    }

    /// Number of eigenrays collected so far.
    pub fn num_eigenrays(&self) -> usize {
        self.eigenrays.len()
    }

    /// Consume the queue and publish its collections: eigenrays, then
    /// eigenverbs (with spatial indexes built), then the optional trace.
    pub fn into_collections(
        mut self,
    ) -> (
        EigenrayCollection,
        Option<EigenverbCollection>,
        Option<WavefrontTrace>,
    ) {
        self.eigenrays.sum_eigenrays();
        if let Some(verbs) = self.eigenverbs.as_mut() {
            verbs.build_indexes();
        }
        (self.eigenrays, self.eigenverbs, self.trace)
    }

    /// March the wavefront forward one time step.
    pub fn step(&mut self) {
        let dt = self.time_step;
        self.next.inherit_history(&self.curr);

        // integrate positions and directions
        if self.step_count < 3 {
            // start-up: 3rd order Runge-Kutta with fresh derivative
            // evaluations at the half and full step
            let mut y1 = self.curr.clone();
            ode::rk1_pos(dt, &self.curr, &mut y1);
            ode::rk1_ndir(dt, &self.curr, &mut y1);
            y1.update_derivs(&self.ocean);
            let mut y2 = self.curr.clone();
            ode::rk2_pos(dt, &self.curr, &y1, &mut y2);
            ode::rk2_ndir(dt, &self.curr, &y1, &mut y2);
            y2.update_derivs(&self.ocean);
            ode::rk3_pos(dt, &self.curr, &y1, &y2, &mut self.next);
            ode::rk3_ndir(dt, &self.curr, &y1, &y2, &mut self.next);
            for d in 0..self.curr.num_de() {
                for a in 0..self.curr.num_az() {
                    let n = self.curr.index(d, a);
                    self.next.distance[n] =
                        self.curr.position.get(d, a).distance(&self.next.position.get(d, a));
                }
            }
        } else {
            // steady state: 3rd order Adams-Bashforth over the ring
            ode::ab3_pos(dt, &self.past, &self.prev, &self.curr, &mut self.next);
            ode::ab3_ndir(dt, &self.past, &self.prev, &self.curr, &mut self.next);
        }
        self.next.update_derivs(&self.ocean);

        // integrate path length and absorption along the chord
        let num_freq = self.frequencies.size();
        let mut absorb = vec![0.0; num_freq];
        for d in 0..self.curr.num_de() {
            for a in 0..self.curr.num_az() {
                let n = self.curr.index(d, a);
                if !self.next.valid[n] {
                    continue;
                }
                let chord = self.next.distance[n];
                self.next.path_length[n] += chord;
                let pos = self.next.position.get(d, a);
                self.ocean
                    .profile()
                    .attenuation(&pos, &self.frequencies, chord, &mut absorb);
                for f in 0..num_freq {
                    self.next.attenuation[n * num_freq + f] += absorb[f];
                }
            }
        }

        self.detect_caustics();
        self.detect_boundary_collisions();
        self.next.find_edges();
        self.next.update_target_dist2(&self.targets);
        if self.step_count >= 2 {
            self.detect_target_cpas();
        }

        // rotate the ring, recycling the oldest snapshot as the new next
        std::mem::swap(&mut self.past, &mut self.prev);
        std::mem::swap(&mut self.prev, &mut self.curr);
        std::mem::swap(&mut self.curr, &mut self.next);
        self.time += dt;
        self.step_count += 1;

        if let Some(trace) = self.trace.as_mut() {
            trace.record(self.time, &self.curr);
        }
    }

    /// A caustic occurs when the wavefront folds over itself: the radial
    /// ordering of two adjacent DE rays inverts between snapshots. The
    /// folded ray picks up a -pi/2 phase shift at each caustic.
    fn detect_caustics(&mut self) {
        if self.step_count < 1 {
            return;
        }
        let num_freq = self.frequencies.size();
        for a in 0..self.curr.num_az() {
            for d in 0..self.curr.num_de() - 1 {
                let n_low = self.curr.index(d, a);
                let n_high = self.curr.index(d + 1, a);
                if !self.next.valid[n_low] || !self.next.valid[n_high] {
                    continue;
                }
                // folds across a bounce are family changes, not caustics
                if self.curr.surface[n_low] != self.curr.surface[n_high]
                    || self.curr.bottom[n_low] != self.curr.bottom[n_high]
                {
                    continue;
                }
                let before = self.curr.position.rho[n_high] - self.curr.position.rho[n_low];
                let after = self.next.position.rho[n_high] - self.next.position.rho[n_low];
                if before * after < 0.0 {
                    self.next.caustic[n_high] += 1;
                    for f in 0..num_freq {
                        self.next.phase[n_high * num_freq + f] -=
                            std::f64::consts::FRAC_PI_2;
                    }
                }
            }
        }
    }

    /// Detect and process boundary reflections and volume layer
    /// crossings, emitting eigenverbs for each collision.
    fn detect_boundary_collisions(&mut self) {
        let mut collisions: Vec<Collision> = Vec::new();
        for d in 0..self.curr.num_de() {
            for a in 0..self.curr.num_az() {
                collisions.extend(detect_reflections(
                    &self.ocean,
                    &self.frequencies,
                    &self.prev,
                    &self.curr,
                    &mut self.next,
                    d,
                    a,
                    self.time,
                    self.time_step,
                ));
                collisions.extend(detect_volume_crossings(
                    &self.ocean,
                    &self.frequencies,
                    &self.curr,
                    &mut self.next,
                    d,
                    a,
                    self.time,
                    self.time_step,
                ));
            }
        }
        if self.eigenverbs.is_none() {
            return;
        }
        for collision in collisions {
            self.emit_eigenverb(&collision);
        }
    }

    /// Build a Gaussian interface projection for one collision and add
    /// it to the eigenverb collection.
    fn emit_eigenverb(&mut self, collision: &Collision) {
        let n = self.curr.index(collision.de, collision.az);
        if !self.next.valid[n]
            || self.next.bottom[n] > self.max_bottom
            || self.next.surface[n] > self.max_surface
        {
            return;
        }

        // footprint from the beam widths projected through the grazing
        // angle
        let ctx = self.spread_context();
        let sin_grazing = collision.grazing.sin().max(1e-6);
        let length = self
            .spreading
            .width_de(&ctx, collision.de, collision.az)
            / sin_grazing;
        let width = self.spreading.width_az(&ctx, collision.de, collision.az);
        if length <= 0.0 || width <= 0.0 {
            return;
        }

        // fraction of the source level reaching the patch
        let (init_speed, _) = self.ocean.profile().sound_speed(&self.source_position);
        let solid =
            self.spreading
                .solid_angle(collision.de, collision.az, init_speed)
            / (4.0 * std::f64::consts::PI);
        let power: Vec<f64> = collision
            .attenuation
            .iter()
            .map(|att_db| solid * 10.0_f64.powf(-att_db / 10.0) / sin_grazing)
            .collect();
        if !power.iter().any(|&p| p > 0.0 && p.is_finite()) {
            return;
        }

        let (_, heading) = collision.direction.direction_angles();
        let verb = Eigenverb {
            time: collision.time,
            power,
            length,
            length2: length * length,
            width,
            width2: width * width,
            position: collision.position,
            direction: wrap_compass(heading),
            grazing: collision.grazing,
            sound_speed: collision.sound_speed,
            de_index: collision.de,
            az_index: collision.az,
            source_de: self.de_fan.value(collision.de).to_radians(),
            source_az: wrap_compass(self.az_fan.value(collision.az).to_radians()),
            surface: self.next.surface[n],
            bottom: self.next.bottom[n],
            caustic: self.next.caustic[n],
            upper: self.next.upper[n],
            lower: self.next.lower[n],
            bounding_box: Default::default(),
        };
        if let Some(collection) = self.eigenverbs.as_mut() {
            collection.add_eigenverb(collision.interface, verb);
        }
    }

    /// Look for closest points of approach between the current snapshot
    /// and every target, and emit an eigenray for each one found.
    fn detect_target_cpas(&mut self) {
        if self.targets.is_empty() {
            return;
        }
        let num_de = self.curr.num_de();
        let num_az = self.curr.num_az();
        let mut rays = Vec::new();
        for t in 0..self.targets.len() {
            for d in 1..num_de.saturating_sub(1) {
                for a in 1..num_az.saturating_sub(1) {
                    let n = self.curr.index(d, a);
                    if !self.curr.valid[n] || self.curr.on_edge[n] {
                        continue;
                    }
                    // the centre cell must be the discrete minimum over
                    // time before the quadratic fit is worth running
                    let centre = self.curr.dist2(t, d, a);
                    if centre > self.prev.dist2(t, d, a) || centre > self.next.dist2(t, d, a)
                    {
                        continue;
                    }
                    let mut block = [[[0.0; 3]; 3]; 3];
                    for (i, front) in
                        [&self.prev, &self.curr, &self.next].iter().enumerate()
                    {
                        for di in 0..3 {
                            for ai in 0..3 {
                                block[i][di][ai] =
                                    front.dist2(t, d + di - 1, a + ai - 1);
                            }
                        }
                    }
                    if let Some(offsets) = quadratic_offsets(&block) {
                        if let Some(ray) = self.build_eigenray(t, d, a, &offsets) {
                            rays.push((t, ray));
                        }
                    }
                }
            }
        }
        for (t, ray) in rays {
            let row = t / self.targets.cols;
            let col = t % self.targets.cols;
            self.eigenrays.add_eigenray(row, col, Arc::new(ray));
        }
    }

    fn spread_context(&self) -> SpreadContext<'_> {
        SpreadContext {
            prev: &self.prev,
            curr: &self.curr,
            next: &self.next,
            de_fan: &self.de_fan,
            az_fan: &self.az_fan,
            frequencies: &self.frequencies,
            time_step: self.time_step,
            ocean: &*self.ocean,
        }
    }

    /// Assemble one eigenray from a refined CPA.
    fn build_eigenray(
        &self,
        target: usize,
        de: usize,
        az: usize,
        offsets: &[f64; 3],
    ) -> Option<Eigenray> {
        let n = self.curr.index(de, az);
        if self.curr.bottom[n] > self.max_bottom || self.curr.surface[n] > self.max_surface {
            return None;
        }
        let num_freq = self.frequencies.size();
        let target_pos = self.targets.positions[target];

        let mut spread = vec![0.0; num_freq];
        let ctx = self.spread_context();
        self.spreading
            .intensity(&ctx, &target_pos, de, az, offsets, &mut spread);

        let mut intensity = vec![0.0; num_freq];
        let mut phase = vec![0.0; num_freq];
        let mut strongest = 0.0_f64;
        for f in 0..num_freq {
            let att_db = self.curr.attenuation[n * num_freq + f];
            intensity[f] = spread[f] * 10.0_f64.powf(-att_db / 10.0);
            phase[f] = self.curr.phase[n * num_freq + f];
            strongest = strongest.max(intensity[f]);
        }
        if strongest < self.intensity_threshold || !strongest.is_finite() {
            return None;
        }

        let de_launch =
            (self.de_fan.value(de) + offsets[1] * self.de_fan.increment(de)).to_radians();
        let az_launch =
            (self.az_fan.value(az) + offsets[2] * self.az_fan.increment(az)).to_radians();
        let (target_de, target_az) = self.curr.ndirection.get(de, az).direction_angles();

        debug!(
            "eigenray target={target} t={:.3} de={de} az={az}",
            self.time + offsets[0] * self.time_step
        );
        Some(Eigenray {
            time: self.time + offsets[0] * self.time_step,
            intensity,
            phase,
            source_de: de_launch,
            source_az: wrap_compass(az_launch),
            target_de,
            target_az,
            surface: self.curr.surface[n],
            bottom: self.curr.bottom[n],
            caustic: self.curr.caustic[n],
            upper: self.curr.upper[n],
            lower: self.curr.lower[n],
        })
    }
}

/// Recorded history of a propagating wavefront, one frame per step.
/// Everything is stored in I/O units (degrees and meters) so that the
/// persistence layer can stream it without touching the engine.
pub struct WavefrontTrace {
    num_de: usize,
    num_az: usize,
    /// Travel time of each frame (seconds).
    pub travel_times: Vec<f64>,
    /// Latitude of each cell per frame (degrees_north).
    pub latitude: Vec<Vec<f64>>,
    /// Longitude of each cell per frame (degrees_east).
    pub longitude: Vec<Vec<f64>>,
    /// Altitude of each cell per frame (meters, positive up).
    pub altitude: Vec<Vec<f64>>,
    /// Surface bounce counts per frame.
    pub surface: Vec<Vec<u16>>,
    /// Bottom bounce counts per frame.
    pub bottom: Vec<Vec<u16>>,
    /// Caustic counts per frame.
    pub caustic: Vec<Vec<u16>>,
    /// Upper vertex counts per frame.
    pub upper: Vec<Vec<u16>>,
    /// Lower vertex counts per frame.
    pub lower: Vec<Vec<u16>>,
    /// Ray family edge mask per frame.
    pub on_edge: Vec<Vec<bool>>,
}

impl WavefrontTrace {
    fn new(num_de: usize, num_az: usize) -> Self {
        WavefrontTrace {
            num_de,
            num_az,
            travel_times: Vec::new(),
            latitude: Vec::new(),
            longitude: Vec::new(),
            altitude: Vec::new(),
            surface: Vec::new(),
            bottom: Vec::new(),
            caustic: Vec::new(),
            upper: Vec::new(),
            lower: Vec::new(),
            on_edge: Vec::new(),
        }
    }

    /// Number of depression/elevation angles per frame.
    pub fn num_de(&self) -> usize {
        self.num_de
    }

    /// Number of azimuth angles per frame.
    pub fn num_az(&self) -> usize {
        self.num_az
    }

    fn record(&mut self, time: f64, front: &WaveFront) {
        let cells = self.num_de * self.num_az;
        let mut lat = Vec::with_capacity(cells);
        let mut lng = Vec::with_capacity(cells);
        let mut alt = Vec::with_capacity(cells);
        for d in 0..self.num_de {
            for a in 0..self.num_az {
                let pos = front.position.get(d, a);
                lat.push(pos.latitude());
                lng.push(pos.longitude());
                alt.push(pos.altitude());
            }
        }
        self.travel_times.push(time);
        self.latitude.push(lat);
        self.longitude.push(lng);
        self.altitude.push(alt);
        self.surface.push(front.surface.clone());
        self.bottom.push(front.bottom.clone());
        self.caustic.push(front.caustic.clone());
        self.upper.push(front.upper.clone());
        self.lower.push(front.lower.clone());
        self.on_edge.push(front.on_edge.clone());
    }
}
