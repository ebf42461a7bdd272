// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Reverberation envelope time series.

For every combination of source beam and receiver beam, the collection
accumulates an intensity matrix over (frequency, two way travel time).
Each bistatic eigenverb contributes a Gaussian of unit area in time,
centred at its peak arrival and spread over its duration, scaled by its
power and by the source and receiver beam gains toward the launch
directions. Sensor kinematics are cached at construction so the
published collection stays meaningful after the platform moves on.
*/

use std::sync::Arc;

use log::debug;

use crate::biverbs::{Biverb, BiverbCollection};
use crate::geo::{BVector, Orientation, WVector};
use crate::seq::SeqRef;
use crate::sensors::SensorModel;
use crate::tasks::AbortFlag;


/// Shared reference to an immutable envelope collection.
pub type EnvelopeCollectionRef = Arc<EnvelopeCollection>;

/// Reverberation intensity envelopes for one source/receiver pair.
pub struct EnvelopeCollection {
    travel_times: SeqRef,
    frequencies: SeqRef,
    num_src_beams: usize,
    num_rcv_beams: usize,
    source_position: WVector,
    receiver_position: WVector,
    source_orient: Orientation,
    receiver_orient: Orientation,
    source_speed: f64,
    receiver_speed: f64,
    /// One (freq x time) row-major matrix per beam pair, indexed
    /// `src_beam * num_rcv_beams + rcv_beam`.
    envelopes: Vec<Vec<f64>>,
}

impl EnvelopeCollection {
    /// Allocate a zero-filled collection.
    ///
    /// # Arguments
    ///
    /// * `travel_times` - Two way travel time axis (seconds).
    ///
    /// * `frequencies` - Frequency axis (Hz).
    ///
    /// * `source` - Source sensor, for beam counts and kinematics.
    ///
    /// * `receiver` - Receiver sensor, for beam counts and kinematics.
    ///
    pub fn new(
        travel_times: SeqRef,
        frequencies: SeqRef,
        source: &SensorModel,
        receiver: &SensorModel,
    ) -> Self {
        let num_src_beams = source.num_src_beams();
        let num_rcv_beams = receiver.num_rcv_beams();
        let size = frequencies.size() * travel_times.size();
        EnvelopeCollection {
            travel_times,
            frequencies,
            num_src_beams,
            num_rcv_beams,
            source_position: source.position(),
            receiver_position: receiver.position(),
            source_orient: source.orientation(),
            receiver_orient: receiver.orientation(),
            source_speed: source.speed(),
            receiver_speed: receiver.speed(),
            envelopes: (0..num_src_beams * num_rcv_beams)
                .map(|_| vec![0.0; size])
                .collect(),
        }
    }

    /// Two way travel time axis (seconds).
    pub fn travel_times(&self) -> &SeqRef {
        &self.travel_times
    }

    /// Frequency axis (Hz).
    pub fn frequencies(&self) -> &SeqRef {
        &self.frequencies
    }

    /// Number of source beams.
    pub fn num_src_beams(&self) -> usize {
        self.num_src_beams
    }

    /// Number of receiver beams.
    pub fn num_rcv_beams(&self) -> usize {
        self.num_rcv_beams
    }

    /// Source position at the time the collection was built.
    pub fn source_position(&self) -> &WVector {
        &self.source_position
    }

    /// Receiver position at the time the collection was built.
    pub fn receiver_position(&self) -> &WVector {
        &self.receiver_position
    }

    /// Source orientation at the time the collection was built.
    pub fn source_orient(&self) -> &Orientation {
        &self.source_orient
    }

    /// Receiver orientation at the time the collection was built.
    pub fn receiver_orient(&self) -> &Orientation {
        &self.receiver_orient
    }

    /// Source speed at the time the collection was built (m/s).
    pub fn source_speed(&self) -> f64 {
        self.source_speed
    }

    /// Receiver speed at the time the collection was built (m/s).
    pub fn receiver_speed(&self) -> f64 {
        self.receiver_speed
    }

    /// Envelope matrix for one beam pair, row-major (freq x time).
    pub fn envelope(&self, src_beam: usize, rcv_beam: usize) -> &[f64] {
        &self.envelopes[src_beam * self.num_rcv_beams + rcv_beam]
    }

    /// Intensity for one beam pair at one (frequency, time) cell.
    pub fn intensity(&self, src_beam: usize, rcv_beam: usize, freq: usize, time: usize) -> f64 {
        self.envelope(src_beam, rcv_beam)[freq * self.travel_times.size() + time]
    }

    /// Adds the intensity contribution for a single bistatic eigenverb:
    /// <pre>
    ///     G(f,t) = P(f) Bs(f) Br(f) / (T sqrt(2 pi))
    ///              exp( -(t - tau)^2 / (2 T^2) )
    /// </pre>
    /// where tau is the peak arrival `verb.time + verb.duration` and T is
    /// the duration. The Gaussian is only evaluated inside the window
    /// [tau - 5T, tau + 5T].
    ///
    /// # Arguments
    ///
    /// * `verb` - Bistatic eigenverb for this contribution.
    ///
    /// * `src_gain` - Source gain, row-major (freq x src_beam).
    ///
    /// * `rcv_gain` - Receiver gain, row-major (freq x rcv_beam).
    ///
    pub fn add_biverb(&mut self, verb: &Biverb, src_gain: &[f64], rcv_gain: &[f64]) {
        let num_times = self.travel_times.size();
        let duration = verb.duration.max(1e-6);
        let tau = verb.time + verb.duration;
        let t_lo = self.travel_times.find_index(tau - 5.0 * duration);
        let t_hi = (self.travel_times.find_index(tau + 5.0 * duration) + 1).min(num_times - 1);
        let norm = 1.0 / (duration * (2.0 * std::f64::consts::PI).sqrt());

        for (f, power) in verb.power.iter().enumerate() {
            for t in t_lo..=t_hi {
                let dt = self.travel_times.value(t) - tau;
                let window = dt.abs() <= 5.0 * duration;
                if !window {
                    continue;
                }
                let gaussian = norm * (-0.5 * (dt / duration) * (dt / duration)).exp();
                for s in 0..self.num_src_beams {
                    let bs = src_gain[f * self.num_src_beams + s];
                    for r in 0..self.num_rcv_beams {
                        let br = rcv_gain[f * self.num_rcv_beams + r];
                        self.envelopes[s * self.num_rcv_beams + r]
                            [f * num_times + t] += power * bs * br * gaussian;
                    }
                }
            }
        }
    }
}

/// Accumulate every biverb of a pair into a fresh envelope collection,
/// applying the beam patterns of both sensors. Returns `None` when the
/// abort flag fires.
///
/// # Arguments
///
/// * `source` - Source sensor.
///
/// * `receiver` - Receiver sensor.
///
/// * `biverbs` - Bistatic eigenverbs for this pair.
///
/// * `frequencies` - Frequency axis (Hz).
///
/// * `travel_times` - Two way travel time axis (seconds).
///
/// * `abort` - Cooperative cancellation flag, checked per biverb.
///
pub fn generate_envelopes(
    source: &SensorModel,
    receiver: &SensorModel,
    biverbs: &BiverbCollection,
    frequencies: SeqRef,
    travel_times: SeqRef,
    abort: &AbortFlag,
) -> Option<EnvelopeCollection> {
    let mut collection =
        EnvelopeCollection::new(travel_times, frequencies.clone(), source, receiver);
    let num_freq = frequencies.size();
    let mut level = vec![0.0; num_freq];
    let mut src_gain = vec![0.0; num_freq * collection.num_src_beams()];
    let mut rcv_gain = vec![0.0; num_freq * collection.num_rcv_beams()];

    for interface in 0..biverbs.num_interfaces() {
        for verb in biverbs.biverbs(interface) {
            if abort.is_aborted() {
                debug!("envelope generation aborted at interface {interface}");
                return None;
            }

            // rotate launch directions into each array's frame and
            // evaluate the beam gains per frequency
            let arrival = BVector::from_de_az(verb.source_de, verb.source_az);
            let arrival = collection.source_orient().world_to_body(&arrival);
            for s in 0..collection.num_src_beams() {
                source.src_beam(s).beam_level(&arrival, &frequencies, &mut level);
                for f in 0..num_freq {
                    src_gain[f * collection.num_src_beams() + s] = level[f];
                }
            }
            let arrival = BVector::from_de_az(verb.receiver_de, verb.receiver_az);
            let arrival = collection.receiver_orient().world_to_body(&arrival);
            for r in 0..collection.num_rcv_beams() {
                receiver.rcv_beam(r).beam_level(&arrival, &frequencies, &mut level);
                for f in 0..num_freq {
                    rcv_gain[f * collection.num_rcv_beams() + r] = level[f];
                }
            }

            collection.add_biverb(verb, &src_gain, &rcv_gain);
        }
    }
    Some(collection)
}
