// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Modeling products for a link between a source and a receiver.

A bistatic pair listens for acoustic changes in its two sensors. The
dirpaths are the eigenrays that connect this source and receiver; they
represent the multipath direct blast contributions to the received
signal. The biverbs represent the bistatic overlap between the source
and receiver eigenverbs, and the envelopes are the reverberation time
series built from those biverbs. Publication always happens in the
order direct paths, eigenverbs, biverbs, envelopes, and intermediate
stages emit update notifications so consumers with lower needs see
timely results.

When an update arrives from the receiver side of a distinct pair, the
source and target sense of the eigenrays is reversed. That reversal
assumes source/receiver reciprocity, which complex range-dependent
environments may violate because of accuracy limits in the wavefront
model.
*/

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock, Weak};

use log::debug;

use crate::biverbs::{generate_biverbs, BiverbCollectionRef};
use crate::eigenrays::{Eigenray, EigenrayCollection, EigenrayCollectionRef};
use crate::eigenverbs::EigenverbCollectionRef;
use crate::envelopes::{generate_envelopes, EnvelopeCollectionRef};
use crate::geo::WVector;
use crate::sensors::{ManagerError, SensorManager, SensorRef, WavefrontListener};
use crate::tasks::TaskHandle;
use crate::wavefront::TargetList;
use crate::wavegen::WaveContext;

#[cfg(test)]
mod test;

/// Stages of the pair publication sequence, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PairStage {
    /// Direct path eigenrays between the sensors.
    DirectPaths,
    /// Source and/or receiver eigenverbs reconciled.
    Eigenverbs,
    /// Bistatic eigenverb overlap complete.
    Biverbs,
    /// Reverberation envelopes complete.
    Envelopes,
}

/// Listener interface for pair updates.
pub trait PairListener: Send + Sync {
    /// A stage of the pair pipeline published new results.
    fn pair_updated(&self, pair_key: &str, stage: PairStage);

    /// An in-flight generator for this pair was aborted. Aborts are a
    /// normal outcome and never surface through the publish channel.
    fn pair_aborted(&self, _pair_key: &str) {}
}

/// Latest published artifacts for a pair.
#[derive(Default)]
struct PairState {
    dirpaths: Option<EigenrayCollectionRef>,
    src_eigenverbs: Option<EigenverbCollectionRef>,
    rcv_eigenverbs: Option<EigenverbCollectionRef>,
    biverbs: Option<BiverbCollectionRef>,
    envelopes: Option<EnvelopeCollectionRef>,
}

/// Shared reference to a bistatic pair.
pub type PairRef = Arc<BistaticPair>;

/// Modeling products for a link between source and receiver. The source
/// and receiver are the same sensor for monostatic pairs.
pub struct BistaticPair {
    source: SensorRef,
    receiver: SensorRef,
    ctx: WaveContext,
    state: RwLock<PairState>,
    biverb_task: Mutex<Option<TaskHandle>>,
    envelope_task: Mutex<Option<TaskHandle>>,
    listeners: Mutex<Vec<Arc<dyn PairListener>>>,
    weak_self: Weak<BistaticPair>,
}

impl BistaticPair {
    /// Construct the link between a source and a receiver and register
    /// it as a wavefront listener on both sensors.
    pub fn new(source: SensorRef, receiver: SensorRef, ctx: WaveContext) -> PairRef {
        let pair = Arc::new_cyclic(|weak: &Weak<BistaticPair>| BistaticPair {
            source: source.clone(),
            receiver: receiver.clone(),
            ctx,
            state: RwLock::new(PairState::default()),
            biverb_task: Mutex::new(None),
            envelope_task: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
            weak_self: weak.clone(),
        });
        let weak = Arc::downgrade(&pair) as Weak<dyn WavefrontListener>;
        source.add_wavefront_listener(weak.clone());
        if source.key() != receiver.key() {
            receiver.add_wavefront_listener(weak);
        }
        pair
    }

    /// Lookup key for this combination of source and receiver.
    pub fn hash_key(&self) -> String {
        generate_hash_key(self.source.key(), self.receiver.key())
    }

    /// Reference to the source sensor.
    pub fn source(&self) -> &SensorRef {
        &self.source
    }

    /// Reference to the receiving sensor.
    pub fn receiver(&self) -> &SensorRef {
        &self.receiver
    }

    /// True when source and receiver are the same sensor.
    pub fn is_monostatic(&self) -> bool {
        self.source.key() == self.receiver.key()
    }

    /// True when both ends of this pair compute reverberation.
    pub fn compute_reverb(&self) -> bool {
        self.source.compute_reverb && self.receiver.compute_reverb
    }

    /// The complement of the given sensor in this pair.
    pub fn complement(&self, sensor_key: i32) -> &SensorRef {
        if sensor_key == self.source.key() {
            &self.receiver
        } else {
            &self.source
        }
    }

    /// Direct paths that connect the source and receiver locations.
    pub fn dirpaths(&self) -> Option<EigenrayCollectionRef> {
        self.state.read().unwrap_or_else(|e| e.into_inner()).dirpaths.clone()
    }

    /// Interface collisions for the wavefront emanating from the source.
    pub fn src_eigenverbs(&self) -> Option<EigenverbCollectionRef> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .src_eigenverbs
            .clone()
    }

    /// Interface collisions for the wavefront emanating from the
    /// receiver.
    pub fn rcv_eigenverbs(&self) -> Option<EigenverbCollectionRef> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .rcv_eigenverbs
            .clone()
    }

    /// Overlap of source and receiver eigenverbs.
    pub fn biverbs(&self) -> Option<BiverbCollectionRef> {
        self.state.read().unwrap_or_else(|e| e.into_inner()).biverbs.clone()
    }

    /// Reverberation envelopes for this pair.
    pub fn envelopes(&self) -> Option<EnvelopeCollectionRef> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .envelopes
            .clone()
    }

    /// Register a listener for pair updates.
    pub fn add_pair_listener(&self, listener: Arc<dyn PairListener>) {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    fn notify(&self, stage: PairStage) {
        let key = self.hash_key();
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for listener in listeners {
            listener.pair_updated(&key, stage);
        }
    }

    fn notify_aborted(&self) {
        let key = self.hash_key();
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for listener in listeners {
            listener.pair_aborted(&key);
        }
    }

    /// Update bistatic eigenverbs with the results of a biverb
    /// generator, then launch the envelope generator.
    fn update_biverbs(&self, biverbs: BiverbCollectionRef) {
        {
            let mut task = self.envelope_task.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(previous) = task.take() {
                previous.abort();
            }
        }
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.biverbs = Some(biverbs.clone());
        }
        self.notify(PairStage::Biverbs);

        let source = self.source.clone();
        let receiver = self.receiver.clone();
        let frequencies = self.source.frequencies.clone();
        let travel_times = self.ctx.travel_times.clone();
        let weak = self.weak_self.clone();
        let handle = self.ctx.pool.run(move |abort| {
            let result = generate_envelopes(
                &source,
                &receiver,
                &biverbs,
                frequencies,
                travel_times,
                abort,
            );
            if let Some(pair) = weak.upgrade() {
                match result {
                    Some(envelopes) => pair.update_envelopes(Arc::new(envelopes)),
                    None => pair.notify_aborted(),
                }
            }
        });
        *self.envelope_task.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Publish finished envelopes.
    fn update_envelopes(&self, envelopes: EnvelopeCollectionRef) {
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.envelopes = Some(envelopes);
        }
        self.notify(PairStage::Envelopes);
    }
}

impl WavefrontListener for BistaticPair {
    fn target_for(&self, sensor_key: i32) -> Option<(i32, WVector)> {
        let complement = self.complement(sensor_key);
        Some((complement.key(), complement.position()))
    }

    /// Notification of eigenray and eigenverb changes for one of this
    /// pair's sensors. Updates the direct path eigenrays, reconciles the
    /// eigenverb pointers, and launches a new biverb generator when both
    /// sides are available.
    fn update_wavefront_data(
        &self,
        sensor_key: i32,
        eigenrays: EigenrayCollectionRef,
        eigenverbs: Option<EigenverbCollectionRef>,
    ) {
        debug!("pair {} update from sensor {sensor_key}", self.hash_key());
        // abort any in-flight biverb task for this pair
        {
            let mut task = self.biverb_task.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(previous) = task.take() {
                previous.abort();
            }
        }

        let is_receiver = sensor_key == self.receiver.key() && !self.is_monostatic();

        // the eigenray collection covers every target near this sensor;
        // extract the list specific to this pair
        let target_id = if is_receiver {
            self.source.key()
        } else {
            self.receiver.key()
        };
        let mut raylist: Vec<Eigenray> = eigenrays
            .find_eigenrays(target_id)
            .iter()
            .map(|ray| (**ray).clone())
            .collect();

        // swap the source/receiver sense of rays computed from the
        // receiver side; valid only under the reciprocity assumption
        if is_receiver {
            for ray in raylist.iter_mut() {
                std::mem::swap(&mut ray.source_de, &mut ray.target_de);
                std::mem::swap(&mut ray.source_az, &mut ray.target_az);
            }
        }

        // fresh collection with just the rays for this pair
        let targets = TargetList::from_column(
            vec![self.receiver.position()],
            vec![self.receiver.key()],
        );
        let mut dirpaths = EigenrayCollection::new(
            eigenrays.frequencies().clone(),
            self.source.position(),
            targets,
        );
        for ray in raylist {
            dirpaths.add_eigenray(0, 0, Arc::new(ray));
        }
        dirpaths.sum_eigenrays();
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.dirpaths = Some(Arc::new(dirpaths));
        }
        self.notify(PairStage::DirectPaths);

        if !self.compute_reverb() {
            return;
        }

        // reconcile the eigenverb pointers for this update
        let (src_verbs, rcv_verbs) = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            if let Some(verbs) = eigenverbs {
                if self.is_monostatic() {
                    state.src_eigenverbs = Some(verbs.clone());
                    state.rcv_eigenverbs = Some(verbs);
                } else if is_receiver {
                    state.rcv_eigenverbs = Some(verbs);
                } else {
                    state.src_eigenverbs = Some(verbs);
                }
            }
            (state.src_eigenverbs.clone(), state.rcv_eigenverbs.clone())
        };
        self.notify(PairStage::Eigenverbs);

        // launch the overlap once both sides are present
        if let (Some(src_verbs), Some(rcv_verbs)) = (src_verbs, rcv_verbs) {
            let ocean = self.ctx.ocean.clone();
            let frequencies = self.source.frequencies.clone();
            let pulse_length = self.source.pulse_length;
            let weak = self.weak_self.clone();
            let handle = self.ctx.pool.run(move |abort| {
                let result = generate_biverbs(
                    &ocean,
                    &frequencies,
                    &src_verbs,
                    &rcv_verbs,
                    pulse_length,
                    abort,
                );
                if let Some(pair) = weak.upgrade() {
                    match result {
                        Some(biverbs) => pair.update_biverbs(Arc::new(biverbs)),
                        None => pair.notify_aborted(),
                    }
                }
            });
            *self.biverb_task.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        }
    }
}

/// Utility to generate the lookup key for a source/receiver combination.
pub fn generate_hash_key(src_key: i32, rcv_key: i32) -> String {
    format!("{src_key}_{rcv_key}")
}

/// Decide whether a source sensor and receiver sensor should form a
/// pair. Monostatic-flagged sensors only pair with themselves, and a
/// positive minimum range suppresses pairs that are too close together,
/// including a sensor's own monostatic pair.
pub fn should_pair(source: &SensorRef, receiver: &SensorRef) -> bool {
    if !source.mode().is_source() || !receiver.mode().is_receiver() {
        return false;
    }
    if source.monostatic || receiver.monostatic {
        return source.key() == receiver.key();
    }
    let min_range = source.min_range.max(receiver.min_range);
    if min_range > 0.0 {
        let range = source.position().distance(&receiver.position());
        if range < min_range {
            return false;
        }
    }
    true
}

/// Keyed store of the active bistatic pairs.
pub struct PairManager {
    ctx: WaveContext,
    pairs: BTreeMap<String, PairRef>,
}

impl PairManager {
    /// Create an empty manager that builds pairs against the given
    /// context.
    pub fn new(ctx: WaveContext) -> Self {
        PairManager {
            ctx,
            pairs: BTreeMap::new(),
        }
    }

    /// Form every missing pair implied by the current sensor fleet.
    /// Existing pairs are left untouched.
    pub fn update_pairs(&mut self, sensors: &SensorManager) {
        for source in sensors.list() {
            for receiver in sensors.list() {
                if !should_pair(source, receiver) {
                    continue;
                }
                let key = generate_hash_key(source.key(), receiver.key());
                if self.pairs.contains_key(&key) {
                    continue;
                }
                debug!("forming pair {key}");
                let pair =
                    BistaticPair::new(source.clone(), receiver.clone(), self.ctx.clone());
                self.pairs.insert(key, pair);
            }
        }
    }

    /// Remove every pair involving the given sensor, after a sensor is
    /// withdrawn from the fleet.
    pub fn remove_sensor(&mut self, sensor_key: i32) {
        let prefix = format!("{sensor_key}_");
        let suffix = format!("_{sensor_key}");
        self.pairs
            .retain(|key, _| !key.starts_with(&prefix) && !key.ends_with(&suffix));
    }

    /// Finds a pair by its lookup key.
    pub fn find(&self, key: &str) -> Result<&PairRef, ManagerError> {
        self.pairs
            .get(key)
            .ok_or_else(|| ManagerError::KeyMissing(key.to_string()))
    }

    /// All pairs in key order.
    pub fn list(&self) -> impl Iterator<Item = &PairRef> {
        self.pairs.values()
    }

    /// Lookup keys of all pairs, in order.
    pub fn keys(&self) -> Vec<String> {
        self.pairs.keys().cloned().collect()
    }

    /// Number of managed pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True when no pairs are managed.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
