// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Active sensors in the simulation.

A sensor is the acoustic host of a source, a receiver, or both. As the
platform moves, `wavegen::update_sensor` compares the new position and
orientation against thresholds; once the motion is large enough it
aborts any in-flight propagation for this sensor and launches a new
background wavefront generator. Finished eigenray and eigenverb
collections are stored on the sensor and forwarded to all registered
wavefront listeners, which is how bistatic pairs learn about fresh
acoustics.
*/

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock, Weak};

use log::debug;
use num_derive::FromPrimitive;

use crate::eigenrays::EigenrayCollectionRef;
use crate::eigenverbs::EigenverbCollectionRef;
use crate::geo::{BVector, Orientation, WVector};
use crate::seq::{Seq, SeqRef};
use crate::tasks::TaskHandle;
use crate::wavefront::TargetList;

pub mod error;
pub use error::ManagerError;


/// Ability of a sensor to support source and/or receiver behaviors.
#[repr(C)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, FromPrimitive)]
pub enum XmitRcvMode {
    /// Sensor transmits only.
    Source = 1,
    /// Sensor listens only.
    Receiver = 2,
    /// Sensor both transmits and listens.
    Both = 3,
}

impl XmitRcvMode {
    /// True when the sensor can transmit.
    pub fn is_source(&self) -> bool {
        matches!(self, XmitRcvMode::Source | XmitRcvMode::Both)
    }

    /// True when the sensor can listen.
    pub fn is_receiver(&self) -> bool {
        matches!(self, XmitRcvMode::Receiver | XmitRcvMode::Both)
    }
}

/// Implements fmt::Display for XmitRcvMode enum
impl fmt::Display for XmitRcvMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                XmitRcvMode::Source => "source",
                XmitRcvMode::Receiver => "receiver",
                XmitRcvMode::Both => "source/receiver",
            }
        )
    }
}

/// Beam pattern of a transducer array: the gain of the array toward an
/// arrival direction expressed in the array's own (forward, right, up)
/// coordinates.
pub trait BeamPattern: Send + Sync {
    /// Computes the beam gain for each frequency.
    ///
    /// # Arguments
    ///
    /// * `arrival` - Arrival direction in array coordinates.
    ///
    /// * `frequencies` - Frequencies at which to compute gain (Hz).
    ///
    /// * `level` - Linear gain per frequency (output).
    ///
    fn beam_level(&self, arrival: &BVector, frequencies: &Seq, level: &mut [f64]);
}

/// Omni-directional beam pattern with unit gain everywhere.
#[derive(Default)]
pub struct BeamOmni;

impl BeamPattern for BeamOmni {
    fn beam_level(&self, _arrival: &BVector, _frequencies: &Seq, level: &mut [f64]) {
        level.fill(1.0);
    }
}

/// Unshaded line array along the forward axis of the sensor.
pub struct BeamLine {
    /// Number of elements in the array.
    num_elements: usize,
    /// Element spacing (meters).
    spacing: f64,
    /// Nominal sound speed used for the wavenumber (m/s).
    sound_speed: f64,
}

impl BeamLine {
    pub fn new(num_elements: usize, spacing: f64, sound_speed: f64) -> Self {
        BeamLine {
            num_elements,
            spacing,
            sound_speed,
        }
    }
}

impl BeamPattern for BeamLine {
    fn beam_level(&self, arrival: &BVector, frequencies: &Seq, level: &mut [f64]) {
        let cos_axis = arrival.front.clamp(-1.0, 1.0);
        let n = self.num_elements as f64;
        for (i, freq) in frequencies.iter().enumerate() {
            let k = 2.0 * std::f64::consts::PI * freq / self.sound_speed;
            let x = 0.5 * k * self.spacing * cos_axis;
            let af = if x.sin().abs() < 1e-12 {
                1.0
            } else {
                (n * x).sin() / (n * x.sin())
            };
            level[i] = af * af;
        }
    }
}

/// Listener interface used to push freshly computed acoustics from a
/// sensor to the bistatic pairs that depend on it.
pub trait WavefrontListener: Send + Sync {
    /// The complement of `sensor_key` in this pairing, as an eigenray
    /// target: identifier and current position. `None` when the listener
    /// holds no complement for this sensor.
    fn target_for(&self, sensor_key: i32) -> Option<(i32, WVector)>;

    /// Notification that a propagation run for `sensor_key` finished.
    fn update_wavefront_data(
        &self,
        sensor_key: i32,
        eigenrays: EigenrayCollectionRef,
        eigenverbs: Option<EigenverbCollectionRef>,
    );
}

/// Mutable kinematic and acoustic state of a sensor.
struct SensorState {
    position: WVector,
    orientation: Orientation,
    speed: f64,
    initialized: bool,
    eigenrays: Option<EigenrayCollectionRef>,
    eigenverbs: Option<EigenverbCollectionRef>,
}

/// Shared reference to a sensor.
pub type SensorRef = Arc<SensorModel>;

/// Instance of an active sensor in the simulation.
pub struct SensorModel {
    key: i32,
    description: String,
    mode: XmitRcvMode,
    /// When true this sensor only ever pairs with itself.
    pub monostatic: bool,
    /// Pairs closer than this range are suppressed (meters). A value
    /// above zero also suppresses the monostatic pair of this sensor.
    pub min_range: f64,
    /// When false the propagation skips eigenverb generation.
    pub compute_reverb: bool,

    /// Launch depression/elevation fan (degrees).
    pub de_fan: SeqRef,
    /// Launch azimuth fan (degrees).
    pub az_fan: SeqRef,
    /// Frequencies for this sensor's acoustics (Hz).
    pub frequencies: SeqRef,
    /// Propagation step size (seconds).
    pub time_step: f64,
    /// Maximum propagation time (seconds).
    pub time_max: f64,
    /// Movement that triggers a new propagation (meters).
    pub position_threshold: f64,
    /// Rotation that triggers a new propagation (degrees).
    pub orientation_threshold: f64,
    /// Duration of the transmit pulse (seconds).
    pub pulse_length: f64,

    src_beams: Vec<Arc<dyn BeamPattern>>,
    rcv_beams: Vec<Arc<dyn BeamPattern>>,

    state: RwLock<SensorState>,
    listeners: Mutex<Vec<Weak<dyn WavefrontListener>>>,
    wavefront_task: Mutex<Option<TaskHandle>>,
}

impl SensorModel {
    /// Construct a new sensor. Position and orientation stay unset until
    /// the first `update_sensor` call.
    ///
    /// # Arguments
    ///
    /// * `key` - Identification used to find this sensor in the manager.
    ///
    /// * `description` - Human readable name for this sensor instance.
    ///
    /// * `mode` - Source/receiver capability of this sensor.
    ///
    pub fn new(key: i32, description: &str, mode: XmitRcvMode) -> Self {
        let de_fan = Arc::new(Seq::linear(-90.0, 2.0, 91).unwrap_or_else(|_| unreachable!()));
        let az_fan = Arc::new(Seq::linear(0.0, 10.0, 36).unwrap_or_else(|_| unreachable!()));
        let frequencies =
            Arc::new(Seq::linear(1000.0, 0.0, 1).unwrap_or_else(|_| unreachable!()));
        SensorModel {
            key,
            description: description.to_string(),
            mode,
            monostatic: false,
            min_range: 0.0,
            compute_reverb: true,
            de_fan,
            az_fan,
            frequencies,
            time_step: 0.1,
            time_max: 10.0,
            position_threshold: 10.0,
            orientation_threshold: 5.0,
            pulse_length: 0.1,
            src_beams: vec![Arc::new(BeamOmni) as Arc<dyn BeamPattern>],
            rcv_beams: vec![Arc::new(BeamOmni) as Arc<dyn BeamPattern>],
            state: RwLock::new(SensorState {
                position: WVector::default(),
                orientation: Orientation::default(),
                speed: 0.0,
                initialized: false,
                eigenrays: None,
                eigenverbs: None,
            }),
            listeners: Mutex::new(Vec::new()),
            wavefront_task: Mutex::new(None),
        }
    }

    /// Identification used to find this sensor in the manager.
    pub fn key(&self) -> i32 {
        self.key
    }

    /// Human readable name for this sensor instance.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Source and/or receiver capability of this sensor.
    pub fn mode(&self) -> XmitRcvMode {
        self.mode
    }

    /// Replace the transmit beam patterns.
    pub fn set_src_beams(&mut self, beams: Vec<Arc<dyn BeamPattern>>) {
        self.src_beams = beams;
    }

    /// Replace the receive beam patterns.
    pub fn set_rcv_beams(&mut self, beams: Vec<Arc<dyn BeamPattern>>) {
        self.rcv_beams = beams;
    }

    /// Number of transmit beams.
    pub fn num_src_beams(&self) -> usize {
        self.src_beams.len()
    }

    /// Number of receive beams.
    pub fn num_rcv_beams(&self) -> usize {
        self.rcv_beams.len()
    }

    /// Transmit beam pattern `k`.
    pub fn src_beam(&self, k: usize) -> &Arc<dyn BeamPattern> {
        &self.src_beams[k]
    }

    /// Receive beam pattern `k`.
    pub fn rcv_beam(&self, k: usize) -> &Arc<dyn BeamPattern> {
        &self.rcv_beams[k]
    }

    /// Location of the sensor in world coordinates.
    pub fn position(&self) -> WVector {
        self.state.read().unwrap_or_else(|e| e.into_inner()).position
    }

    /// Orientation of the sensor in world coordinates.
    pub fn orientation(&self) -> Orientation {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .orientation
    }

    /// Platform speed (m/s), cached for envelope kinematics.
    pub fn speed(&self) -> f64 {
        self.state.read().unwrap_or_else(|e| e.into_inner()).speed
    }

    /// Latest eigenray collection computed for this sensor.
    pub fn eigenrays(&self) -> Option<EigenrayCollectionRef> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .eigenrays
            .clone()
    }

    /// Latest eigenverb collection computed for this sensor.
    pub fn eigenverbs(&self) -> Option<EigenverbCollectionRef> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .eigenverbs
            .clone()
    }

    /// Register a listener for wavefront updates. Listeners are held
    /// weakly; dropped pairs unregister themselves by going away.
    pub fn add_wavefront_listener(&self, listener: Weak<dyn WavefrontListener>) {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    /// Positions of all complements this sensor must ensonify, gathered
    /// from its listeners.
    pub fn wavefront_targets(&self) -> TargetList {
        let mut positions = Vec::new();
        let mut ids = Vec::new();
        let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        for listener in listeners.iter() {
            if let Some(listener) = listener.upgrade() {
                if let Some((id, position)) = listener.target_for(self.key) {
                    if !ids.contains(&id) {
                        ids.push(id);
                        positions.push(position);
                    }
                }
            }
        }
        TargetList::from_column(positions, ids)
    }

    /// Set the kinematic state directly, without triggering propagation.
    /// Used while assembling a scenario, before transmissions start.
    pub fn set_kinematics(&self, position: &WVector, orientation: &Orientation, speed: f64) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.position = *position;
        state.orientation = *orientation;
        state.speed = speed;
        state.initialized = true;
    }

    /// Checks whether new kinematics have moved far enough past the
    /// thresholds to require a new propagation run.
    pub fn check_thresholds(&self, position: &WVector, orientation: &Orientation) -> bool {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        if !state.initialized {
            return true;
        }
        if state.position.distance(position) > self.position_threshold {
            return true;
        }
        (state.orientation.yaw() - orientation.yaw()).abs() > self.orientation_threshold
            || (state.orientation.pitch() - orientation.pitch()).abs()
                > self.orientation_threshold
            || (state.orientation.roll() - orientation.roll()).abs()
                > self.orientation_threshold
    }

    /// Abort the in-flight propagation task for this sensor, if any,
    /// and return its handle so the caller can wait on it.
    pub(crate) fn abort_wavefront_task(&self) -> Option<TaskHandle> {
        let mut slot = self.wavefront_task.lock().unwrap_or_else(|e| e.into_inner());
        let previous = slot.take();
        if let Some(task) = previous.as_ref() {
            debug!("sensor {} aborting wavefront task #{}", self.key, task.id());
            task.abort();
        }
        previous
    }

    /// Remember the handle of the propagation task just launched.
    pub(crate) fn store_wavefront_task(&self, task: TaskHandle) {
        let mut slot = self.wavefront_task.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(task);
    }

    /// Asynchronous update of acoustics from the wavefront task. Stores
    /// the collections and passes them on to every listener.
    pub fn update_wavefront_data(
        &self,
        eigenrays: EigenrayCollectionRef,
        eigenverbs: Option<EigenverbCollectionRef>,
    ) {
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.eigenrays = Some(eigenrays.clone());
            state.eigenverbs = eigenverbs.clone();
        }
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for listener in listeners {
            if let Some(listener) = listener.upgrade() {
                listener.update_wavefront_data(self.key, eigenrays.clone(), eigenverbs.clone());
            }
        }
    }
}

/// Keyed store of the active sensors.
#[derive(Default)]
pub struct SensorManager {
    sensors: BTreeMap<i32, SensorRef>,
}

impl SensorManager {
    pub fn new() -> Self {
        SensorManager::default()
    }

    /// Adds a sensor. Fails when the key is already in use.
    pub fn add(&mut self, sensor: SensorRef) -> Result<(), ManagerError> {
        let key = sensor.key();
        if self.sensors.contains_key(&key) {
            return Err(ManagerError::KeyDuplicate(key.to_string()));
        }
        self.sensors.insert(key, sensor);
        Ok(())
    }

    /// Removes a sensor by key.
    pub fn remove(&mut self, key: i32) -> Result<SensorRef, ManagerError> {
        self.sensors
            .remove(&key)
            .ok_or_else(|| ManagerError::KeyMissing(key.to_string()))
    }

    /// Finds a sensor by key.
    pub fn find(&self, key: i32) -> Result<&SensorRef, ManagerError> {
        self.sensors
            .get(&key)
            .ok_or_else(|| ManagerError::KeyMissing(key.to_string()))
    }

    /// All sensors in key order.
    pub fn list(&self) -> impl Iterator<Item = &SensorRef> {
        self.sensors.values()
    }

    /// Number of managed sensors.
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    /// True when no sensors are managed.
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}
