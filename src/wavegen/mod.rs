// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Background propagation tasks.

When a sensor's motion exceeds its thresholds, a wavefront generator
task is launched to recompute its eigenrays and eigenverbs. The task
snapshots the shared ocean, the sensor position, and the target
positions at the moment of invocation so the calculation stays
consistent while the platform keeps moving. If a generator is already
running for the same sensor, it is aborted before the new task starts,
and an aborted task never publishes.
*/

use std::sync::Arc;

use log::{debug, info};

use crate::ocean::OceanRef;
use crate::seq::{Seq, SeqRef};
use crate::sensors::SensorModel;
use crate::spreading::SpreadingType;
use crate::tasks::{TaskHandle, WorkerPool};
use crate::wave_queue::WaveQueue;

#[cfg(test)]
mod test;

/// Shared context threaded through sensor updates: the environment, the
/// worker pool, and the reverberation time axis. Test harnesses build
/// their own context to own an independent world.
#[derive(Clone)]
pub struct WaveContext {
    /// The shared ocean at the time of the update.
    pub ocean: OceanRef,
    /// Worker pool that runs the generator tasks.
    pub pool: Arc<WorkerPool>,
    /// Two way travel time axis for reverberation envelopes (seconds).
    pub travel_times: SeqRef,
}

impl WaveContext {
    /// Context over the default reverberation time axis, 400 seconds at
    /// a 0.1 second sampling period.
    pub fn new(ocean: OceanRef, pool: Arc<WorkerPool>) -> Self {
        let travel_times =
            Arc::new(Seq::linear(0.0, 0.1, 4001).unwrap_or_else(|_| unreachable!()));
        WaveContext {
            ocean,
            pool,
            travel_times,
        }
    }

    /// Replace the reverberation time axis.
    pub fn with_travel_times(mut self, travel_times: SeqRef) -> Self {
        self.travel_times = travel_times;
        self
    }
}

/// Update the position and orientation of a sensor. When the motion
/// exceeds the sensor's thresholds (or `force_update` is set), any
/// in-flight propagation for this sensor is aborted and a new
/// background task starts.
///
/// # Arguments
///
/// * `sensor` - Sensor being moved.
///
/// * `position` - Updated position.
///
/// * `orientation` - Updated orientation.
///
/// * `force_update` - Skip the threshold check.
///
/// * `ctx` - Ocean and worker pool context for the new task.
///
/// # Returns
///
/// * Handle of the launched propagation task, or `None` when the update
///   stayed inside the thresholds.
///
pub fn update_sensor(
    sensor: &Arc<SensorModel>,
    position: &crate::geo::WVector,
    orientation: &crate::geo::Orientation,
    force_update: bool,
    ctx: &WaveContext,
) -> Option<TaskHandle> {
    if !force_update && !sensor.check_thresholds(position, orientation) {
        return None;
    }
    sensor.set_kinematics(position, orientation, sensor.speed());
    debug!("sensor {} update triggers propagation", sensor.key());
    Some(launch_wavefront_generator(sensor, ctx))
}

/// Launch a background propagation run for one sensor, aborting any
/// predecessor for the same sensor first. The task publishes through
/// `SensorModel::update_wavefront_data` unless it is aborted.
pub fn launch_wavefront_generator(sensor: &Arc<SensorModel>, ctx: &WaveContext) -> TaskHandle {
    sensor.abort_wavefront_task();

    // cache the state of the world at the time of invocation
    let ocean = ctx.ocean.clone();
    let source_position = sensor.position();
    let targets = sensor.wavefront_targets();
    let task_sensor = sensor.clone();

    let handle = ctx.pool.run(move |abort| {
        let sensor = task_sensor;
        let time_max = sensor.time_max;
        let mut queue = WaveQueue::new(
            ocean,
            sensor.frequencies.clone(),
            source_position,
            sensor.de_fan.clone(),
            sensor.az_fan.clone(),
            sensor.time_step,
            targets,
            SpreadingType::HybridGaussian,
        );
        if sensor.compute_reverb {
            queue.enable_eigenverbs();
        }
        while queue.time() < time_max {
            if abort.is_aborted() {
                info!("wavefront task for sensor {} aborted", sensor.key());
                return;
            }
            queue.step();
        }
        let (eigenrays, eigenverbs, _) = queue.into_collections();
        if abort.is_aborted() {
            info!("wavefront task for sensor {} aborted", sensor.key());
            return;
        }
        info!(
            "wavefront task for sensor {} done: {} eigenrays, {} eigenverbs",
            sensor.key(),
            eigenrays.len(),
            eigenverbs.as_ref().map_or(0, |v| v.len())
        );
        sensor.update_wavefront_data(Arc::new(eigenrays), eigenverbs.map(Arc::new));
    });
    sensor.store_wavefront_task(handle.clone());
    handle
}
