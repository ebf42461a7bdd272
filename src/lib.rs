// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
`hydroray` models underwater acoustic propagation, transmission loss,
and bistatic reverberation with Gaussian-beam ray tracing over geodetic
spherical coordinates.

The wavefront propagator marches a fan of rays through a shared ocean
environment, extracting eigenrays (discrete transmission loss paths) and
eigenverbs (Gaussian interface projections) as it goes. Bistatic pairs
combine the eigenverbs of a source and a receiver into biverbs and
accumulate them into reverberation envelope time series. Everything
downstream of a sensor update runs on a background worker pool.
*/

#[macro_use]
extern crate lazy_static;

pub mod biverbs;
pub mod eigenrays;
pub mod eigenverbs;
pub mod envelopes;
pub mod error;
pub mod geo;
pub mod grid;
#[cfg(feature = "netcdf")]
pub mod ncwrite;
pub mod ocean;
pub mod ode;
pub mod pairs;
pub mod reflection;
pub mod seq;
pub mod sensors;
pub mod spreading;
pub mod tasks;
pub mod wave_queue;
pub mod wavefront;
pub mod wavegen;

// Re-exports.
pub use biverbs::{Biverb, BiverbCollection, BiverbCollectionRef};
pub use eigenrays::{Eigenray, EigenrayCollection, EigenrayCollectionRef};
pub use eigenverbs::{Eigenverb, EigenverbCollection, EigenverbCollectionRef, InterfaceType};
pub use envelopes::{EnvelopeCollection, EnvelopeCollectionRef};
pub use error::HydrorayError;
pub use geo::{Orientation, WVector};
pub use grid::{DataGrid, InterpKind};
pub use ocean::{Ocean, OceanRef};
pub use pairs::{BistaticPair, PairManager, PairStage};
pub use seq::{Seq, SeqRef};
pub use sensors::{SensorManager, SensorModel, XmitRcvMode};
pub use spreading::SpreadingType;
pub use tasks::WorkerPool;
pub use wave_queue::WaveQueue;
pub use wavefront::{TargetList, WaveFront};
pub use wavegen::WaveContext;
