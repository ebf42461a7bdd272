// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Structs and helper methods for Error handling

use thiserror::Error;

/// HydrorayError subtypes
#[derive(Error, Debug)]
pub enum HydrorayError {
    /// An error derived from `SeqError`.
    #[error("{0}")]
    Seq(#[from] crate::seq::error::SeqError),

    /// An error derived from `GridError`.
    #[error("{0}")]
    Grid(#[from] crate::grid::error::GridError),

    /// An error derived from `OceanError`.
    #[error("{0}")]
    Ocean(#[from] crate::ocean::error::OceanError),

    /// An error derived from `ManagerError`.
    #[error("{0}")]
    Manager(#[from] crate::sensors::error::ManagerError),

    /// An error from building a worker pool.
    #[error("{0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// An error derived from `NetcdfError`.
    #[cfg(feature = "netcdf")]
    #[error("{0}")]
    Netcdf(#[from] crate::ncwrite::error::NetcdfError),
}
