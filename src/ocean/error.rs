// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Errors associated with ocean environment models.
*/

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OceanError {
    #[error("Temperature and salinity grids have mismatched shapes")]
    MackenzieShapeMismatch,

    #[error("Invalid {parameter} for {model}: {value}")]
    InvalidParameter {
        model: &'static str,
        parameter: &'static str,
        value: f64,
    },

    /// An error derived from `GridError`.
    #[error("{0}")]
    Grid(#[from] crate::grid::error::GridError),

    /// An error derived from `SeqError`.
    #[error("{0}")]
    Seq(#[from] crate::seq::error::SeqError),
}
