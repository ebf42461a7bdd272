// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Errors associated with netCDF persistence.
*/

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetcdfError {
    /// An error from the underlying netCDF library.
    #[error("{0}")]
    Netcdf(#[from] netcdf::Error),

    #[error("Nothing to write: {0}")]
    EmptyCollection(&'static str),
}
