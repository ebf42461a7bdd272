// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Errors associated with gridded data sets.
*/

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Grid data length {actual} does not match axes product {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    /// An error derived from `SeqError`.
    #[error("{0}")]
    Seq(#[from] crate::seq::error::SeqError),
}
