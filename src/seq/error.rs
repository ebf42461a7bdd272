// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Errors associated with monotonic sequences.
*/

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeqError {
    #[error("Sequence values must be strictly monotonic")]
    NonMonotonic,
    #[error("Sequence must contain at least one element")]
    EmptySequence,
    #[error("Multi-element sequence has zero increment")]
    ZeroIncrement,
    #[error("Log sequence requires positive values and ratio")]
    NotLogarithmic,
    #[error("No sequence elements inside the clip interval")]
    EmptyClip,
}
