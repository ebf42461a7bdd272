// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Errors associated with keyed object managers.
*/

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("No entry found for key {0}")]
    KeyMissing(String),
    #[error("An entry already exists for key {0}")]
    KeyDuplicate(String),
}
