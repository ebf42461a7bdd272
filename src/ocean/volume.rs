// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Volume scattering layer models.
*/

use std::sync::Arc;

use crate::geo::{earth_radius, WVector};
use crate::seq::Seq;

use super::scattering::{Scattering, ScatteringConstant};

/// A layer in the water column that produces volume reverberation, such
/// as a deep scattering layer of biologics.
pub trait Volume: Send + Sync {
    /// Compute the depth of the layer and its thickness.
    ///
    /// # Arguments
    ///
    /// * `location` - Location at which to compute the layer.
    ///
    /// # Returns
    ///
    /// * Tuple of (rho, thickness): distance of the layer centre from the
    ///   earth's centre (meters), and the layer thickness (meters).
    ///
    fn depth(&self, location: &WVector) -> (f64, f64);

    /// Computes the broadband volume scattering strength.
    /// See [`Scattering::scattering`].
    #[allow(clippy::too_many_arguments)]
    fn scattering(
        &self,
        location: &WVector,
        frequencies: &Seq,
        de_incident: f64,
        de_scattered: f64,
        az_incident: f64,
        az_scattered: f64,
        amplitude: &mut [f64],
    );
}

/// Volume layer at a constant depth and thickness.
pub struct VolumeFlat {
    /// Depth of the layer centre (meters, positive down).
    depth: f64,
    /// Layer thickness (meters).
    thickness: f64,
    scatter: Arc<dyn Scattering>,
}

impl VolumeFlat {
    pub fn new(depth: f64, thickness: f64) -> Self {
        VolumeFlat {
            depth,
            thickness,
            scatter: Arc::new(ScatteringConstant::new(-50.0)),
        }
    }

    /// Replace the delegated scattering model.
    pub fn with_scattering(mut self, scatter: Arc<dyn Scattering>) -> Self {
        self.scatter = scatter;
        self
    }
}

impl Volume for VolumeFlat {
    fn depth(&self, location: &WVector) -> (f64, f64) {
        let rho = earth_radius(location.latitude()) - self.depth;
        (rho, self.thickness)
    }

    fn scattering(
        &self,
        location: &WVector,
        frequencies: &Seq,
        de_incident: f64,
        de_scattered: f64,
        az_incident: f64,
        az_scattered: f64,
        amplitude: &mut [f64],
    ) {
        self.scatter.scattering(
            location,
            frequencies,
            de_incident,
            de_scattered,
            az_incident,
            az_scattered,
            amplitude,
        );
    }
}
