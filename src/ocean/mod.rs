// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Unified access to the ocean environment.

The environment is split into capability interfaces: boundaries (surface
and bottom) provide height, reflection loss, and scattering; profiles
provide sound speed and in-water attenuation; optional volume layers
provide depth, thickness, and scattering. A complete [`Ocean`] aggregate
is shared between tasks as an immutable, reference-counted handle;
swapping environments means swapping the whole handle, so readers never
lock.
*/

use std::sync::Arc;

pub mod error;
pub use error::OceanError;

mod attenuation;
mod boundary;
mod profile;
mod reflect_loss;
mod scattering;
mod volume;

pub use attenuation::{Attenuation, AttenuationConstant, AttenuationThorp};
pub use boundary::{Boundary, BoundaryFlat, BoundaryGrid};
pub use profile::{
    flat_earth_correction, mackenzie, mackenzie_grid, Profile, ProfileCatenary, ProfileGrid,
    ProfileLinear, ProfileMunk, ProfileN2,
};
pub use reflect_loss::{ReflectLoss, ReflectLossConstant, ReflectLossRayleigh};
pub use scattering::{Scattering, ScatteringChapman, ScatteringConstant, ScatteringLambert};
pub use volume::{Volume, VolumeFlat};

#[cfg(test)]
mod test;

/// Shared read-only handle to a complete ocean. In-flight tasks keep
/// using the handle they captured even if a newer ocean is published.
pub type OceanRef = Arc<Ocean>;

/// A complete description of the ocean environment.
pub struct Ocean {
    surface: Arc<dyn Boundary>,
    bottom: Arc<dyn Boundary>,
    profile: Arc<dyn Profile>,
    volumes: Vec<Arc<dyn Volume>>,
}

impl Ocean {
    /// Assemble an ocean from its component models.
    pub fn new(
        surface: Arc<dyn Boundary>,
        bottom: Arc<dyn Boundary>,
        profile: Arc<dyn Profile>,
    ) -> Self {
        Ocean {
            surface,
            bottom,
            profile,
            volumes: Vec::new(),
        }
    }

    /// Append a volume scattering layer. Layer indices are assigned in
    /// insertion order and stay stable for the lifetime of this ocean,
    /// so eigenverb collections from different wavefront launches always
    /// line up.
    pub fn add_volume(&mut self, volume: Arc<dyn Volume>) {
        self.volumes.push(volume);
    }

    /// Model of the sea surface.
    pub fn surface(&self) -> &dyn Boundary {
        self.surface.as_ref()
    }

    /// Model of the ocean bottom.
    pub fn bottom(&self) -> &dyn Boundary {
        self.bottom.as_ref()
    }

    /// Model of the sound speed profile.
    pub fn profile(&self) -> &dyn Profile {
        self.profile.as_ref()
    }

    /// Volume scattering layer `index`.
    pub fn volume(&self, index: usize) -> &dyn Volume {
        self.volumes[index].as_ref()
    }

    /// Number of volume scattering layers.
    pub fn num_volumes(&self) -> usize {
        self.volumes.len()
    }

    /// Convenience constructor for an iso-velocity ocean with a flat
    /// surface and a flat bottom, commonly used as an analytic test case.
    ///
    /// # Arguments
    ///
    /// * `depth` - Bottom depth (meters, positive down).
    ///
    /// * `sound_speed` - Constant speed of sound (m/s).
    ///
    pub fn constant(depth: f64, sound_speed: f64) -> OceanRef {
        Arc::new(Ocean::new(
            Arc::new(BoundaryFlat::surface()),
            Arc::new(BoundaryFlat::bottom(depth)),
            Arc::new(ProfileLinear::constant(sound_speed)),
        ))
    }
}
