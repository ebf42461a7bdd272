// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Boundary models for the ocean's surface and bottom.
*/

use std::sync::Arc;

use crate::geo::{earth_radius, WVector};
use crate::grid::DataGrid;
use crate::seq::Seq;

use super::reflect_loss::{ReflectLoss, ReflectLossConstant};
use super::scattering::{Scattering, ScatteringConstant};

/// Environmental parameters of the ocean's surface or bottom: the height
/// of the interface, its reflection properties, and its scattering
/// strength. The unit normal is expressed in the local (rho, theta, phi)
/// directions relative to the query location.
pub trait Boundary: Send + Sync {
    /// Compute the height of the boundary and its surface normal.
    ///
    /// # Arguments
    ///
    /// * `location` - Location at which to compute the boundary.
    ///
    /// # Returns
    ///
    /// * Tuple of (rho, normal) where rho is the interface height in
    ///   spherical earth coordinates (meters from the earth's centre)
    ///   and normal is the unit normal at that point.
    ///
    fn height(&self, location: &WVector) -> (f64, WVector);

    /// Computes the broadband reflection loss and phase change at this
    /// boundary. See [`ReflectLoss::reflect_loss`].
    fn reflect_loss(
        &self,
        location: &WVector,
        frequencies: &Seq,
        grazing: f64,
        amplitude: &mut [f64],
        phase: Option<&mut [f64]>,
    );

    /// Computes the broadband scattering strength at this boundary.
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

/// Boundary at a constant depth below the mean sea surface, with
/// delegated reflection loss and scattering models.
pub struct BoundaryFlat {
    /// Height above the mean sea surface (meters, negative down).
    height: f64,
    reflect: Arc<dyn ReflectLoss>,
    scatter: Arc<dyn Scattering>,
}

impl BoundaryFlat {
    /// Flat boundary at a height above the mean sea surface.
    ///
    /// # Arguments
    ///
    /// * `height` - Height of the interface (meters, negative down).
    ///
    /// * `reflect` - Delegated reflection loss model.
    ///
    /// * `scatter` - Delegated scattering strength model.
    ///
    pub fn new(height: f64, reflect: Arc<dyn ReflectLoss>, scatter: Arc<dyn Scattering>) -> Self {
        BoundaryFlat {
            height,
            reflect,
            scatter,
        }
    }

    /// Perfectly reflecting sea surface at zero altitude.
    pub fn surface() -> Self {
        BoundaryFlat::new(
            0.0,
            Arc::new(ReflectLossConstant::new(0.0)),
            Arc::new(ScatteringConstant::new(-30.0)),
        )
    }

    /// Lossless flat bottom at the given depth.
    ///
    /// # Arguments
    ///
    /// * `depth` - Bottom depth (meters, positive down).
    ///
    pub fn bottom(depth: f64) -> Self {
        BoundaryFlat::new(
            -depth,
            Arc::new(ReflectLossConstant::new(0.0)),
            Arc::new(ScatteringConstant::new(-30.0)),
        )
    }

    /// Replace the delegated reflection loss model.
    pub fn with_reflect_loss(mut self, reflect: Arc<dyn ReflectLoss>) -> Self {
        self.reflect = reflect;
        self
    }

    /// Replace the delegated scattering model.
    pub fn with_scattering(mut self, scatter: Arc<dyn Scattering>) -> Self {
        self.scatter = scatter;
        self
    }
}

impl Boundary for BoundaryFlat {
    fn height(&self, location: &WVector) -> (f64, WVector) {
        let rho = earth_radius(location.latitude()) + self.height;
        (rho, WVector::new(1.0, 0.0, 0.0))
    }

    fn reflect_loss(
        &self,
        location: &WVector,
        frequencies: &Seq,
        grazing: f64,
        amplitude: &mut [f64],
        phase: Option<&mut [f64]>,
    ) {
        self.reflect
            .reflect_loss(location, frequencies, grazing, amplitude, phase);
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

/// Boundary defined by a 2-D grid of interface heights over colatitude
/// and longitude. The local surface normal is derived from the
/// interpolated height gradient:
/// <pre>
///     s_theta = (dh/dtheta) / rho
///     s_phi   = (dh/dphi) / (rho sin(theta))
///     n_theta = -s_theta / sqrt(1 + s_theta^2)
///     n_phi   = -s_phi / sqrt(1 + s_phi^2)
///     n_rho   = sqrt(1 - n_theta^2 - n_phi^2)
/// </pre>
pub struct BoundaryGrid {
    /// Interface height (rho, meters) over (colatitude, longitude).
    grid: DataGrid<2>,
    reflect: Arc<dyn ReflectLoss>,
    scatter: Arc<dyn Scattering>,
}

impl BoundaryGrid {
    pub fn new(grid: DataGrid<2>, reflect: Arc<dyn ReflectLoss>, scatter: Arc<dyn Scattering>) -> Self {
        BoundaryGrid {
            grid,
            reflect,
            scatter,
        }
    }
}

impl Boundary for BoundaryGrid {
    fn height(&self, location: &WVector) -> (f64, WVector) {
        let mut gradient = [0.0; 2];
        let rho = self
            .grid
            .interpolate_gradient(&[location.theta, location.phi], &mut gradient);
        let s_theta = gradient[0] / rho;
        let s_phi = gradient[1] / (rho * location.theta.sin());
        let n_theta = -s_theta / (1.0 + s_theta * s_theta).sqrt();
        let n_phi = -s_phi / (1.0 + s_phi * s_phi).sqrt();
        let n_rho = (1.0 - n_theta * n_theta - n_phi * n_phi).max(0.0).sqrt();
        (rho, WVector::new(n_rho, n_theta, n_phi))
    }

    fn reflect_loss(
        &self,
        location: &WVector,
        frequencies: &Seq,
        grazing: f64,
        amplitude: &mut [f64],
        phase: Option<&mut [f64]>,
    ) {
        self.reflect
            .reflect_loss(location, frequencies, grazing, amplitude, phase);
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
