// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Sound speed profile models.

Analytic profiles (constant, linear, bi-linear, Munk, N-squared linear,
catenary) are commonly used to validate the propagation model against
published test cases. Gridded profiles support measured data, including
sound speed derived from temperature and salinity with the Mackenzie
nine-term equation.
*/

use std::sync::Arc;

use crate::geo::{earth_radius, WVector};
use crate::grid::{DataGrid, InterpKind};
use crate::seq::Seq;

use super::attenuation::{Attenuation, AttenuationThorp};
use super::error::OceanError;

/// Model of the ocean's sound speed and its gradient, plus the in-water
/// absorption along a path. The gradient is expressed in the local
/// tangent frame (m/s per meter) in the (rho, theta, phi) directions.
pub trait Profile: Send + Sync {
    /// Compute the speed of sound and its first derivatives at a location.
    ///
    /// # Arguments
    ///
    /// * `location` - Location at which to compute sound speed.
    ///
    /// # Returns
    ///
    /// * Tuple of (speed, gradient): speed of sound (m/s) and its local
    ///   tangent-frame gradient (m/s per meter).
    ///
    fn sound_speed(&self, location: &WVector) -> (f64, WVector);

    /// Computes the broadband absorption loss over a path.
    /// See [`Attenuation::attenuation`].
    fn attenuation(&self, location: &WVector, frequencies: &Seq, distance: f64, loss: &mut [f64]);
}

/// Scale the speed and gradient by rho/R so that propagation over a
/// spherical earth can be validated against rectangular coordinate
/// references.
pub fn flat_earth_correction(location: &WVector, speed: f64, gradient: &WVector) -> (f64, WVector) {
    let earth = earth_radius(location.latitude());
    let scale = location.rho / earth;
    let speed_out = speed * scale;
    let gradient_out = WVector::new(
        gradient.rho * scale + speed / earth,
        gradient.theta * scale,
        gradient.phi * scale,
    );
    (speed_out, gradient_out)
}

/// Depth below the mean sea surface (meters, positive down).
fn depth_of(location: &WVector) -> f64 {
    -location.altitude()
}

/// Analytic model for a bi-linear, linear, or constant profile:
/// <pre>
///     c(z) = c0 + g0 z                    for z <  z1
///     c(z) = c0 + g0 z1 + g1 (z - z1)     for z >= z1
/// </pre>
/// where z is the depth below the ocean surface, positive down.
pub struct ProfileLinear {
    soundspeed0: f64,
    gradient0: f64,
    depth1: f64,
    gradient1: f64,
    attenuation: Arc<dyn Attenuation>,
    flat_earth: bool,
}

impl ProfileLinear {
    /// Bi-linear version of the profile.
    ///
    /// # Arguments
    ///
    /// * `c0` - Speed of sound at the surface of the water (m/s).
    ///
    /// * `g0` - Sound speed gradient above `z1` (1/s).
    ///
    /// * `z1` - Depth at which the profile changes gradients (meters).
    ///
    /// * `g1` - Sound speed gradient below `z1` (1/s).
    ///
    pub fn bilinear(c0: f64, g0: f64, z1: f64, g1: f64) -> Self {
        ProfileLinear {
            soundspeed0: c0,
            gradient0: g0,
            depth1: z1,
            gradient1: g1,
            attenuation: Arc::new(AttenuationThorp),
            flat_earth: false,
        }
    }

    /// Linear version of the profile.
    pub fn linear(c0: f64, g0: f64) -> Self {
        ProfileLinear::bilinear(c0, g0, 0.0, g0)
    }

    /// Constant speed version of the profile.
    pub fn constant(c0: f64) -> Self {
        ProfileLinear::bilinear(c0, 0.0, 0.0, 0.0)
    }

    /// Replace the delegated attenuation model.
    pub fn with_attenuation(mut self, attenuation: Arc<dyn Attenuation>) -> Self {
        self.attenuation = attenuation;
        self
    }

    /// Enable the flat-earth correction.
    pub fn with_flat_earth(mut self) -> Self {
        self.flat_earth = true;
        self
    }
}

impl Profile for ProfileLinear {
    fn sound_speed(&self, location: &WVector) -> (f64, WVector) {
        let z = depth_of(location);
        let (c, dcdz) = if z < self.depth1 {
            (self.soundspeed0 + self.gradient0 * z, self.gradient0)
        } else {
            (
                self.soundspeed0 + self.gradient0 * self.depth1 + self.gradient1 * (z - self.depth1),
                self.gradient1,
            )
        };
        // depth increases downward, rho increases upward
        let gradient = WVector::new(-dcdz, 0.0, 0.0);
        if self.flat_earth {
            flat_earth_correction(location, c, &gradient)
        } else {
            (c, gradient)
        }
    }

    fn attenuation(&self, location: &WVector, frequencies: &Seq, distance: f64, loss: &mut [f64]) {
        self.attenuation
            .attenuation(location, frequencies, distance, loss);
    }
}

/// Munk's idealized deep sound channel profile (Munk 1974):
/// <pre>
///     c(z) = c1 ( 1 + e (n + exp(-n) - 1) ),    n = 2 (z - z1) / B
/// </pre>
pub struct ProfileMunk {
    axis_depth: f64,
    scale: f64,
    axis_speed: f64,
    epsilon: f64,
    attenuation: Arc<dyn Attenuation>,
    flat_earth: bool,
}

impl ProfileMunk {
    pub fn new(axis_depth: f64, scale: f64, axis_speed: f64, epsilon: f64) -> Self {
        ProfileMunk {
            axis_depth,
            scale,
            axis_speed,
            epsilon,
            attenuation: Arc::new(AttenuationThorp),
            flat_earth: false,
        }
    }

    /// Enable the flat-earth correction.
    pub fn with_flat_earth(mut self) -> Self {
        self.flat_earth = true;
        self
    }
}

impl Default for ProfileMunk {
    /// Canonical parameters from the 1974 paper.
    fn default() -> Self {
        ProfileMunk::new(1300.0, 1300.0, 1500.0, 7.37e-3)
    }
}

impl Profile for ProfileMunk {
    fn sound_speed(&self, location: &WVector) -> (f64, WVector) {
        let z = depth_of(location);
        let n = 2.0 * (z - self.axis_depth) / self.scale;
        let c = self.axis_speed * (1.0 + self.epsilon * (n + (-n).exp() - 1.0));
        let dcdz = self.axis_speed * self.epsilon * (1.0 - (-n).exp()) * 2.0 / self.scale;
        let gradient = WVector::new(-dcdz, 0.0, 0.0);
        if self.flat_earth {
            flat_earth_correction(location, c, &gradient)
        } else {
            (c, gradient)
        }
    }

    fn attenuation(&self, location: &WVector, frequencies: &Seq, distance: f64, loss: &mut [f64]) {
        self.attenuation
            .attenuation(location, frequencies, distance, loss);
    }
}

/// N-squared linear profile: linear variation of the square of the
/// index of refraction,
/// <pre>
///     c(z) = c0 / sqrt(1 + 2 g0 z / c0)
/// </pre>
pub struct ProfileN2 {
    soundspeed0: f64,
    gradient0: f64,
    attenuation: Arc<dyn Attenuation>,
    flat_earth: bool,
}

impl ProfileN2 {
    pub fn new(c0: f64, g0: f64) -> Self {
        ProfileN2 {
            soundspeed0: c0,
            gradient0: g0,
            attenuation: Arc::new(AttenuationThorp),
            flat_earth: false,
        }
    }

    /// Enable the flat-earth correction.
    pub fn with_flat_earth(mut self) -> Self {
        self.flat_earth = true;
        self
    }
}

impl Profile for ProfileN2 {
    fn sound_speed(&self, location: &WVector) -> (f64, WVector) {
        let z = depth_of(location);
        let w = 1.0 + 2.0 * self.gradient0 * z / self.soundspeed0;
        let c = self.soundspeed0 / w.sqrt();
        let dcdz = -self.gradient0 / w.powf(1.5);
        let gradient = WVector::new(-dcdz, 0.0, 0.0);
        if self.flat_earth {
            flat_earth_correction(location, c, &gradient)
        } else {
            (c, gradient)
        }
    }

    fn attenuation(&self, location: &WVector, frequencies: &Seq, distance: f64, loss: &mut [f64]) {
        self.attenuation
            .attenuation(location, frequencies, distance, loss);
    }
}

/// Catenary profile with a sound channel axis at depth z1:
/// <pre>
///     c(z) = c1 cosh( (z - z1) / (c1 / g1) )
/// </pre>
pub struct ProfileCatenary {
    axis_speed: f64,
    gradient: f64,
    axis_depth: f64,
    attenuation: Arc<dyn Attenuation>,
    flat_earth: bool,
}

impl ProfileCatenary {
    pub fn new(c1: f64, g1: f64, z1: f64) -> Self {
        ProfileCatenary {
            axis_speed: c1,
            gradient: g1,
            axis_depth: z1,
            attenuation: Arc::new(AttenuationThorp),
            flat_earth: false,
        }
    }

    /// Enable the flat-earth correction.
    pub fn with_flat_earth(mut self) -> Self {
        self.flat_earth = true;
        self
    }
}

impl Profile for ProfileCatenary {
    fn sound_speed(&self, location: &WVector) -> (f64, WVector) {
        let z = depth_of(location);
        let scale = self.axis_speed / self.gradient;
        let arg = (z - self.axis_depth) / scale;
        let c = self.axis_speed * arg.cosh();
        let dcdz = self.gradient * arg.sinh();
        let gradient = WVector::new(-dcdz, 0.0, 0.0);
        if self.flat_earth {
            flat_earth_correction(location, c, &gradient)
        } else {
            (c, gradient)
        }
    }

    fn attenuation(&self, location: &WVector, frequencies: &Seq, distance: f64, loss: &mut [f64]) {
        self.attenuation
            .attenuation(location, frequencies, distance, loss);
    }
}

/// Gridded sound speed profile over (rho), (rho, theta), or
/// (rho, theta, phi) axes, with rho in meters from the earth's centre.
pub struct ProfileGrid<const N: usize> {
    grid: DataGrid<N>,
    attenuation: Arc<dyn Attenuation>,
    flat_earth: bool,
}

impl<const N: usize> ProfileGrid<N> {
    pub fn new(grid: DataGrid<N>) -> Self {
        ProfileGrid {
            grid,
            attenuation: Arc::new(AttenuationThorp),
            flat_earth: false,
        }
    }

    /// Replace the delegated attenuation model.
    pub fn with_attenuation(mut self, attenuation: Arc<dyn Attenuation>) -> Self {
        self.attenuation = attenuation;
        self
    }

    /// Enable the flat-earth correction.
    pub fn with_flat_earth(mut self) -> Self {
        self.flat_earth = true;
        self
    }
}

impl<const N: usize> Profile for ProfileGrid<N> {
    fn sound_speed(&self, location: &WVector) -> (f64, WVector) {
        let mut coords = [0.0; N];
        coords[0] = location.rho;
        if N > 1 {
            coords[1] = location.theta;
        }
        if N > 2 {
            coords[2] = location.phi;
        }
        let mut raw = [0.0; N];
        let c = self.grid.interpolate_gradient(&coords, &mut raw);
        // convert raw axis derivatives into the local tangent frame
        let mut gradient = WVector::new(raw[0], 0.0, 0.0);
        if N > 1 {
            gradient.theta = raw[1] / location.rho;
        }
        if N > 2 {
            gradient.phi = raw[2] / (location.rho * location.theta.sin());
        }
        if self.flat_earth {
            flat_earth_correction(location, c, &gradient)
        } else {
            (c, gradient)
        }
    }

    fn attenuation(&self, location: &WVector, frequencies: &Seq, distance: f64, loss: &mut [f64]) {
        self.attenuation
            .attenuation(location, frequencies, distance, loss);
    }
}

/// Mackenzie nine-term equation for the speed of sound as a function of
/// depth, salinity, and temperature:
/// <pre>
///     c(D,S,T) = 1448.96 + 4.591 T - 5.304e-2 T^2 + 2.374e-4 T^3
///              + (1.340 - 1.025e-2 T)(S - 35)
///              + 1.630e-2 D + 1.675e-7 D^2 - 7.139e-13 T D^3
/// </pre>
/// where D is depth in meters, S is salinity in ppt, and T is
/// temperature in degrees C.
pub fn mackenzie(temperature: f64, salinity: f64, depth: f64) -> f64 {
    1448.96 + 4.591 * temperature - 5.304e-2 * temperature * temperature
        + 2.374e-4 * temperature * temperature * temperature
        + (1.340 - 1.025e-2 * temperature) * (salinity - 35.0)
        + 1.630e-2 * depth
        + 1.675e-7 * depth * depth
        - 7.139e-13 * temperature * depth * depth * depth
}

/// Build a sound speed grid from temperature and salinity grids using
/// the Mackenzie equation. Both inputs share (rho, theta, phi) axes.
/// The result uses PCHIP interpolation in the depth direction to reduce
/// sudden changes in profile slope; latitude and longitude stay linear.
pub fn mackenzie_grid(
    temperature: &DataGrid<3>,
    salinity: &DataGrid<3>,
) -> Result<DataGrid<3>, OceanError> {
    for dim in 0..3 {
        if temperature.axis(dim).size() != salinity.axis(dim).size() {
            return Err(OceanError::MackenzieShapeMismatch);
        }
    }
    let axes = [
        temperature.axis(0).clone(),
        temperature.axis(1).clone(),
        temperature.axis(2).clone(),
    ];
    let mut speed = DataGrid::zeroed(axes);
    speed.set_interp(0, InterpKind::Pchip);
    speed.set_interp(1, InterpKind::Linear);
    speed.set_interp(2, InterpKind::Linear);
    for i in 0..temperature.axis(0).size() {
        for j in 0..temperature.axis(1).size() {
            for k in 0..temperature.axis(2).size() {
                let index = [i, j, k];
                let latitude = crate::geo::to_latitude(temperature.axis(1).value(j));
                let depth = earth_radius(latitude) - temperature.axis(0).value(i);
                let t = temperature.data(&index);
                let s = salinity.data(&index);
                speed.set_data(&index, mackenzie(t, s, depth));
            }
        }
    }
    Ok(speed)
}
