// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Interface scattering strength models for reverberation.
*/

use crate::geo::WVector;
use crate::seq::Seq;

/// Model of the scattering strength of an interface, used when an
/// incident eigenverb sheds energy toward a receiver.
pub trait Scattering: Send + Sync {
    /// Computes the broadband scattering strength for a single location.
    /// Implementations average the incident and scattered grazing angles
    /// to estimate the impact of bistatic geometries.
    ///
    /// # Arguments
    ///
    /// * `location` - Location at which to compute scattering.
    ///
    /// * `frequencies` - Frequencies over which to compute strength (Hz).
    ///
    /// * `de_incident` - Incident grazing angle (radians).
    ///
    /// * `de_scattered` - Scattered grazing angle (radians).
    ///
    /// * `az_incident` - Incident azimuthal angle (radians).
    ///
    /// * `az_scattered` - Scattered azimuthal angle (radians).
    ///
    /// * `amplitude` - Scattering strength ratio (linear, output).
    ///
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

/// Scattering strength that is independent of geometry and frequency.
pub struct ScatteringConstant {
    amplitude: f64,
}

impl ScatteringConstant {
    /// Scattering strength from a decibel level.
    pub fn new(strength_db: f64) -> Self {
        ScatteringConstant {
            amplitude: 10.0_f64.powf(strength_db / 10.0),
        }
    }
}

impl Scattering for ScatteringConstant {
    fn scattering(
        &self,
        _location: &WVector,
        _frequencies: &Seq,
        _de_incident: f64,
        _de_scattered: f64,
        _az_incident: f64,
        _az_scattered: f64,
        amplitude: &mut [f64],
    ) {
        amplitude.fill(self.amplitude);
    }
}

/// Chapman/Harris empirical fit to surface scattering strength
/// measurements:
/// <pre>
///     10 log10 S = 3.3 b log10(g/30) - 42.4 log10 b + 2.6
///              b = 158 (v f^1/3)^-0.58
/// </pre>
/// where g is the grazing angle in degrees, v is the wind speed in
/// knots, and f is the frequency in Hz. Only used for surface
/// reverberation.
pub struct ScatteringChapman {
    /// Wind speed used to develop rough seas (m/s).
    wind_speed: f64,
}

impl ScatteringChapman {
    pub fn new(wind_speed: f64) -> Self {
        ScatteringChapman { wind_speed }
    }
}

impl Scattering for ScatteringChapman {
    fn scattering(
        &self,
        _location: &WVector,
        frequencies: &Seq,
        de_incident: f64,
        de_scattered: f64,
        _az_incident: f64,
        _az_scattered: f64,
        amplitude: &mut [f64],
    ) {
        let grazing = (0.5 * (de_incident + de_scattered)).to_degrees().max(1e-10);
        let knots = self.wind_speed * 1.94384449;
        for (n, f) in frequencies.iter().enumerate() {
            let beta = 158.0 * (knots * f.cbrt()).powf(-0.58);
            let strength_db =
                2.6 - 42.4 * beta.log10() + 3.3 * beta * (grazing / 30.0).log10();
            amplitude[n] = 10.0_f64.powf(strength_db / 10.0);
        }
    }
}

/// Lambert's rule for diffuse bottom backscatter:
/// `S = mu sin(g_i) sin(g_s)` with a default of -27 dB for mu,
/// the value Mackenzie measured for deep water basins.
pub struct ScatteringLambert {
    /// Scattering coefficient mu (linear).
    coefficient: f64,
}

impl ScatteringLambert {
    pub fn new(coefficient_db: f64) -> Self {
        ScatteringLambert {
            coefficient: 10.0_f64.powf(coefficient_db / 10.0),
        }
    }
}

impl Default for ScatteringLambert {
    fn default() -> Self {
        ScatteringLambert::new(-27.0)
    }
}

impl Scattering for ScatteringLambert {
    fn scattering(
        &self,
        _location: &WVector,
        _frequencies: &Seq,
        de_incident: f64,
        de_scattered: f64,
        _az_incident: f64,
        _az_scattered: f64,
        amplitude: &mut [f64],
    ) {
        let s = self.coefficient * de_incident.sin().abs() * de_scattered.sin().abs();
        amplitude.fill(s);
    }
}
