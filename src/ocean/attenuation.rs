// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
In-water sound attenuation models.
*/

use crate::geo::WVector;
use crate::seq::Seq;

/// Model of frequency-dependent absorption of sound by sea water.
pub trait Attenuation: Send + Sync {
    /// Computes the broadband absorption loss over a path.
    ///
    /// # Arguments
    ///
    /// * `location` - Location at which to compute attenuation.
    ///
    /// * `frequencies` - Frequencies over which to compute loss (Hz).
    ///
    /// * `distance` - Distance travelled through the water (meters).
    ///
    /// * `loss` - Absorption loss for each frequency (dB, output).
    ///
    fn attenuation(&self, location: &WVector, frequencies: &Seq, distance: f64, loss: &mut [f64]);
}

/// Constant attenuation coefficient, mostly used to switch absorption
/// off in analytic studies.
pub struct AttenuationConstant {
    /// Attenuation coefficient (dB per meter).
    coefficient: f64,
}

impl AttenuationConstant {
    pub fn new(coefficient: f64) -> Self {
        AttenuationConstant { coefficient }
    }
}

impl Attenuation for AttenuationConstant {
    fn attenuation(&self, _location: &WVector, _frequencies: &Seq, distance: f64, loss: &mut [f64]) {
        loss.fill(self.coefficient * distance);
    }
}

/// Thorp's expression for the frequency dependence of sea water
/// absorption, valid through the ray-theory band of interest.
///
/// Attenuation coefficient in dB/km as a function of frequency in kHz:
/// <pre>
///     a(f) = 0.0033 + 0.11 f^2/(1+f^2) + 44 f^2/(4100+f^2) + 3.0e-4 f^2
/// </pre>
#[derive(Default)]
pub struct AttenuationThorp;

impl Attenuation for AttenuationThorp {
    fn attenuation(&self, _location: &WVector, frequencies: &Seq, distance: f64, loss: &mut [f64]) {
        let km = distance * 1e-3;
        for (n, f) in frequencies.iter().enumerate() {
            let f2 = (f * 1e-3) * (f * 1e-3);
            let alpha = 0.0033
                + 0.11 * f2 / (1.0 + f2)
                + 44.0 * f2 / (4100.0 + f2)
                + 3.0e-4 * f2;
            loss[n] = alpha * km;
        }
    }
}
