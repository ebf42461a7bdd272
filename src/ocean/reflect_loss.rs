// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Interface reflection loss models.
*/

use crate::geo::WVector;
use crate::seq::Seq;

/// Model of the amplitude and phase change at an interface reflection.
pub trait ReflectLoss: Send + Sync {
    /// Computes the broadband reflection loss and phase change.
    ///
    /// # Arguments
    ///
    /// * `location` - Location at which to compute loss.
    ///
    /// * `frequencies` - Frequencies over which to compute loss (Hz).
    ///
    /// * `grazing` - Grazing angle relative to the interface (radians).
    ///
    /// * `amplitude` - Change in ray strength (dB, output).
    ///
    /// * `phase` - Change in ray phase (radians, output).
    ///
    fn reflect_loss(
        &self,
        location: &WVector,
        frequencies: &Seq,
        grazing: f64,
        amplitude: &mut [f64],
        phase: Option<&mut [f64]>,
    );
}

/// Reflection loss that is independent of grazing angle and frequency.
pub struct ReflectLossConstant {
    amplitude_db: f64,
    phase_rad: f64,
}

impl ReflectLossConstant {
    pub fn new(amplitude_db: f64) -> Self {
        ReflectLossConstant {
            amplitude_db,
            phase_rad: 0.0,
        }
    }

    pub fn with_phase(amplitude_db: f64, phase_rad: f64) -> Self {
        ReflectLossConstant {
            amplitude_db,
            phase_rad,
        }
    }
}

impl ReflectLoss for ReflectLossConstant {
    fn reflect_loss(
        &self,
        _location: &WVector,
        _frequencies: &Seq,
        _grazing: f64,
        amplitude: &mut [f64],
        phase: Option<&mut [f64]>,
    ) {
        amplitude.fill(self.amplitude_db);
        if let Some(phase) = phase {
            phase.fill(self.phase_rad);
        }
    }
}

/// Complex number support for the Rayleigh reflection coefficient.
#[derive(Clone, Copy)]
struct Cx {
    re: f64,
    im: f64,
}

impl Cx {
    fn new(re: f64, im: f64) -> Self {
        Cx { re, im }
    }

    fn mul(self, o: Cx) -> Cx {
        Cx::new(self.re * o.re - self.im * o.im, self.re * o.im + self.im * o.re)
    }

    fn div(self, o: Cx) -> Cx {
        let d = o.re * o.re + o.im * o.im;
        Cx::new(
            (self.re * o.re + self.im * o.im) / d,
            (self.im * o.re - self.re * o.im) / d,
        )
    }

    fn sqrt(self) -> Cx {
        let r = (self.re * self.re + self.im * self.im).sqrt();
        let arg = self.im.atan2(self.re) / 2.0;
        Cx::new(r.sqrt() * arg.cos(), r.sqrt() * arg.sin())
    }

    fn abs(self) -> f64 {
        (self.re * self.re + self.im * self.im).sqrt()
    }

    fn arg(self) -> f64 {
        self.im.atan2(self.re)
    }
}

/// Rayleigh reflection loss from the impedance mismatch between the
/// water column and a fluid sediment half-space. Sediment attenuation
/// enters as the imaginary part of the sediment sound speed.
pub struct ReflectLossRayleigh {
    /// Ratio of sediment density to water density.
    density_ratio: f64,
    /// Ratio of sediment compressional speed to water sound speed.
    speed_ratio: f64,
    /// Compressional attenuation (dB per wavelength).
    attenuation: f64,
}

impl ReflectLossRayleigh {
    pub fn new(density_ratio: f64, speed_ratio: f64, attenuation: f64) -> Self {
        ReflectLossRayleigh {
            density_ratio,
            speed_ratio,
            attenuation,
        }
    }

    /// Sand bottom parameters from standard geoacoustic tables.
    pub fn sand() -> Self {
        ReflectLossRayleigh::new(1.9, 1.1, 0.8)
    }
}

impl ReflectLoss for ReflectLossRayleigh {
    fn reflect_loss(
        &self,
        _location: &WVector,
        frequencies: &Seq,
        grazing: f64,
        amplitude: &mut [f64],
        phase: Option<&mut [f64]>,
    ) {
        // loss tangent converts dB/wavelength into an imaginary speed term
        let loss_tangent = self.attenuation * std::f64::consts::LN_10 / (40.0 * std::f64::consts::PI);
        let speed = Cx::new(self.speed_ratio, -self.speed_ratio * loss_tangent);
        let grazing = grazing.abs().max(1e-10);
        let cos_g = grazing.cos();
        let sin_g = grazing.sin();

        // Snell's law for the transmitted grazing angle, complex when
        // beyond the critical angle
        let cos_t = speed.mul(Cx::new(cos_g, 0.0));
        let cos_t2 = cos_t.mul(cos_t);
        let sin_t = Cx::new(1.0 - cos_t2.re, -cos_t2.im).sqrt();

        // normalized impedances Z = rho c / sin(grazing)
        let z1 = Cx::new(1.0 / sin_g, 0.0);
        let z2 = Cx::new(self.density_ratio, 0.0).mul(speed).div(sin_t);

        // R = (Z2 - Z1) / (Z2 + Z1)
        let num = Cx::new(z2.re - z1.re, z2.im - z1.im);
        let den = Cx::new(z2.re + z1.re, z2.im + z1.im);
        let r = num.div(den);

        let loss_db = -20.0 * r.abs().max(1e-30).log10();
        let phase_rad = r.arg();
        for n in 0..frequencies.size() {
            amplitude[n] = loss_db;
        }
        if let Some(phase) = phase {
            phase.fill(phase_rad);
        }
    }
}
