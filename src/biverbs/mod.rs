// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Bistatic eigenverbs: the Gaussian overlap of a source eigenverb and a
receiver eigenverb on the same interface.

For each receiver eigenverb, the generator queries the spatial index for
source eigenverbs inside a geographic halo, rejects combinations whose
peaks are too far apart in the receiver's tangent frame, and computes
the two dimensional Gaussian overlap of the projected footprints. The
result carries the combined power (including the interface scattering
strength), the two way travel time, and the duration that the overlap
smears a transmitted pulse over.
*/

use std::f64::consts::PI;
use std::sync::Arc;

use log::debug;

use crate::eigenverbs::{BoundingBox, Eigenverb, EigenverbCollection, InterfaceType};
use crate::ocean::Ocean;
use crate::seq::Seq;
use crate::tasks::AbortFlag;

#[cfg(test)]
mod test;

/// Maximum distance between the peaks of the source and receiver
/// eigenverbs, as a multiple of the receiver footprint dimensions.
pub const DISTANCE_THRESHOLD: f64 = 6.0;

/// Minimum power for a biverb contribution: linear equivalent of
/// -300 dB.
pub const INTENSITY_THRESHOLD: f64 = 1e-30;

/// Bistatic eigenverb produced by overlapping one source and one
/// receiver eigenverb.
#[derive(Clone, Debug)]
pub struct Biverb {
    /// Two way travel time, source to patch to receiver (seconds).
    pub time: f64,
    /// Duration that the overlap spreads a pulse over (seconds).
    pub duration: f64,
    /// Combined power, per frequency (linear).
    pub power: Vec<f64>,
    /// Source launch depression/elevation angle (radians).
    pub source_de: f64,
    /// Source launch azimuth (radians).
    pub source_az: f64,
    /// Index of the source launch DE in its fan.
    pub source_de_index: usize,
    /// Index of the source launch AZ in its fan.
    pub source_az_index: usize,
    /// Receiver launch depression/elevation angle (radians).
    pub receiver_de: f64,
    /// Receiver launch azimuth (radians).
    pub receiver_az: f64,
    /// Index of the receiver launch DE in its fan.
    pub receiver_de_index: usize,
    /// Index of the receiver launch AZ in its fan.
    pub receiver_az_index: usize,
}

/// Shared reference to an immutable biverb collection.
pub type BiverbCollectionRef = Arc<BiverbCollection>;

/// Bistatic eigenverbs for one source/receiver pair, per interface.
pub struct BiverbCollection {
    interfaces: Vec<Vec<Arc<Biverb>>>,
}

impl BiverbCollection {
    pub(crate) fn new(num_interfaces: usize) -> Self {
        BiverbCollection {
            interfaces: (0..num_interfaces).map(|_| Vec::new()).collect(),
        }
    }

    pub(crate) fn push(&mut self, interface: usize, biverb: Biverb) {
        self.interfaces[interface].push(Arc::new(biverb));
    }

    /// Number of interfaces covered by this collection.
    pub fn num_interfaces(&self) -> usize {
        self.interfaces.len()
    }

    /// Biverbs for one interface.
    pub fn biverbs(&self, interface: usize) -> &[Arc<Biverb>] {
        &self.interfaces[interface]
    }

    /// Total number of biverbs across all interfaces.
    pub fn len(&self) -> usize {
        self.interfaces.iter().map(|v| v.len()).sum()
    }

    /// True when the collection holds no biverbs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Overlap every receiver eigenverb with every source eigenverb inside
/// its distance gate. Returns `None` when the abort flag fires, in
/// which case nothing may be published.
///
/// # Arguments
///
/// * `ocean` - Environment supplying the interface scattering strength.
///
/// * `frequencies` - Frequencies of the eigenverb spectra (Hz).
///
/// * `src_verbs` - Interface collisions for the source wavefront.
///
/// * `rcv_verbs` - Interface collisions for the receiver wavefront.
///
/// * `pulse_length` - Duration of the transmit pulse (seconds).
///
/// * `abort` - Cooperative cancellation flag, checked per receiver verb.
///
pub fn generate_biverbs(
    ocean: &Ocean,
    frequencies: &Seq,
    src_verbs: &EigenverbCollection,
    rcv_verbs: &EigenverbCollection,
    pulse_length: f64,
    abort: &AbortFlag,
) -> Option<BiverbCollection> {
    let num_interfaces = src_verbs.num_interfaces().min(rcv_verbs.num_interfaces());
    let mut collection = BiverbCollection::new(num_interfaces);
    let mut scatter = vec![0.0; frequencies.size()];

    for interface in 0..num_interfaces {
        for rcv_verb in rcv_verbs.eigenverbs(interface) {
            if abort.is_aborted() {
                debug!("biverb generation aborted at interface {interface}");
                return None;
            }
            let halo = DISTANCE_THRESHOLD * rcv_verb.length.max(rcv_verb.width);
            let query = BoundingBox::from_centre(&rcv_verb.position, halo, halo);
            for src_verb in src_verbs.find_eigenverbs(interface, &query) {
                interface_scattering(
                    ocean,
                    interface,
                    frequencies,
                    rcv_verb,
                    &src_verb,
                    &mut scatter,
                );
                if let Some(biverb) =
                    compute_overlap(&src_verb, rcv_verb, &scatter, pulse_length)
                {
                    collection.interfaces[interface].push(Arc::new(biverb));
                }
            }
        }
    }
    Some(collection)
}

/// Scattering strength of the interface under the receiver verb, with
/// the incident geometry of the source verb.
fn interface_scattering(
    ocean: &Ocean,
    interface: usize,
    frequencies: &Seq,
    rcv_verb: &Eigenverb,
    src_verb: &Eigenverb,
    scatter: &mut [f64],
) {
    match InterfaceType::from_index(interface) {
        InterfaceType::Bottom => ocean.bottom().scattering(
            &rcv_verb.position,
            frequencies,
            src_verb.grazing,
            rcv_verb.grazing,
            src_verb.direction,
            rcv_verb.direction,
            scatter,
        ),
        InterfaceType::Surface => ocean.surface().scattering(
            &rcv_verb.position,
            frequencies,
            src_verb.grazing,
            rcv_verb.grazing,
            src_verb.direction,
            rcv_verb.direction,
            scatter,
        ),
        InterfaceType::VolumeUpper(k) | InterfaceType::VolumeLower(k) => {
            ocean.volume(k).scattering(
                &rcv_verb.position,
                frequencies,
                src_verb.grazing,
                rcv_verb.grazing,
                src_verb.direction,
                rcv_verb.direction,
                scatter,
            )
        }
    }
}

/// Compute the biverb that results from the overlap of two eigenverbs.
/// Returns `None` when the peaks are outside the distance gate or the
/// power stays below the intensity threshold on every frequency.
pub fn compute_overlap(
    src_verb: &Eigenverb,
    rcv_verb: &Eigenverb,
    scatter: &[f64],
    pulse_length: f64,
) -> Option<Biverb> {
    // location of the source peak in the receiver's tangent frame, with
    // the first axis along the receiver footprint's length
    let (range, bearing) = rcv_verb.position.gc_range(&src_verb.position);
    let relative = wrap_angle(bearing - rcv_verb.direction);
    let xs = range * relative.cos();
    let ys = range * relative.sin();
    if xs.abs() > DISTANCE_THRESHOLD * rcv_verb.length
        || ys.abs() > DISTANCE_THRESHOLD * rcv_verb.width
    {
        return None;
    }

    // relative tilt between the projected Gaussians
    let alpha = wrap_angle(src_verb.direction - rcv_verb.direction);
    let cos2a = (2.0 * alpha).cos();
    let sin2a = (2.0 * alpha).sin();

    let src_sum = src_verb.length2 + src_verb.width2;
    let src_diff = src_verb.length2 - src_verb.width2;
    let src_prod = src_verb.length2 * src_verb.width2;
    let rcv_sum = rcv_verb.length2 + rcv_verb.width2;
    let rcv_diff = rcv_verb.length2 - rcv_verb.width2;
    let rcv_prod = rcv_verb.length2 * rcv_verb.width2;

    // determinant of the combined covariance
    let det_sr = 0.5
        * (2.0 * (src_prod + rcv_prod) + src_sum * rcv_sum - src_diff * rcv_diff * cos2a);
    if det_sr <= 0.0 {
        return None;
    }

    // power of the exponential
    let kappa = -0.25
        * (xs * xs * (src_sum + src_diff * cos2a + 2.0 * rcv_verb.length2)
            + ys * ys * (src_sum - src_diff * cos2a + 2.0 * rcv_verb.width2)
            - 2.0 * xs * ys * src_diff * sin2a)
        / det_sr;
    let coupling = 2.0 * PI * kappa.exp() / det_sr.sqrt();

    let mut power = vec![0.0; scatter.len()];
    let mut strongest = 0.0_f64;
    for f in 0..scatter.len() {
        power[f] = coupling * src_verb.power[f] * rcv_verb.power[f] * scatter[f];
        strongest = strongest.max(power[f]);
    }
    if strongest < INTENSITY_THRESHOLD || !strongest.is_finite() {
        return None;
    }

    // duration of the overlap: the length-axis variance of the product
    // Gaussian, shrunk by the grazing geometry, widens the pulse
    let det_norm = det_sr / (src_prod * rcv_prod);
    let sigma2 = 0.5
        * ((1.0 / src_verb.width2 + 1.0 / src_verb.length2)
            + (1.0 / src_verb.width2 - 1.0 / src_verb.length2) * cos2a
            + 2.0 / rcv_verb.width2)
        / det_norm;
    let factor = rcv_verb.grazing.cos() / rcv_verb.sound_speed;
    let duration = 0.5 * (pulse_length * pulse_length + factor * factor * sigma2).sqrt();

    Some(Biverb {
        time: src_verb.time + rcv_verb.time,
        duration,
        power,
        source_de: src_verb.source_de,
        source_az: src_verb.source_az,
        source_de_index: src_verb.de_index,
        source_az_index: src_verb.az_index,
        receiver_de: rcv_verb.source_de,
        receiver_az: rcv_verb.source_az,
        receiver_de_index: rcv_verb.de_index,
        receiver_az_index: rcv_verb.az_index,
    })
}

/// Wrap an angle difference onto the minimum distance between angles.
fn wrap_angle(angle: f64) -> f64 {
    PI - ((angle.abs() % (2.0 * PI)) - PI).abs()
}
