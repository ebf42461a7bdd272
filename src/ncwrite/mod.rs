// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
netCDF persistence for the in-memory acoustic collections.

The engine keeps everything in linear units, radians, and meters;
this module converts to decibels and degrees on the way out, and stamps
every file with the COARDS convention. The core library never depends on
these writers: they live behind the `netcdf` cargo feature.
*/

use std::path::Path;

use crate::eigenrays::EigenrayCollection;
use crate::eigenverbs::EigenverbCollection;
use crate::envelopes::EnvelopeCollection;
use crate::wave_queue::WavefrontTrace;

pub mod error;
pub use error::NetcdfError;


/// Linear intensity ratio to decibels, clamped away from zero.
fn to_db(linear: f64) -> f64 {
    10.0 * linear.max(1e-30).log10()
}

/// Write a recorded wavefront history.
///
/// Dimensions are `travel_time` (unlimited), `source_de`, and
/// `source_az`; variables hold the geodetic track of every ray along
/// with its interface counters and ray family edge flags.
pub fn write_wavefront_trace(
    trace: &WavefrontTrace,
    path: &Path,
) -> Result<(), NetcdfError> {
    if trace.travel_times.is_empty() {
        return Err(NetcdfError::EmptyCollection("wavefront trace"));
    }
    let mut file = netcdf::create(path)?;
    file.add_attribute("long_name", "wavefront history")?;
    file.add_attribute("Conventions", "COARDS")?;

    let num_steps = trace.travel_times.len();
    let cells = trace.num_de() * trace.num_az();
    file.add_dimension("travel_time", num_steps)?;
    file.add_dimension("source_de", trace.num_de())?;
    file.add_dimension("source_az", trace.num_az())?;

    let mut var = file.add_variable::<f64>("travel_time", &["travel_time"])?;
    var.put_attribute("units", "seconds")?;
    var.put_values(&trace.travel_times, ..)?;

    let dims = ["travel_time", "source_de", "source_az"];
    let mut flat = Vec::with_capacity(num_steps * cells);

    for (name, units, frames) in [
        ("latitude", "degrees_north", &trace.latitude),
        ("longitude", "degrees_east", &trace.longitude),
        ("altitude", "meters", &trace.altitude),
    ] {
        flat.clear();
        for frame in frames {
            flat.extend_from_slice(frame);
        }
        let mut var = file.add_variable::<f64>(name, &dims)?;
        var.put_attribute("units", units)?;
        var.put_values(&flat, ..)?;
    }

    let mut counts = Vec::with_capacity(num_steps * cells);
    for (name, frames) in [
        ("surface", &trace.surface),
        ("bottom", &trace.bottom),
        ("caustic", &trace.caustic),
        ("upper", &trace.upper),
        ("lower", &trace.lower),
    ] {
        counts.clear();
        for frame in frames {
            counts.extend(frame.iter().map(|&c| c as i32));
        }
        let mut var = file.add_variable::<i32>(name, &dims)?;
        var.put_attribute("units", "count")?;
        var.put_values(&counts, ..)?;
    }

    counts.clear();
    for frame in &trace.on_edge {
        counts.extend(frame.iter().map(|&e| i32::from(e)));
    }
    let mut var = file.add_variable::<i32>("on_edge", &dims)?;
    var.put_attribute("units", "bool")?;
    var.put_values(&counts, ..)?;
    Ok(())
}

/// Write an eigenray collection as flattened per-ray arrays.
///
/// Angles are written in degrees with positive DE up and azimuths
/// clockwise from true north; intensity converts to positive-down dB.
pub fn write_eigenrays(
    collection: &EigenrayCollection,
    path: &Path,
) -> Result<(), NetcdfError> {
    let targets = collection.targets();
    let mut rays = Vec::new();
    let mut ray_target = Vec::new();
    for row in 0..targets.rows {
        for col in 0..targets.cols {
            for ray in collection.eigenrays(row, col) {
                rays.push(ray.clone());
                ray_target.push(targets.ids[row * targets.cols + col]);
            }
        }
    }
    if rays.is_empty() {
        return Err(NetcdfError::EmptyCollection("eigenrays"));
    }

    let mut file = netcdf::create(path)?;
    file.add_attribute("long_name", "eigenray collection")?;
    file.add_attribute("Conventions", "COARDS")?;

    let num_freq = collection.frequencies().size();
    file.add_dimension("eigenrays", rays.len())?;
    file.add_dimension("frequencies", num_freq)?;

    let mut var = file.add_variable::<f64>("frequencies", &["frequencies"])?;
    var.put_attribute("units", "hertz")?;
    var.put_values(collection.frequencies().as_slice(), ..)?;

    let mut var = file.add_variable::<i32>("target_id", &["eigenrays"])?;
    var.put_values(&ray_target, ..)?;

    let mut var = file.add_variable::<f64>("travel_time", &["eigenrays"])?;
    var.put_attribute("units", "seconds")?;
    let times: Vec<f64> = rays.iter().map(|r| r.time).collect();
    var.put_values(&times, ..)?;

    for (name, values) in [
        (
            "source_de",
            rays.iter().map(|r| r.source_de.to_degrees()).collect::<Vec<f64>>(),
        ),
        (
            "source_az",
            rays.iter().map(|r| r.source_az.to_degrees()).collect(),
        ),
        (
            "target_de",
            rays.iter().map(|r| r.target_de.to_degrees()).collect(),
        ),
        (
            "target_az",
            rays.iter().map(|r| r.target_az.to_degrees()).collect(),
        ),
    ] {
        let mut var = file.add_variable::<f64>(name, &["eigenrays"])?;
        var.put_attribute("units", "degrees")?;
        var.put_attribute("positive", if name.ends_with("de") { "up" } else { "true" })?;
        var.put_values(&values, ..)?;
    }

    let mut intensity = Vec::with_capacity(rays.len() * num_freq);
    let mut phase = Vec::with_capacity(rays.len() * num_freq);
    for ray in &rays {
        intensity.extend(ray.intensity.iter().map(|&i| -to_db(i)));
        phase.extend(ray.phase.iter().copied());
    }
    let mut var = file.add_variable::<f64>("intensity", &["eigenrays", "frequencies"])?;
    var.put_attribute("units", "dB")?;
    var.put_values(&intensity, ..)?;
    let mut var = file.add_variable::<f64>("phase", &["eigenrays", "frequencies"])?;
    var.put_attribute("units", "radians")?;
    var.put_values(&phase, ..)?;

    for (name, values) in [
        ("surface", rays.iter().map(|r| r.surface as i32).collect::<Vec<i32>>()),
        ("bottom", rays.iter().map(|r| r.bottom as i32).collect()),
        ("caustic", rays.iter().map(|r| r.caustic as i32).collect()),
    ] {
        let mut var = file.add_variable::<i32>(name, &["eigenrays"])?;
        var.put_attribute("units", "count")?;
        var.put_values(&values, ..)?;
    }
    Ok(())
}

/// Write an eigenverb collection, one file section per interface using
/// an `interface` coordinate variable.
pub fn write_eigenverbs(
    collection: &EigenverbCollection,
    path: &Path,
) -> Result<(), NetcdfError> {
    if collection.is_empty() {
        return Err(NetcdfError::EmptyCollection("eigenverbs"));
    }
    let mut verbs = Vec::new();
    let mut verb_interface = Vec::new();
    for interface in 0..collection.num_interfaces() {
        for verb in collection.eigenverbs(interface) {
            verbs.push(verb.clone());
            verb_interface.push(interface as i32);
        }
    }
    let num_freq = verbs[0].power.len();

    let mut file = netcdf::create(path)?;
    file.add_attribute("long_name", "eigenverb collection")?;
    file.add_attribute("Conventions", "COARDS")?;
    file.add_dimension("eigenverbs", verbs.len())?;
    file.add_dimension("frequencies", num_freq)?;

    let mut var = file.add_variable::<i32>("interface", &["eigenverbs"])?;
    var.put_values(&verb_interface, ..)?;

    for (name, units, values) in [
        (
            "travel_time",
            "seconds",
            verbs.iter().map(|v| v.time).collect::<Vec<f64>>(),
        ),
        ("length", "meters", verbs.iter().map(|v| v.length).collect()),
        ("width", "meters", verbs.iter().map(|v| v.width).collect()),
        (
            "latitude",
            "degrees_north",
            verbs.iter().map(|v| v.position.latitude()).collect(),
        ),
        (
            "longitude",
            "degrees_east",
            verbs.iter().map(|v| v.position.longitude()).collect(),
        ),
        (
            "altitude",
            "meters",
            verbs.iter().map(|v| v.position.altitude()).collect(),
        ),
        (
            "direction",
            "degrees_true",
            verbs.iter().map(|v| v.direction.to_degrees()).collect(),
        ),
        (
            "grazing",
            "degrees",
            verbs.iter().map(|v| v.grazing.to_degrees()).collect(),
        ),
        (
            "sound_speed",
            "m/s",
            verbs.iter().map(|v| v.sound_speed).collect(),
        ),
        (
            "source_de",
            "degrees",
            verbs.iter().map(|v| v.source_de.to_degrees()).collect(),
        ),
        (
            "source_az",
            "degrees_true",
            verbs.iter().map(|v| v.source_az.to_degrees()).collect(),
        ),
    ] {
        let mut var = file.add_variable::<f64>(name, &["eigenverbs"])?;
        var.put_attribute("units", units)?;
        var.put_values(&values, ..)?;
    }

    let mut power = Vec::with_capacity(verbs.len() * num_freq);
    for verb in &verbs {
        power.extend(verb.power.iter().map(|&p| to_db(p)));
    }
    let mut var = file.add_variable::<f64>("power", &["eigenverbs", "frequencies"])?;
    var.put_attribute("units", "dB")?;
    var.put_values(&power, ..)?;

    for (name, values) in [
        (
            "de_index",
            verbs.iter().map(|v| v.de_index as i32).collect::<Vec<i32>>(),
        ),
        ("az_index", verbs.iter().map(|v| v.az_index as i32).collect()),
        ("surface", verbs.iter().map(|v| v.surface as i32).collect()),
        ("bottom", verbs.iter().map(|v| v.bottom as i32).collect()),
        ("caustic", verbs.iter().map(|v| v.caustic as i32).collect()),
        ("upper", verbs.iter().map(|v| v.upper as i32).collect()),
        ("lower", verbs.iter().map(|v| v.lower as i32).collect()),
    ] {
        let mut var = file.add_variable::<i32>(name, &["eigenverbs"])?;
        var.put_values(&values, ..)?;
    }
    Ok(())
}

/// Write a reverberation envelope collection as a 4-D intensity block
/// over (source beam, receiver beam, frequency, travel time), in dB.
pub fn write_envelopes(
    collection: &EnvelopeCollection,
    path: &Path,
) -> Result<(), NetcdfError> {
    let mut file = netcdf::create(path)?;
    file.add_attribute("long_name", "reverberation envelopes")?;
    file.add_attribute("Conventions", "COARDS")?;

    let num_src = collection.num_src_beams();
    let num_rcv = collection.num_rcv_beams();
    let num_freq = collection.frequencies().size();
    let num_time = collection.travel_times().size();
    file.add_dimension("src_beam", num_src)?;
    file.add_dimension("rcv_beam", num_rcv)?;
    file.add_dimension("frequencies", num_freq)?;
    file.add_dimension("travel_time", num_time)?;

    let mut var = file.add_variable::<f64>("frequencies", &["frequencies"])?;
    var.put_attribute("units", "hertz")?;
    var.put_values(collection.frequencies().as_slice(), ..)?;
    let mut var = file.add_variable::<f64>("travel_time", &["travel_time"])?;
    var.put_attribute("units", "seconds")?;
    var.put_values(collection.travel_times().as_slice(), ..)?;

    let mut intensity = Vec::with_capacity(num_src * num_rcv * num_freq * num_time);
    for s in 0..num_src {
        for r in 0..num_rcv {
            intensity.extend(collection.envelope(s, r).iter().map(|&i| to_db(i)));
        }
    }
    let mut var = file.add_variable::<f64>(
        "intensity",
        &["src_beam", "rcv_beam", "frequencies", "travel_time"],
    )?;
    var.put_attribute("units", "dB")?;
    var.put_values(&intensity, ..)?;
    Ok(())
}
