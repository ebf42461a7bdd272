// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Compute broadband transmission loss between a source and a target in an
iso-velocity ocean, and print the eigenray table.
*/

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use hydroray::spreading::SpreadingType;
use hydroray::wavefront::TargetList;
use hydroray::{Ocean, Seq, WVector, WaveQueue};

#[derive(Parser, Debug)]
#[command(name = "hydroray-proploss")]
#[command(about = "Transmission loss between two points in a simple ocean")]
struct Args {
    /// Source latitude (degrees)
    #[arg(long, default_value_t = 36.0)]
    lat: f64,

    /// Source longitude (degrees)
    #[arg(long, default_value_t = 16.0)]
    lng: f64,

    /// Source depth (meters, positive down)
    #[arg(long, default_value_t = 100.0)]
    depth: f64,

    /// Target range to the north (meters)
    #[arg(long, default_value_t = 5000.0)]
    range: f64,

    /// Target depth (meters, positive down)
    #[arg(long, default_value_t = 100.0)]
    target_depth: f64,

    /// Ocean bottom depth (meters)
    #[arg(long, default_value_t = 2000.0)]
    bottom: f64,

    /// Sound speed (m/s)
    #[arg(long, default_value_t = 1500.0)]
    sound_speed: f64,

    /// Frequency (Hz)
    #[arg(long, default_value_t = 1000.0)]
    frequency: f64,

    /// Maximum propagation time (seconds)
    #[arg(long, default_value_t = 10.0)]
    time_max: f64,
}

fn main() -> Result<()> {
    env_logger::try_init()?;
    let args = Args::parse();

    let ocean = Ocean::constant(args.bottom, args.sound_speed);
    let source = WVector::from_geodetic(args.lat, args.lng, -args.depth);
    let mut target = source.gc_position(args.range, 0.0);
    target.rho += args.depth - args.target_depth;
    let targets = TargetList::from_column(vec![target], vec![1]);

    let mut queue = WaveQueue::new(
        ocean,
        Arc::new(Seq::linear(args.frequency, 0.0, 1)?),
        source,
        Arc::new(Seq::linear(-80.0, 1.0, 161)?),
        Arc::new(Seq::linear(-20.0, 5.0, 9)?),
        0.05,
        targets,
        SpreadingType::HybridGaussian,
    );
    while queue.time() < args.time_max {
        queue.step();
    }
    let (rays, _, _) = queue.into_collections();

    println!("eigenrays from source to target at {} m:", args.range);
    println!("{:>10} {:>10} {:>4} {:>4} {:>8} {:>8}", "time", "loss", "srf", "btm", "launch", "arrive");
    for ray in rays.eigenrays(0, 0) {
        println!(
            "{:>10.4} {:>10.2} {:>4} {:>4} {:>8.2} {:>8.2}",
            ray.time,
            -10.0 * ray.intensity[0].max(1e-30).log10(),
            ray.surface,
            ray.bottom,
            ray.source_de.to_degrees(),
            ray.target_de.to_degrees(),
        );
    }
    let tl = rays.transmission_loss(0, 0, false);
    println!("total transmission loss: {:.2} dB", tl[0]);
    Ok(())
}
