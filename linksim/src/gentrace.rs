//! Generates a synthetic arrival trace for the trace-driven simulator:
//! whitespace-delimited `inter_arrival_us size_bytes` rows, one per
//! packet.

#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use eyre::WrapErr;
use rand_chacha::{rand_core::SeedableRng, ChaChaRng};
use rand_distr::{Distribution, Exp};
use structopt::StructOpt;

/// Generates input traces for the link simulation.
#[derive(Debug, StructOpt)]
struct Opt {
    /// Number of packets (rows) to generate.
    #[structopt(long)]
    packets: u64,

    /// Arrival rate in packets per second.
    #[structopt(long)]
    arrival_rate: f64,

    /// Mean packet size in bytes.
    #[structopt(long, default_value = "1250")]
    mean_packet_size: f64,

    /// Seed to use for the random number generator.
    #[structopt(short, long)]
    seed: Option<u64>,

    /// Write the trace to this file instead of the standard output.
    #[structopt(short, long)]
    output: Option<PathBuf>,
}

fn generate<W: Write>(opt: &Opt, mut writer: W) -> eyre::Result<()> {
    let gap_dist = Exp::new(opt.arrival_rate)
        .map_err(|err| eyre::eyre!("invalid arrival rate {}: {}", opt.arrival_rate, err))?;
    let size_dist = Exp::new(1.0 / opt.mean_packet_size)
        .map_err(|err| eyre::eyre!("invalid mean size {}: {}", opt.mean_packet_size, err))?;
    let mut rng = opt
        .seed
        .map_or_else(ChaChaRng::from_entropy, ChaChaRng::seed_from_u64);
    for _ in 0..opt.packets {
        let inter_arrival_us = gap_dist.sample(&mut rng) * 1e6;
        // The simulator rejects non-positive sizes, so keep the sampled
        // size away from a printed 0.000.
        let size_bytes = size_dist.sample(&mut rng).max(0.001);
        writeln!(writer, "{:.6} {:.3}", inter_arrival_us, size_bytes)?;
    }
    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let opt = Opt::from_args();
    eyre::ensure!(
        opt.mean_packet_size.is_finite() && opt.mean_packet_size > 0.0,
        "mean packet size must be a positive number of bytes"
    );
    if let Some(path) = &opt.output {
        let file = File::create(path)
            .wrap_err_with(|| format!("unable to create output file: {}", path.display()))?;
        generate(&opt, BufWriter::new(file))?;
    } else {
        generate(&opt, io::stdout().lock())?;
    }
    Ok(())
}
