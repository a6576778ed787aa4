//! Single-link queueing simulation application.
#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

use std::convert::TryFrom;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use eyre::WrapErr;
use structopt::StructOpt;

use linksim::{ArrivalConfig, SimulationConfig};

#[derive(Debug, strum::EnumString, strum::ToString)]
#[strum(serialize_all = "lowercase")]
enum Format {
    Text,
    Json,
}

/// Estimates steady-state metrics of a single-server FIFO link:
/// the average number of packets in the system, the average sojourn
/// time, and the distribution of the occupancy seen by arrivals.
#[derive(Debug, StructOpt)]
struct Opt {
    /// Simulation configuration file in JSON format. Mode-specific
    /// options below are not allowed together with this.
    #[structopt(long, conflicts_with_all(&["trace", "packets"]))]
    config: Option<PathBuf>,

    /// Replay this trace file (whitespace-delimited
    /// `inter_arrival_us size_bytes` rows) instead of generating
    /// arrivals.
    #[structopt(long, conflicts_with("packets"))]
    trace: Option<PathBuf>,

    /// Number of packet departures to simulate in synthetic mode.
    #[structopt(long, required_unless_one(&["trace", "config"]))]
    packets: Option<u64>,

    /// Arrival rate in packets per second (synthetic mode).
    #[structopt(long, required_unless_one(&["trace", "config"]))]
    arrival_rate: Option<f64>,

    /// Mean packet size in bytes (synthetic mode).
    #[structopt(long, default_value = "1250")]
    mean_packet_size: f64,

    /// Link rate in bits per second.
    #[structopt(long, default_value = "10e9")]
    link_rate: f64,

    /// Report P(0) through P(k) individually for this k; larger
    /// occupancies fall into the overflow bucket.
    #[structopt(long, default_value = "10")]
    bucket_limit: usize,

    /// Seed for the random number generator; synthetic runs with the
    /// same seed are identical.
    #[structopt(long)]
    seed: Option<u64>,

    /// Stop the run after this many wall-clock seconds and report the
    /// partial statistics.
    #[structopt(long)]
    max_seconds: Option<u64>,

    /// Report format.
    #[structopt(long, default_value = "text", possible_values = &["text", "json"])]
    format: Format,

    /// Verbosity (-v info, -vv debug with per-event log, -vvv trace).
    #[structopt(short, long, parse(from_occurrences))]
    verbose: i32,

    /// Store the logs in this file.
    #[structopt(long)]
    log_output: Option<PathBuf>,

    /// Do not log to the stderr.
    #[structopt(long)]
    no_stderr: bool,
}

impl TryFrom<&Opt> for SimulationConfig {
    type Error = eyre::Error;
    fn try_from(opt: &Opt) -> eyre::Result<Self> {
        if let Some(path) = &opt.config {
            let file = File::open(path)
                .wrap_err_with(|| format!("unable to open config file: {}", path.display()))?;
            return Self::from_json(file);
        }
        let arrivals = if let Some(path) = &opt.trace {
            ArrivalConfig::Trace { path: path.clone() }
        } else {
            ArrivalConfig::Synthetic {
                packets: opt
                    .packets
                    .ok_or_else(|| eyre::eyre!("--packets is required in synthetic mode"))?,
                arrival_rate: opt
                    .arrival_rate
                    .ok_or_else(|| eyre::eyre!("--arrival-rate is required in synthetic mode"))?,
                mean_packet_size: opt.mean_packet_size,
                seed: opt.seed,
            }
        };
        Ok(Self {
            arrivals,
            link_rate: opt.link_rate,
            bucket_limit: opt.bucket_limit,
        })
    }
}

/// Set up a logger based on the given user options.
fn set_up_logger(opt: &Opt) -> Result<(), fern::InitError> {
    let log_level = match opt.verbose {
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        3 => log::LevelFilter::Trace,
        _ => log::LevelFilter::Warn,
    };
    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("[{}] {}", record.level(), message)))
        .level(log_level);
    let dispatch = if let Some(path) = &opt.log_output {
        let _ = std::fs::remove_file(path);
        dispatch.chain(
            std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .append(false)
                .open(path)?,
        )
    } else {
        dispatch
    };
    let dispatch = if opt.no_stderr {
        dispatch
    } else {
        dispatch.chain(io::stderr())
    };
    dispatch.apply()?;
    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let opt = Opt::from_args();
    set_up_logger(&opt)?;

    let config = SimulationConfig::try_from(&opt)?;
    let mut simulator = config.build()?;
    if let Some(secs) = opt.max_seconds {
        simulator = simulator.with_max_wall_clock(Duration::from_secs(secs));
    }

    let started = Instant::now();
    let outcome = simulator.run();
    log::info!(
        "{} arrivals, {} departures, {} pending events; took {}",
        outcome.arrived,
        outcome.departed,
        outcome.pending_events,
        humantime::format_duration(started.elapsed()),
    );

    let summary = simulator.summary()?;
    match opt.format {
        Format::Text => println!("{}", summary),
        Format::Json => {
            serde_json::to_writer_pretty(io::stdout().lock(), &summary)?;
            println!();
        }
    }
    Ok(())
}
