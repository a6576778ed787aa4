//! Configuration for a single simulation run.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use eyre::WrapErr;
use rand_chacha::{rand_core::SeedableRng, ChaChaRng};
use serde::Deserialize;

use crate::{read_trace, Link, RunLimit, Simulator, SyntheticArrivals, TraceArrivals};

/// How arrivals are produced.
#[derive(Debug, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ArrivalConfig {
    /// Draw inter-arrival gaps and packet sizes from exponential
    /// distributions; the run is bounded by a departure count.
    Synthetic {
        /// Number of departures to simulate.
        packets: u64,
        /// Arrival rate λ in packets per second.
        arrival_rate: f64,
        /// Mean packet size in bytes.
        mean_packet_size: f64,
        /// RNG seed; runs with the same seed are identical. A random
        /// seed is used when absent.
        #[serde(default)]
        seed: Option<u64>,
    },
    /// Replay a recorded trace; the run ends when the trace drains.
    Trace {
        /// Path to a whitespace-delimited `inter_arrival_us size_bytes`
        /// trace file.
        path: PathBuf,
    },
}

fn default_bucket_limit() -> usize {
    10
}

/// Configuration for a single simulation.
#[derive(Debug, Deserialize)]
pub struct SimulationConfig {
    /// Arrival sourcing. See [`ArrivalConfig`].
    #[serde(flatten)]
    pub arrivals: ArrivalConfig,

    /// Link rate in bits per second.
    pub link_rate: f64,

    /// Largest occupancy reported individually in the `P(n)`
    /// distribution; larger values fall into the overflow bucket.
    #[serde(default = "default_bucket_limit")]
    pub bucket_limit: usize,
}

impl SimulationConfig {
    /// Reads a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or parsing fails.
    pub fn from_json<R: Read>(reader: R) -> eyre::Result<Self> {
        serde_json::from_reader(reader).wrap_err("unable to parse simulation config")
    }

    /// Validates the parameters and builds a primed [`Simulator`].
    ///
    /// # Errors
    ///
    /// Returns an error for non-positive or non-finite rate parameters,
    /// and for a trace that cannot be opened or parsed. A malformed
    /// trace aborts the run here, before any event is processed.
    pub fn build(&self) -> eyre::Result<Simulator> {
        eyre::ensure!(
            self.link_rate.is_finite() && self.link_rate > 0.0,
            "link rate must be a positive number of bits per second"
        );
        let link = Link::new(self.link_rate);
        match &self.arrivals {
            ArrivalConfig::Synthetic {
                packets,
                arrival_rate,
                mean_packet_size,
                seed,
            } => {
                eyre::ensure!(
                    arrival_rate.is_finite() && *arrival_rate > 0.0,
                    "arrival rate must be a positive number of packets per second"
                );
                eyre::ensure!(
                    mean_packet_size.is_finite() && *mean_packet_size > 0.0,
                    "mean packet size must be a positive number of bytes"
                );
                let rng = (*seed).map_or_else(ChaChaRng::from_entropy, ChaChaRng::seed_from_u64);
                let arrivals = SyntheticArrivals::new(*arrival_rate, *mean_packet_size, rng)
                    .map_err(|err| eyre::eyre!("invalid arrival parameters: {}", err))?;
                Ok(Simulator::new(
                    Box::new(arrivals),
                    link,
                    RunLimit::Departures(*packets),
                    self.bucket_limit,
                ))
            }
            ArrivalConfig::Trace { path } => {
                let file = File::open(path)
                    .wrap_err_with(|| format!("unable to open trace file: {}", path.display()))?;
                let rows = read_trace(BufReader::new(file))
                    .wrap_err_with(|| format!("malformed trace file: {}", path.display()))?;
                Ok(Simulator::new(
                    Box::new(TraceArrivals::new(rows)),
                    link,
                    RunLimit::Drain,
                    self.bucket_limit,
                ))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_synthetic_config() {
        let config = SimulationConfig::from_json(
            r#"{
                "mode": "synthetic",
                "packets": 10000,
                "arrival_rate": 500000.0,
                "mean_packet_size": 1250.0,
                "seed": 17,
                "link_rate": 10e9
            }"#
            .as_bytes(),
        )
        .unwrap();
        assert_eq!(config.bucket_limit, 10);
        match &config.arrivals {
            ArrivalConfig::Synthetic {
                packets,
                arrival_rate,
                mean_packet_size,
                seed,
            } => {
                assert_eq!(*packets, 10_000);
                assert!((arrival_rate - 500_000.0).abs() < f64::EPSILON);
                assert!((mean_packet_size - 1250.0).abs() < f64::EPSILON);
                assert_eq!(*seed, Some(17));
            }
            ArrivalConfig::Trace { .. } => panic!("expected synthetic mode"),
        }
        assert!(config.build().is_ok());
    }

    #[test]
    fn test_parse_trace_config() {
        let config = SimulationConfig::from_json(
            r#"{
                "mode": "trace",
                "path": "packets.trace",
                "link_rate": 1e9,
                "bucket_limit": 5
            }"#
            .as_bytes(),
        )
        .unwrap();
        assert_eq!(config.bucket_limit, 5);
        match config.arrivals {
            ArrivalConfig::Trace { ref path } => {
                assert_eq!(path, &PathBuf::from("packets.trace"));
            }
            ArrivalConfig::Synthetic { .. } => panic!("expected trace mode"),
        }
    }

    #[test]
    fn test_build_rejects_invalid_rates() {
        for (arrival_rate, mean_packet_size, link_rate) in &[
            (0.0, 1250.0, 10e9),
            (-1.0, 1250.0, 10e9),
            (500.0, 0.0, 10e9),
            (500.0, 1250.0, 0.0),
            (f64::NAN, 1250.0, 10e9),
        ] {
            let config = SimulationConfig {
                arrivals: ArrivalConfig::Synthetic {
                    packets: 10,
                    arrival_rate: *arrival_rate,
                    mean_packet_size: *mean_packet_size,
                    seed: Some(0),
                },
                link_rate: *link_rate,
                bucket_limit: 10,
            };
            assert!(config.build().is_err());
        }
    }

    #[test]
    fn test_build_rejects_missing_trace_file() {
        let config = SimulationConfig {
            arrivals: ArrivalConfig::Trace {
                path: PathBuf::from("/definitely/not/here.trace"),
            },
            link_rate: 10e9,
            bucket_limit: 10,
        };
        assert!(config.build().is_err());
    }
}
