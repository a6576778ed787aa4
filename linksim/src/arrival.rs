//! Arrival sourcing: statistical generation or trace replay.

use std::io::BufRead;
use std::num::ParseFloatError;
use std::time::Duration;

use rand::Rng;
use rand_distr::{Distribution, Exp, ExpError};

/// The next packet's arrival time and size, as produced by an
/// [`ArrivalProcess`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrival {
    /// Absolute simulation time of the arrival.
    pub time: Duration,
    /// Packet size in bytes.
    pub size_bytes: f64,
}

/// Produces the arrival time and size of consecutive packets.
///
/// The simulator drives whichever variant it is given through this one
/// capability and never learns whether the arrivals are drawn from
/// distributions or replayed from a trace.
pub trait ArrivalProcess {
    /// Returns the next arrival, or `None` when the source is exhausted.
    /// Arrival times are nondecreasing across calls.
    fn next_arrival(&mut self) -> Option<Arrival>;
}

/// Synthetic arrivals: inter-arrival gaps drawn from an exponential
/// distribution at rate λ (packets per second) and packet sizes drawn
/// from an exponential distribution with a fixed mean (bytes).
///
/// The sequence is unbounded; the simulator decides how many arrivals
/// to consume. Pass a seeded RNG for reproducible runs.
pub struct SyntheticArrivals<R: Rng> {
    rng: R,
    gap_dist: Exp<f64>,
    size_dist: Exp<f64>,
    next_time: Duration,
}

impl<R: Rng> SyntheticArrivals<R> {
    /// Creates a source with the given arrival rate (packets per second)
    /// and mean packet size (bytes).
    ///
    /// # Errors
    ///
    /// Returns an error if either rate parameter is not a positive
    /// finite number.
    pub fn new(arrival_rate: f64, mean_size_bytes: f64, rng: R) -> Result<Self, ExpError> {
        Ok(Self {
            rng,
            gap_dist: Exp::new(arrival_rate)?,
            size_dist: Exp::new(1.0 / mean_size_bytes)?,
            next_time: Duration::default(),
        })
    }
}

impl<R: Rng> ArrivalProcess for SyntheticArrivals<R> {
    fn next_arrival(&mut self) -> Option<Arrival> {
        let gap = self.gap_dist.sample(&mut self.rng);
        self.next_time += Duration::from_secs_f64(gap);
        Some(Arrival {
            time: self.next_time,
            size_bytes: self.size_dist.sample(&mut self.rng),
        })
    }
}

/// One row of a trace file: the gap since the previous arrival, in
/// microseconds, and the packet size in bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceRow {
    /// Inter-arrival gap in microseconds.
    pub inter_arrival_us: f64,
    /// Packet size in bytes.
    pub size_bytes: f64,
}

/// Errors raised while parsing a trace.
///
/// A malformed row aborts the load immediately; rows are never silently
/// skipped.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// The underlying reader failed.
    #[error("unable to read trace")]
    Io(#[from] std::io::Error),
    /// A row does not have exactly two columns.
    #[error("trace line {line}: expected two whitespace-separated columns")]
    MissingField {
        /// 1-based line number.
        line: usize,
    },
    /// A column is not a number.
    #[error("trace line {line}: {source}")]
    InvalidNumber {
        /// 1-based line number.
        line: usize,
        /// The underlying parse failure.
        source: ParseFloatError,
    },
    /// A column parsed as NaN or infinity.
    #[error("trace line {line}: value is not finite")]
    NotFinite {
        /// 1-based line number.
        line: usize,
    },
    /// The inter-arrival gap is negative. A zero gap is legal and means
    /// the packet arrives at the same instant as the previous one.
    #[error("trace line {line}: negative inter-arrival time")]
    NegativeInterArrival {
        /// 1-based line number.
        line: usize,
    },
    /// The packet size is zero or negative.
    #[error("trace line {line}: non-positive packet size")]
    NonPositiveSize {
        /// 1-based line number.
        line: usize,
    },
}

/// Reads a whitespace-delimited trace with `inter_arrival_us size_bytes`
/// columns and no header. Blank lines are skipped.
///
/// # Errors
///
/// Returns a [`TraceError`] describing the first offending line, if any.
pub fn read_trace<R: BufRead>(reader: R) -> Result<Vec<TraceRow>, TraceError> {
    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let mut fields = line.split_whitespace();
        let (first, second) = match (fields.next(), fields.next()) {
            (None, _) => continue,
            (Some(first), Some(second)) => (first, second),
            (Some(_), None) => return Err(TraceError::MissingField { line: idx + 1 }),
        };
        if fields.next().is_some() {
            return Err(TraceError::MissingField { line: idx + 1 });
        }
        let parse = |field: &str| -> Result<f64, TraceError> {
            let value: f64 = field.parse().map_err(|source| TraceError::InvalidNumber {
                line: idx + 1,
                source,
            })?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(TraceError::NotFinite { line: idx + 1 })
            }
        };
        let inter_arrival_us = parse(first)?;
        let size_bytes = parse(second)?;
        if inter_arrival_us < 0.0 {
            return Err(TraceError::NegativeInterArrival { line: idx + 1 });
        }
        if size_bytes <= 0.0 {
            return Err(TraceError::NonPositiveSize { line: idx + 1 });
        }
        rows.push(TraceRow {
            inter_arrival_us,
            size_bytes,
        });
    }
    Ok(rows)
}

/// Trace-driven arrivals: replays a fixed, finite sequence of rows,
/// running a cumulative sum over the inter-arrival gaps, then signals
/// exhaustion.
pub struct TraceArrivals {
    rows: std::vec::IntoIter<TraceRow>,
    next_time: Duration,
}

impl TraceArrivals {
    /// Creates a source replaying the given rows in order.
    #[must_use]
    pub fn new(rows: Vec<TraceRow>) -> Self {
        Self {
            rows: rows.into_iter(),
            next_time: Duration::default(),
        }
    }
}

impl ArrivalProcess for TraceArrivals {
    fn next_arrival(&mut self) -> Option<Arrival> {
        let row = self.rows.next()?;
        self.next_time += Duration::from_secs_f64(row.inter_arrival_us * 1e-6);
        Some(Arrival {
            time: self.next_time,
            size_bytes: row.size_bytes,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand_chacha::{rand_core::SeedableRng, ChaChaRng};
    use rstest::rstest;

    #[test]
    fn test_read_trace() {
        let input = "0 1000\n10 1000\n\n0.5 64.5\n";
        let rows = read_trace(input.as_bytes()).unwrap();
        assert_eq!(
            rows,
            vec![
                TraceRow {
                    inter_arrival_us: 0.0,
                    size_bytes: 1000.0
                },
                TraceRow {
                    inter_arrival_us: 10.0,
                    size_bytes: 1000.0
                },
                TraceRow {
                    inter_arrival_us: 0.5,
                    size_bytes: 64.5
                },
            ]
        );
    }

    #[rstest(
        input,
        case("10"),
        case("10 1000 7"),
        case("10 bytes"),
        case("nan 1000"),
        case("inf 1000"),
        case("-1 1000"),
        case("10 0"),
        case("10 -4")
    )]
    fn test_read_trace_rejects_malformed_rows(input: &str) {
        let full = format!("1 500\n{}\n1 500\n", input);
        let err = read_trace(full.as_bytes()).unwrap_err();
        match err {
            TraceError::Io(_) => panic!("unexpected I/O error"),
            TraceError::MissingField { line }
            | TraceError::InvalidNumber { line, .. }
            | TraceError::NotFinite { line }
            | TraceError::NegativeInterArrival { line }
            | TraceError::NonPositiveSize { line } => assert_eq!(line, 2),
        }
    }

    #[test]
    fn test_trace_arrivals_accumulate_gaps_then_exhaust() {
        let rows = vec![
            TraceRow {
                inter_arrival_us: 0.0,
                size_bytes: 1000.0,
            },
            TraceRow {
                inter_arrival_us: 10.0,
                size_bytes: 500.0,
            },
            TraceRow {
                inter_arrival_us: 0.0,
                size_bytes: 250.0,
            },
        ];
        let mut arrivals = TraceArrivals::new(rows);
        let first = arrivals.next_arrival().unwrap();
        assert_eq!(first.time, Duration::default());
        let second = arrivals.next_arrival().unwrap();
        assert_eq!(second.time, Duration::from_micros(10));
        let third = arrivals.next_arrival().unwrap();
        assert_eq!(third.time, Duration::from_micros(10));
        assert_eq!(third.size_bytes, 250.0);
        assert!(arrivals.next_arrival().is_none());
        assert!(arrivals.next_arrival().is_none());
    }

    #[test]
    fn test_synthetic_arrivals_are_reproducible() {
        let mut first =
            SyntheticArrivals::new(500.0, 1250.0, ChaChaRng::seed_from_u64(17)).unwrap();
        let mut second =
            SyntheticArrivals::new(500.0, 1250.0, ChaChaRng::seed_from_u64(17)).unwrap();
        let mut last = Duration::default();
        for _ in 0..100 {
            let a = first.next_arrival().unwrap();
            let b = second.next_arrival().unwrap();
            assert_eq!(a, b);
            assert!(a.time >= last);
            assert!(a.size_bytes > 0.0);
            last = a.time;
        }
    }

    #[test]
    fn test_synthetic_arrivals_reject_bad_rates() {
        assert!(SyntheticArrivals::new(0.0, 1250.0, ChaChaRng::seed_from_u64(0)).is_err());
        assert!(SyntheticArrivals::new(-1.0, 1250.0, ChaChaRng::seed_from_u64(0)).is_err());
    }
}
