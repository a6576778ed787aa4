//! Running statistics: the time-weighted occupancy integral and the
//! per-arrival occupancy counters.

use std::convert::TryFrom;
use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::{as_micros, Error};

/// Accumulates statistics over one simulation run and produces the
/// final metrics on demand.
#[derive(Debug)]
pub struct Stats {
    bucket_limit: usize,
    // Counters for 0..=bucket_limit packets found at arrival, plus one
    // overflow bucket for anything beyond.
    found_counts: Vec<u64>,
    arrivals: u64,
    departed: u64,
    total_delay: Duration,
    // Area under the "packets in system" step function, in
    // packet-seconds.
    area: f64,
    elapsed: Duration,
}

impl Stats {
    /// Creates an empty accumulator reporting `P(0)` through
    /// `P(bucket_limit)` individually and clamping anything beyond into
    /// the overflow bucket.
    #[must_use]
    pub fn new(bucket_limit: usize) -> Self {
        Self {
            bucket_limit,
            found_counts: vec![0; bucket_limit + 2],
            arrivals: 0,
            departed: 0,
            total_delay: Duration::default(),
            area: 0.0,
            elapsed: Duration::default(),
        }
    }

    /// Records an arrival that found `found_in_system` packets already
    /// present.
    pub fn record_arrival(&mut self, found_in_system: usize) {
        let index = found_in_system.min(self.bucket_limit + 1);
        self.found_counts[index] += 1;
        self.arrivals += 1;
    }

    /// Records a departed packet and its sojourn time.
    pub fn record_departure(&mut self, delay: Duration) {
        self.total_delay += delay;
        self.departed += 1;
    }

    /// Extends the occupancy integral by `elapsed` time spent with
    /// `in_system` packets present.
    pub fn integrate(&mut self, elapsed: Duration, in_system: usize) {
        #[allow(clippy::cast_precision_loss)]
        {
            self.area += in_system as f64 * elapsed.as_secs_f64();
        }
        self.elapsed += elapsed;
    }

    /// Number of recorded arrivals.
    #[must_use]
    pub fn arrivals(&self) -> u64 {
        self.arrivals
    }

    /// Number of recorded departures.
    #[must_use]
    pub fn departed(&self) -> u64 {
        self.departed
    }

    /// Computes the final metrics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyInput`] when nothing arrived, nothing
    /// departed, or no simulated time elapsed; each of the metrics would
    /// otherwise divide by zero, so the result is reported as undefined
    /// instead of being computed.
    #[allow(clippy::cast_precision_loss)]
    pub fn summary(&self) -> Result<Summary, Error> {
        if self.arrivals == 0 || self.departed == 0 || self.elapsed.as_nanos() == 0 {
            return Err(Error::EmptyInput);
        }
        let arrivals = self.arrivals as f64;
        let occupancy = self.found_counts[..=self.bucket_limit]
            .iter()
            .map(|&count| count as f64 / arrivals)
            .collect();
        let overflow = self.found_counts[self.bucket_limit + 1] as f64 / arrivals;
        Ok(Summary {
            avg_in_system: self.area / self.elapsed.as_secs_f64(),
            avg_delay: self.total_delay / u32::try_from(self.departed).unwrap_or(u32::MAX),
            occupancy,
            overflow,
            arrivals: self.arrivals,
            departed: self.departed,
            elapsed: self.elapsed,
        })
    }
}

fn serialize_duration_micros<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(as_micros(*duration))
}

/// Final metrics of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Time-averaged number of packets in the system (`N`).
    pub avg_in_system: f64,
    /// Average sojourn time over all departed packets (`T`).
    #[serde(rename = "avg_delay_us", serialize_with = "serialize_duration_micros")]
    pub avg_delay: Duration,
    /// `P(n)` for `n` in `0..=k`: the probability that an arriving
    /// packet found exactly `n` packets already in the system.
    pub occupancy: Vec<f64>,
    /// `P(n > k)`: probability mass beyond the last reported bucket.
    pub overflow: f64,
    /// Total recorded arrivals.
    pub arrivals: u64,
    /// Total departed packets.
    pub departed: u64,
    /// Total simulated time.
    #[serde(rename = "elapsed_us", serialize_with = "serialize_duration_micros")]
    pub elapsed: Duration,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulation results:")?;
        writeln!(f, "  Packets departed:          {}", self.departed)?;
        writeln!(f, "  Elapsed time:              {:.4} us", as_micros(self.elapsed))?;
        writeln!(f, "  Avg number in system (N):  {:.4}", self.avg_in_system)?;
        writeln!(f, "  Avg time in system (T):    {:.4} us", as_micros(self.avg_delay))?;
        writeln!(f, "P(n) distribution (based on arrivals):")?;
        for (n, probability) in self.occupancy.iter().enumerate() {
            writeln!(f, "  P({}) = {:.4}", n, probability)?;
        }
        write!(
            f,
            "  P(n > {}) = {:.4}",
            self.occupancy.len().saturating_sub(1),
            self.overflow
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn test_summary_of_empty_run_is_undefined() {
        let stats = Stats::new(10);
        assert_eq!(stats.summary(), Err(Error::EmptyInput));
    }

    #[test]
    fn test_summary_without_departures_is_undefined() {
        let mut stats = Stats::new(10);
        stats.record_arrival(0);
        stats.integrate(Duration::from_micros(5), 1);
        assert_eq!(stats.summary(), Err(Error::EmptyInput));
    }

    #[test]
    fn test_metrics_over_a_hand_computed_run() {
        let mut stats = Stats::new(10);
        // One packet alone in the system for 2 us, then two packets for
        // 1 us: area = 2 * 1 + 1 * 2 = 4 packet-us over 3 us.
        stats.record_arrival(0);
        stats.integrate(Duration::from_micros(2), 1);
        stats.record_arrival(1);
        stats.integrate(Duration::from_micros(1), 2);
        stats.record_departure(Duration::from_micros(3));
        stats.record_departure(Duration::from_micros(1));

        let summary = stats.summary().unwrap();
        assert!(approx_eq!(f64, summary.avg_in_system, 4.0 / 3.0, ulps = 2));
        assert_eq!(summary.avg_delay, Duration::from_micros(2));
        assert_eq!(summary.elapsed, Duration::from_micros(3));
        assert_eq!(summary.arrivals, 2);
        assert_eq!(summary.departed, 2);
        assert!(approx_eq!(f64, summary.occupancy[0], 0.5, ulps = 2));
        assert!(approx_eq!(f64, summary.occupancy[1], 0.5, ulps = 2));
    }

    #[test]
    fn test_occupancy_beyond_bucket_limit_is_clamped() {
        let mut stats = Stats::new(3);
        stats.record_arrival(3);
        stats.record_arrival(4);
        stats.record_arrival(250);
        stats.record_departure(Duration::from_micros(1));
        stats.integrate(Duration::from_micros(1), 1);

        let summary = stats.summary().unwrap();
        assert_eq!(summary.occupancy.len(), 4);
        assert!(approx_eq!(f64, summary.occupancy[3], 1.0 / 3.0, ulps = 2));
        assert!(approx_eq!(f64, summary.overflow, 2.0 / 3.0, ulps = 2));
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let mut stats = Stats::new(5);
        for n in 0..100 {
            stats.record_arrival(n % 9);
        }
        stats.record_departure(Duration::from_micros(1));
        stats.integrate(Duration::from_micros(1), 1);

        let summary = stats.summary().unwrap();
        let total: f64 = summary.occupancy.iter().sum::<f64>() + summary.overflow;
        assert!(approx_eq!(f64, total, 1.0, epsilon = 1e-6));
    }
}
