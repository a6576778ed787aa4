//! Discrete-event simulation of a single-link, single-server FIFO queue
//! (an M/M/1-style network link).
//!
//! The simulator estimates steady-state performance metrics of the link:
//! the time-averaged number of packets in the system (`N`), the average
//! sojourn time (`T`), and the distribution `P(n)` of the number of
//! packets an arriving packet finds already present. Arrivals are driven
//! either by statistical distributions ([`SyntheticArrivals`]) or by
//! replaying a recorded trace ([`TraceArrivals`]).

#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

use std::time::Duration;

use derive_more::{Display, From, Into};

mod scheduler;
pub use scheduler::{Event, EventQueue};

mod arrival;
pub use arrival::{
    read_trace, Arrival, ArrivalProcess, SyntheticArrivals, TraceArrivals, TraceError, TraceRow,
};

mod server;
pub use server::{Link, ScheduledDeparture, ServerQueue};

mod stats;
pub use stats::{Stats, Summary};

mod simulation;
pub use simulation::{Clock, EventRecord, RunLimit, RunOutcome, Simulator};

pub mod config;
pub use config::{ArrivalConfig, SimulationConfig};

/// Packet ID, unique and monotonically increasing throughout one run.
#[derive(
    From, Into, Debug, PartialEq, PartialOrd, Eq, Ord, Copy, Clone, Hash, Display, Default,
)]
pub struct PacketId(usize);

impl PacketId {
    /// Returns the ID following this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// A packet traveling through the simulated link.
///
/// A packet is immutable once created; the departure time assigned when
/// its service begins is tracked by the [`ServerQueue`] and the scheduled
/// departure event, not by the packet itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Packet {
    /// Sequence number of this packet.
    pub id: PacketId,
    /// Simulation time at which the packet arrives at the link.
    pub arrival_time: Duration,
    /// Packet size in bytes.
    pub size_bytes: f64,
}

/// Errors reported by the simulation core.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Zero packets were requested or the trace was empty. The metrics
    /// are undefined, so they are reported as this error rather than
    /// computed from zero denominators.
    #[error("no packets were simulated; results are undefined")]
    EmptyInput,
}

/// Formats a simulation time as fractional microseconds for reports and
/// per-event logs.
pub(crate) fn as_micros(time: Duration) -> f64 {
    time.as_secs_f64() * 1e6
}
