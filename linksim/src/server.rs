//! The single server: a transmission link draining a FIFO queue.

use std::collections::VecDeque;
use std::time::Duration;

use crate::{Packet, PacketId};

/// A departure to be scheduled: emitted whenever a packet begins
/// service and its completion time becomes known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledDeparture {
    /// The packet that just began service.
    pub packet: PacketId,
    /// The simulation time at which its transmission completes.
    pub time: Duration,
}

/// The simulated transmission link.
#[derive(Debug, Clone, Copy)]
pub struct Link {
    rate_bps: f64,
}

impl Link {
    /// Creates a link transmitting at the given rate in bits per second.
    #[must_use]
    pub fn new(rate_bps: f64) -> Self {
        Self { rate_bps }
    }

    /// Time required to transmit a packet of `size_bytes` bytes.
    ///
    /// A pure function of the packet size and the link rate; any
    /// randomness in sizes lives in the arrival process.
    #[must_use]
    pub fn service_time(&self, size_bytes: f64) -> Duration {
        Duration::from_secs_f64(size_bytes * 8.0 / self.rate_bps)
    }
}

#[derive(Debug)]
struct InService {
    packet: Packet,
    departure_time: Duration,
}

/// The waiting FIFO plus the busy/idle state of the single server.
///
/// At most one packet is in service at a time. The server is idle if
/// and only if no packet is in service; outside of a transition an idle
/// server implies an empty waiting queue.
#[derive(Debug, Default)]
pub struct ServerQueue {
    waiting: VecDeque<Packet>,
    in_service: Option<InService>,
}

impl ServerQueue {
    /// Creates an idle server with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if a packet is currently being transmitted.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_service.is_some()
    }

    /// Number of packets in the system: waiting plus in service.
    #[must_use]
    pub fn in_system(&self) -> usize {
        self.waiting.len() + usize::from(self.is_busy())
    }

    /// Number of packets waiting for service.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.waiting.len()
    }

    /// Handles a packet arriving at `now`.
    ///
    /// If the server is idle the packet enters service immediately,
    /// skipping the waiting queue, and its departure is returned so the
    /// caller can schedule the departure event. If the server is busy
    /// the packet is appended to the FIFO and `None` is returned.
    pub fn arrive(
        &mut self,
        packet: Packet,
        now: Duration,
        link: Link,
    ) -> Option<ScheduledDeparture> {
        if self.is_busy() {
            self.waiting.push_back(packet);
            None
        } else {
            Some(self.start_service(packet, now, link))
        }
    }

    /// Handles the in-service packet completing transmission at `now`.
    ///
    /// Returns the completed packet and, if the FIFO was non-empty, the
    /// departure of its head, which begins service at `now`. Returns
    /// `None` if the server was idle, which indicates a stray departure
    /// event and a bug in the caller.
    pub fn complete(
        &mut self,
        now: Duration,
        link: Link,
    ) -> Option<(Packet, Option<ScheduledDeparture>)> {
        let served = self.in_service.take()?;
        debug_assert_eq!(served.departure_time, now);
        let next_departure = self
            .waiting
            .pop_front()
            .map(|head| self.start_service(head, now, link));
        Some((served.packet, next_departure))
    }

    fn start_service(&mut self, packet: Packet, now: Duration, link: Link) -> ScheduledDeparture {
        let departure_time = now + link.service_time(packet.size_bytes);
        self.in_service = Some(InService {
            packet,
            departure_time,
        });
        ScheduledDeparture {
            packet: packet.id,
            time: departure_time,
        }
    }
}
