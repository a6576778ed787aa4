//! The event loop: pops events in causal order, advances the clock,
//! keeps the occupancy integral current, and dispatches to the server
//! state machine.

use std::time::{Duration, Instant};

use crate::{
    as_micros, ArrivalProcess, Error, Event, EventQueue, Link, Packet, PacketId, ServerQueue,
    Stats, Summary,
};

/// Tracks current simulated time and the time of the last state change.
///
/// Simulated time is fully decoupled from wall-clock time and advances
/// in event-order jumps; it never moves backwards.
#[derive(Debug, Default)]
pub struct Clock {
    current: Duration,
    last_update: Duration,
}

impl Clock {
    /// The current simulated time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.current
    }

    /// Advances to `time` and returns the span since the last update,
    /// the integration delta for the occupancy integral.
    pub fn advance_to(&mut self, time: Duration) -> Duration {
        debug_assert!(time >= self.current, "simulated time moved backwards");
        self.current = self.current.max(time);
        let elapsed = self.current - self.last_update;
        self.last_update = self.current;
        elapsed
    }
}

/// Determines when a run terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLimit {
    /// Stop as soon as this many packets have departed. Events still
    /// scheduled at that point (the next arrival, trailing departures)
    /// are discarded; the statistics cover exactly the processed
    /// prefix.
    Departures(u64),
    /// Run until the event queue empties. This is the trace-driven
    /// mode: every packet of the trace both arrives and departs.
    Drain,
}

/// What a finished (or interrupted) run looked like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Packets that arrived during the run.
    pub arrived: u64,
    /// Packets that departed during the run.
    pub departed: u64,
    /// Events still scheduled when the loop stopped. Non-zero only in
    /// the count-bounded mode or after an interrupted run.
    pub pending_events: usize,
    /// The wall-clock guard fired before the run completed. The
    /// accumulated statistics remain valid, just based on fewer
    /// samples.
    pub interrupted: bool,
}

/// One record of the optional per-event journal, kept for debugging and
/// validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRecord {
    /// A packet arrived and found `found` packets already present.
    Arrival {
        /// The arriving packet.
        packet: PacketId,
        /// Arrival time.
        time: Duration,
        /// Packets found in the system.
        found: usize,
    },
    /// A packet departed after spending `delay` in the system.
    Departure {
        /// The departing packet.
        packet: PacketId,
        /// Departure time.
        time: Duration,
        /// Sojourn time.
        delay: Duration,
    },
}

/// The simulation driver.
///
/// Owns all core state (event queue, server, clock, accumulator) for
/// the duration of one run; independent runs use independent instances.
pub struct Simulator {
    arrivals: Box<dyn ArrivalProcess>,
    link: Link,
    limit: RunLimit,
    events: EventQueue,
    server: ServerQueue,
    clock: Clock,
    stats: Stats,
    next_id: PacketId,
    max_wall_clock: Option<Duration>,
    journal: Option<Vec<EventRecord>>,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator").finish()
    }
}

impl Simulator {
    /// Creates a simulator driven by the given arrival source, and
    /// primes the event queue with the first arrival (if any).
    ///
    /// `bucket_limit` is the largest occupancy reported individually in
    /// the `P(n)` distribution; larger values fall into the overflow
    /// bucket.
    #[must_use]
    pub fn new(
        arrivals: Box<dyn ArrivalProcess>,
        link: Link,
        limit: RunLimit,
        bucket_limit: usize,
    ) -> Self {
        let mut simulator = Self {
            arrivals,
            link,
            limit,
            events: EventQueue::new(),
            server: ServerQueue::new(),
            clock: Clock::default(),
            stats: Stats::new(bucket_limit),
            next_id: PacketId::default(),
            max_wall_clock: None,
            journal: None,
        };
        simulator.schedule_next_arrival();
        simulator
    }

    /// Interrupts the run once this much wall-clock time has passed,
    /// leaving partial but valid statistics. Meant as a safety guard
    /// for automated harnesses.
    #[must_use]
    pub fn with_max_wall_clock(mut self, limit: Duration) -> Self {
        self.max_wall_clock = Some(limit);
        self
    }

    /// Records every processed event into an in-memory journal,
    /// retrievable through [`journal`](Self::journal).
    #[must_use]
    pub fn with_journal(mut self) -> Self {
        self.journal = Some(Vec::new());
        self
    }

    /// Runs the event loop to completion (as defined by the
    /// [`RunLimit`]) or until the wall-clock guard fires.
    pub fn run(&mut self) -> RunOutcome {
        let deadline = self.max_wall_clock.map(|limit| Instant::now() + limit);
        let mut interrupted = false;
        loop {
            if self.target_reached() {
                break;
            }
            if deadline.map_or(false, |deadline| Instant::now() >= deadline) {
                log::warn!("wall-clock guard fired; stopping with partial statistics");
                interrupted = true;
                break;
            }
            let (time, event) = match self.events.pop() {
                Some(popped) => popped,
                None => break,
            };
            let elapsed = self.clock.advance_to(time);
            self.stats.integrate(elapsed, self.server.in_system());
            match event {
                Event::Arrival(packet) => self.handle_arrival(packet),
                Event::Departure(packet) => self.handle_departure(packet),
            }
        }
        RunOutcome {
            arrived: self.stats.arrivals(),
            departed: self.stats.departed(),
            pending_events: self.events.len(),
            interrupted,
        }
    }

    /// The statistics accumulated so far.
    #[must_use]
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Computes the final metrics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyInput`] when the run processed no packets.
    pub fn summary(&self) -> Result<Summary, Error> {
        self.stats.summary()
    }

    /// The per-event journal, empty unless enabled with
    /// [`with_journal`](Self::with_journal).
    #[must_use]
    pub fn journal(&self) -> &[EventRecord] {
        self.journal.as_deref().unwrap_or(&[])
    }

    fn target_reached(&self) -> bool {
        match self.limit {
            RunLimit::Departures(target) => self.stats.departed() >= target,
            RunLimit::Drain => false,
        }
    }

    fn schedule_next_arrival(&mut self) {
        if let Some(arrival) = self.arrivals.next_arrival() {
            let packet = Packet {
                id: self.next_id,
                arrival_time: arrival.time,
                size_bytes: arrival.size_bytes,
            };
            self.next_id = self.next_id.next();
            self.events.push(arrival.time, Event::Arrival(packet));
        }
    }

    fn handle_arrival(&mut self, packet: Packet) {
        let now = self.clock.now();
        let found = self.server.in_system();
        log::debug!(
            "[{:.2}] pkt {} arrives and finds {} packets in the system",
            as_micros(now),
            packet.id,
            found
        );
        self.stats.record_arrival(found);
        if let Some(journal) = &mut self.journal {
            journal.push(EventRecord::Arrival {
                packet: packet.id,
                time: now,
                found,
            });
        }
        self.schedule_next_arrival();
        if let Some(departure) = self.server.arrive(packet, now, self.link) {
            self.events.push(departure.time, Event::Departure(departure.packet));
        }
    }

    fn handle_departure(&mut self, packet: PacketId) {
        let now = self.clock.now();
        let (served, next) = self
            .server
            .complete(now, self.link)
            .expect("departure event popped while the server is idle");
        debug_assert_eq!(served.id, packet);
        let delay = now - served.arrival_time;
        log::debug!(
            "[{:.2}] pkt {} departs having spent {:.2} us in the system",
            as_micros(now),
            served.id,
            as_micros(delay)
        );
        self.stats.record_departure(delay);
        if let Some(journal) = &mut self.journal {
            journal.push(EventRecord::Departure {
                packet: served.id,
                time: now,
                delay,
            });
        }
        if let Some(departure) = next {
            self.events.push(departure.time, Event::Departure(departure.packet));
        }
    }
}
