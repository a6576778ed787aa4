//! Event queue driving the simulation's causal ordering.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

use crate::{Packet, PacketId};

/// A scheduled state change at a simulated timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// A packet arrives at the link.
    Arrival(Packet),
    /// The packet currently in service finishes transmission.
    Departure(PacketId),
}

/// Entry type stored in the queue: the event value plus the time when it
/// is supposed to occur and its insertion sequence number.
#[derive(Debug)]
struct EventEntry {
    time: Reverse<Duration>,
    seq: Reverse<u64>,
    event: Event,
}

impl PartialEq for EventEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for EventEntry {}

impl PartialOrd for EventEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Min-priority queue of timestamped [`Event`]s.
///
/// Events are totally ordered by time ascending. Equal-time events are
/// popped in insertion order: each pushed event receives a sequence
/// number, and the heap orders by `(time, seq)`.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<EventEntry>,
    next_seq: u64,
}

impl EventQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `event` scheduled at `time`. `O(log n)`.
    pub fn push(&mut self, time: Duration, event: Event) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(EventEntry {
            time: Reverse(time),
            seq: Reverse(seq),
            event,
        });
    }

    /// Removes and returns the earliest event, or `None` if no events
    /// remain. Ties are broken by insertion order.
    pub fn pop(&mut self) -> Option<(Duration, Event)> {
        self.heap.pop().map(|entry| (entry.time.0, entry.event))
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// `true` if no events are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
