//! Bounded ordered holding area for undeliverable events
//!
//! Owned exclusively by the delivery worker. Events keep their enqueue
//! order; when the backlog is full the oldest fifth is evicted in a single
//! batch so the retained events always form a contiguous suffix of what was
//! pushed.

use std::collections::VecDeque;

use calltrace_core::Event;

/// Fraction of capacity evicted at once when the backlog overflows
const EVICTION_DIVISOR: usize = 5;

/// FIFO event buffer with batch eviction
#[derive(Debug)]
pub struct Backlog {
    events: VecDeque<Event>,
    capacity: usize,
}

impl Backlog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of events dropped per overflow
    pub fn eviction_batch(&self) -> usize {
        (self.capacity / EVICTION_DIVISOR).max(1)
    }

    /// Append an event, returning how many old events were evicted
    pub fn push(&mut self, event: Event) -> usize {
        let evicted = if self.events.len() >= self.capacity {
            let batch = self.eviction_batch().min(self.events.len());
            self.events.drain(..batch);
            batch
        } else {
            0
        };
        self.events.push_back(event);
        evicted
    }

    /// Put back an event older than everything held
    ///
    /// When full, the event itself is the oldest and is the one dropped;
    /// returns the number of events lost (0 or 1).
    pub fn push_front(&mut self, event: Event) -> usize {
        if self.events.len() >= self.capacity {
            return 1;
        }
        self.events.push_front(event);
        0
    }

    /// Oldest event, left in place
    pub fn front(&self) -> Option<&Event> {
        self.events.front()
    }

    /// Remove the oldest event
    pub fn pop_front(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }
}
