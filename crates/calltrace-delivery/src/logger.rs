//! Producer-facing emitter API and the event queue
//!
//! A [`Logger`] is a cheap, cloneable handle over a bounded multi-producer
//! channel. Every entry point is synchronous and non-blocking, so it can be
//! called from instrumented code on any thread, inside or outside a Tokio
//! runtime. The matching [`EventQueue`] is consumed by exactly one delivery
//! worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{error, trace, warn};

use calltrace_core::{Event, Format, Value};

use crate::error::EnqueueError;
use crate::stats::{DeliveryStats, StatsSnapshot};

struct LoggerInner {
    counter: AtomicU64,
    tx: mpsc::Sender<Event>,
    format: Format,
    socket_mode: bool,
    stats: Arc<DeliveryStats>,
}

/// Handle used by instrumented code to emit events
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

/// Consumer end of the event queue
pub struct EventQueue {
    rx: mpsc::Receiver<Event>,
    stats: Arc<DeliveryStats>,
}

impl Logger {
    /// Create a logger and its queue; no worker is started
    pub fn new(format: Format, queue_capacity: usize) -> (Self, EventQueue) {
        Self::with_mode(format, queue_capacity, false)
    }

    pub(crate) fn with_mode(
        format: Format,
        queue_capacity: usize,
        socket_mode: bool,
    ) -> (Self, EventQueue) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let stats = Arc::new(DeliveryStats::default());
        let logger = Self {
            inner: Arc::new(LoggerInner {
                counter: AtomicU64::new(0),
                tx,
                format,
                socket_mode,
                stats: stats.clone(),
            }),
        };
        (logger, EventQueue { rx, stats })
    }

    /// Wire format the logger was configured with
    pub fn format(&self) -> Format {
        self.inner.format
    }

    /// Next correlation id; strictly increasing, starts at 1
    pub fn id(&self) -> u64 {
        self.inner.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record a function entry
    pub fn log_enter(&self, id: u64, name: &str, args: &[Value<'_>]) {
        self.log(Event::enter(id, name, args));
    }

    /// Record a function exit
    pub fn log_leave(&self, id: u64, name: &str, args: &[Value<'_>], results: &[Value<'_>]) {
        self.log(Event::leave(id, name, args, results));
    }

    /// Record the caller's source location as a `TRACE` event
    #[track_caller]
    pub fn call_trace(&self) {
        self.log(Event::trace(std::panic::Location::caller()));
    }

    /// Enqueue an event without blocking
    ///
    /// A full queue drops the event and logs a diagnostic; the caller is never
    /// blocked or failed.
    pub fn log(&self, event: Event) {
        match self.try_log(event) {
            Ok(()) => {}
            Err(err @ EnqueueError::Full { .. }) if self.inner.socket_mode => {
                error!(error = %err, "Critical: socket event buffer full (network issue?)");
            }
            Err(err @ EnqueueError::Full { .. }) => {
                warn!(error = %err, "Event buffer full");
            }
            Err(err @ EnqueueError::Closed { .. }) => {
                trace!(error = %err, "Delivery stopped");
            }
        }
    }

    /// Enqueue an event, reporting a drop to the caller
    pub fn try_log(&self, event: Event) -> Result<(), EnqueueError> {
        match self.inner.tx.try_send(event) {
            Ok(()) => {
                self.inner.stats.record_enqueued();
                Ok(())
            }
            Err(TrySendError::Full(event)) => {
                self.inner.stats.record_dropped();
                Err(EnqueueError::Full { event: event.name })
            }
            Err(TrySendError::Closed(event)) => {
                self.inner.stats.record_dropped();
                Err(EnqueueError::Closed { event: event.name })
            }
        }
    }

    /// Current delivery counters
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("format", &self.inner.format)
            .field("socket_mode", &self.inner.socket_mode)
            .field("capacity", &self.inner.tx.max_capacity())
            .finish()
    }
}

impl EventQueue {
    /// Next event in enqueue order; `None` once every logger is dropped
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Next event if one is ready
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Number of events waiting
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub(crate) fn stats(&self) -> Arc<DeliveryStats> {
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn test_new_logger() {
        let (logger, queue) = Logger::new(Format::Json, 16);
        assert_eq!(logger.format(), Format::Json);
        assert!(queue.is_empty());
        assert_eq!(logger.stats(), StatsSnapshot::default());
    }

    #[test]
    fn test_sequential_ids() {
        let (logger, _queue) = Logger::new(Format::Json, 16);
        let id1 = logger.id();
        let id2 = logger.id();
        assert_eq!(id1, 1);
        assert_eq!(id2, id1 + 1);
    }

    #[test]
    fn test_clones_share_counter() {
        let (logger, _queue) = Logger::new(Format::Json, 16);
        let other = logger.clone();
        assert_eq!(logger.id(), 1);
        assert_eq!(other.id(), 2);
    }

    #[tokio::test]
    async fn test_log_enter_leave() {
        let (logger, mut queue) = Logger::new(Format::Text, 16);
        logger.log_enter(1, "testFunc", &[Value::from(42), Value::from("hello")]);
        logger.log_leave(
            1,
            "testFunc",
            &[Value::from(42), Value::from("hello")],
            &[Value::from("result")],
        );

        let enter = queue.recv().await.unwrap();
        assert_eq!(enter.name, "testFunc_Enter");
        assert_eq!(enter.args, vec!["1", "42", "\"hello\""]);
        assert!(enter.results.is_empty());

        let leave = queue.recv().await.unwrap();
        assert_eq!(leave.name, "testFunc_Leave");
        assert_eq!(leave.results, vec!["\"result\""]);
        assert!(leave.timestamp >= enter.timestamp);
        assert_eq!(logger.stats().enqueued, 2);
    }

    #[tokio::test]
    async fn test_call_trace_records_location() {
        let (logger, mut queue) = Logger::new(Format::Text, 4);
        logger.call_trace();
        let event = queue.recv().await.unwrap();
        assert_eq!(event.name, "TRACE");
        assert!(event.args[0].contains(file!()));
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let (logger, _queue) = Logger::new(Format::Json, 2);
        logger.log(Event::new("a", vec![], vec![]));
        logger.log(Event::new("b", vec![], vec![]));

        let start = Instant::now();
        logger.log(Event::new("c", vec![], vec![]));
        assert!(start.elapsed() < Duration::from_millis(1));

        assert_eq!(
            logger.try_log(Event::new("d", vec![], vec![])),
            Err(EnqueueError::Full { event: "d".into() })
        );
        let stats = logger.stats();
        assert_eq!(stats.enqueued, 2);
        assert_eq!(stats.dropped, 2);
    }

    #[test]
    fn test_closed_queue_reports_closed() {
        let (logger, queue) = Logger::new(Format::Json, 2);
        drop(queue);
        assert_eq!(
            logger.try_log(Event::new("late", vec![], vec![])),
            Err(EnqueueError::Closed { event: "late".into() })
        );
        // Silent for the caller.
        logger.log(Event::new("later", vec![], vec![]));
    }

    #[test]
    fn test_concurrent_ids_are_unique() {
        const PRODUCERS: usize = 100;
        const PER_PRODUCER: usize = 1000;

        let (logger, _queue) = Logger::new(Format::Json, 1);
        let handles: Vec<_> = (0..PRODUCERS)
            .map(|_| {
                let logger = logger.clone();
                std::thread::spawn(move || {
                    (0..PER_PRODUCER).map(|_| logger.id()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::with_capacity(PRODUCERS * PER_PRODUCER);
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
        assert_eq!(seen.iter().max(), Some(&((PRODUCERS * PER_PRODUCER) as u64)));
    }

    #[test]
    fn test_concurrent_producers_counters_balance() {
        let (logger, _queue) = Logger::new(Format::Json, 500);
        let handles: Vec<_> = (0..10)
            .map(|t| {
                let logger = logger.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        logger.log(Event::new(format!("t{t}_{i}"), vec![], vec![]));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let stats = logger.stats();
        assert_eq!(stats.enqueued, 500);
        assert_eq!(stats.dropped, 500);
    }
}
