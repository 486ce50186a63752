//! The delivery worker
//!
//! [`DeliveryWorker`] is the single owner of the destination connection and
//! of the [`Backlog`]. It is an explicit state machine:
//!
//! ```text
//! Disconnected ──────────────▶ Connecting
//! Connecting ── ok, empty ───▶ Connected
//! Connecting ── ok, backlog ─▶ DrainingBacklog
//! Connecting ── failed ──────▶ Disconnected   (after backoff, buffering)
//! DrainingBacklog ── done ───▶ Connected
//! DrainingBacklog ── failed ─▶ Disconnected   (unflushed suffix kept)
//! Connected ── write ok ─────▶ Connected
//! Connected ── failed ───────▶ Disconnected   (event back at the front)
//! ```
//!
//! The backlog is always fully flushed before live events are written again,
//! so delivery order matches enqueue order across any number of reconnects.
//!
//! [`FileWorker`] is the simpler file variant: encode, append, log failures
//! and move on.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWrite;
use tracing::{debug, error, info, instrument, warn};

use calltrace_core::{Encoder, Event, Format};

use crate::backlog::Backlog;
use crate::backoff::Backoff;
use crate::config::{BackoffConfig, TraceConfig};
use crate::error::{DeliveryError, DeliveryResult, DialError};
use crate::logger::EventQueue;
use crate::sink::{Dialer, write_message};
use crate::stats::DeliveryStats;

/// Connection state of a [`DeliveryWorker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    DrainingBacklog,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::DrainingBacklog => "draining_backlog",
        };
        f.write_str(name)
    }
}

/// Tunables for a [`DeliveryWorker`]
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    pub backlog_capacity: usize,
    pub backoff: BackoffConfig,
    pub dial_timeout: Duration,
    pub progress_every: u64,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self::from(&TraceConfig::default())
    }
}

impl From<&TraceConfig> for WorkerOptions {
    fn from(config: &TraceConfig) -> Self {
        Self {
            backlog_capacity: config.backlog_capacity,
            backoff: config.backoff,
            dial_timeout: config.dial_timeout,
            progress_every: config.progress_every,
        }
    }
}

/// Background task delivering events to a stream destination
pub struct DeliveryWorker<D: Dialer> {
    queue: EventQueue,
    queue_closed: bool,
    dialer: D,
    conn: Option<D::Conn>,
    encoder: Encoder,
    backlog: Backlog,
    backoff: Backoff,
    state: ConnectionState,
    dial_timeout: Duration,
    progress_every: u64,
    stats: Arc<DeliveryStats>,
}

impl<D: Dialer> DeliveryWorker<D> {
    pub fn new(queue: EventQueue, dialer: D, format: Format, options: WorkerOptions) -> Self {
        let stats = queue.stats();
        Self {
            queue,
            queue_closed: false,
            dialer,
            conn: None,
            encoder: Encoder::new(format),
            backlog: Backlog::new(options.backlog_capacity),
            backoff: Backoff::new(options.backoff),
            state: ConnectionState::Disconnected,
            dial_timeout: options.dial_timeout,
            progress_every: options.progress_every,
            stats,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn backlog(&self) -> &Backlog {
        &self.backlog
    }

    /// Run until the queue is closed and nothing is left to deliver
    #[instrument(skip(self), fields(destination = %self.dialer.describe()))]
    pub async fn run(mut self) {
        info!("Delivery worker started");
        while self.step().await {}
        info!(sent = self.stats.snapshot().sent, "Delivery worker stopped");
    }

    /// Perform one state transition
    ///
    /// Returns `false` once the worker has nothing left to do.
    pub async fn step(&mut self) -> bool {
        let next = match self.state {
            ConnectionState::Disconnected => {
                if self.queue_closed && self.backlog.is_empty() {
                    return false;
                }
                ConnectionState::Connecting
            }
            ConnectionState::Connecting => self.connect().await,
            ConnectionState::DrainingBacklog => self.drain_backlog().await,
            ConnectionState::Connected => match self.queue.recv().await {
                Some(event) => self.deliver(event).await,
                None => {
                    self.queue_closed = true;
                    return false;
                }
            },
        };
        if next != self.state {
            debug!(from = %self.state, to = %next, "Connection state change");
        }
        self.state = next;
        true
    }

    async fn connect(&mut self) -> ConnectionState {
        let result = match tokio::time::timeout(self.dial_timeout, self.dialer.dial()).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(DialError::Io(e)),
            Err(_) => Err(DialError::Timeout(self.dial_timeout)),
        };

        match result {
            Ok(conn) => {
                self.backoff.reset();
                self.stats.record_connection();
                self.conn = Some(conn);
                info!(
                    destination = %self.dialer.describe(),
                    backlog = self.backlog.len(),
                    "Trace connection established"
                );
                if self.backlog.is_empty() {
                    ConnectionState::Connected
                } else {
                    ConnectionState::DrainingBacklog
                }
            }
            Err(err) => {
                let delay = self.backoff.next_delay();
                warn!(
                    destination = %self.dialer.describe(),
                    error = %err,
                    retry_in = ?delay,
                    "Trace connection failed"
                );
                self.buffer_for(delay).await;
                ConnectionState::Disconnected
            }
        }
    }

    /// Wait out a backoff delay, moving live events into the backlog
    async fn buffer_for(&mut self, delay: Duration) {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        let mut buffered = 0usize;
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                event = self.queue.recv(), if !self.queue_closed => match event {
                    Some(event) => {
                        self.push_backlog(event);
                        buffered += 1;
                    }
                    None => self.queue_closed = true,
                },
            }
        }

        if buffered > 0 {
            info!(
                buffered,
                backlog = self.backlog.len(),
                "Buffered events during connection failure"
            );
        }
    }

    async fn drain_backlog(&mut self) -> ConnectionState {
        let Some(conn) = self.conn.as_mut() else {
            return ConnectionState::Disconnected;
        };

        let total = self.backlog.len();
        while let Some(event) = self.backlog.front() {
            match transmit(&self.encoder, conn, event).await {
                Ok(()) => {
                    self.backlog.pop_front();
                    report_sent(&self.stats, self.progress_every);
                }
                Err(DeliveryError::Encode(err)) => {
                    error!(event = %event.name, error = %err, "Dropping backlogged event that failed to encode");
                    self.stats.record_encode_failure();
                    self.backlog.pop_front();
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        remaining = self.backlog.len(),
                        "Failed to write backlogged event, reconnecting"
                    );
                    self.stats.record_write_failure();
                    self.conn = None;
                    return ConnectionState::Disconnected;
                }
            }
        }

        info!(flushed = total, "Backlog flushed");
        ConnectionState::Connected
    }

    async fn deliver(&mut self, event: Event) -> ConnectionState {
        let Some(conn) = self.conn.as_mut() else {
            self.return_to_backlog(event);
            return ConnectionState::Disconnected;
        };

        match transmit(&self.encoder, conn, &event).await {
            Ok(()) => {
                report_sent(&self.stats, self.progress_every);
                ConnectionState::Connected
            }
            Err(DeliveryError::Encode(err)) => {
                error!(event = %event.name, error = %err, "Dropping event that failed to encode");
                self.stats.record_encode_failure();
                ConnectionState::Connected
            }
            Err(err) => {
                warn!(error = %err, event = %event.name, "Failed to write event, reconnecting");
                self.stats.record_write_failure();
                self.conn = None;
                self.return_to_backlog(event);
                ConnectionState::Disconnected
            }
        }
    }

    fn push_backlog(&mut self, event: Event) {
        self.stats.record_backlogged();
        let evicted = self.backlog.push(event);
        if evicted > 0 {
            self.stats.record_evicted(evicted);
            warn!(
                evicted,
                retained = self.backlog.len(),
                "Event backlog overflow, dropped oldest events"
            );
        }
    }

    fn return_to_backlog(&mut self, event: Event) {
        if self.backlog.push_front(event) > 0 {
            self.stats.record_evicted(1);
            warn!("Event backlog full, dropped failed event");
        } else {
            self.stats.record_backlogged();
        }
    }
}

/// Encode one event and write it as a single message
async fn transmit<W>(encoder: &Encoder, writer: &mut W, event: &Event) -> DeliveryResult<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let message = encoder.encode(event)?;
    write_message(writer, &message).await?;
    Ok(())
}

fn report_sent(stats: &DeliveryStats, progress_every: u64) {
    let sent = stats.record_sent();
    if progress_every > 0 && sent % progress_every == 0 {
        info!(sent, "Sent events to collector");
    }
}

/// Background task appending events to a file
///
/// Write failures are logged and counted; the event is lost and the worker
/// moves on to the next one.
pub struct FileWorker<W> {
    queue: EventQueue,
    writer: W,
    encoder: Encoder,
    stats: Arc<DeliveryStats>,
    progress_every: u64,
}

impl<W: AsyncWrite + Unpin + Send> FileWorker<W> {
    pub fn new(queue: EventQueue, writer: W, format: Format) -> Self {
        let stats = queue.stats();
        Self {
            queue,
            writer,
            encoder: Encoder::new(format),
            stats,
            progress_every: TraceConfig::default().progress_every,
        }
    }

    pub fn with_progress_every(mut self, progress_every: u64) -> Self {
        self.progress_every = progress_every;
        self
    }

    /// Run until every logger handle is dropped
    pub async fn run(mut self) {
        info!("File delivery worker started");
        while let Some(event) = self.queue.recv().await {
            match transmit(&self.encoder, &mut self.writer, &event).await {
                Ok(()) => report_sent(&self.stats, self.progress_every),
                Err(DeliveryError::Encode(err)) => {
                    error!(event = %event.name, error = %err, "Dropping event that failed to encode");
                    self.stats.record_encode_failure();
                }
                Err(err) => {
                    error!(error = %err, event = %event.name, "Failed to write to log file");
                    self.stats.record_write_failure();
                }
            }
        }
        info!(sent = self.stats.snapshot().sent, "File delivery worker stopped");
    }
}

/// Consume and discard events when delivery is disabled
pub async fn discard(mut queue: EventQueue) {
    while queue.recv().await.is_some() {}
}
