//! # Calltrace Delivery
//!
//! Non-blocking emission and resilient delivery of trace events.
//!
//! Instrumented code talks to a [`Logger`]. Every call is synchronous and
//! never blocks: events go onto a bounded queue and a full queue drops the
//! event with a diagnostic. A single background worker owns the destination
//! and delivers events in enqueue order.
//!
//! ## Destinations
//!
//! - **TCP** (`host:port`): reconnects with exponential backoff, keeps
//!   unsendable events in a bounded [`Backlog`] and replays it before any
//!   newer event.
//! - **Unix socket** (`unix:/path` or an existing socket path): same
//!   delivery guarantees as TCP.
//! - **File** (any other path): opened once for appending.
//! - **None**: events are accepted and discarded.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use calltrace_delivery::{TraceConfig, start};
//! use calltrace_core::{Format, Value};
//!
//! let logger = start(
//!     TraceConfig::default()
//!         .with_destination("127.0.0.1:9999")
//!         .with_format(Format::Json),
//! )?;
//!
//! let id = logger.id();
//! logger.log_enter(id, "parse", &[Value::from("input")]);
//! logger.log_leave(id, "parse", &[Value::from("input")], &[Value::from(1)]);
//! # Ok::<(), calltrace_delivery::ConfigurationError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`logger`]: producer handle and the event queue
//! - [`worker`]: the connection state machine and the file worker
//! - [`backlog`]: bounded ordered store for undeliverable events
//! - [`backoff`]: reconnect delay policy
//! - [`sink`]: dialers and the append-only file
//! - [`destination`]: destination string resolution
//! - [`config`]: [`TraceConfig`] and environment loading
//! - [`global`]: optional process-wide logger
//! - [`stats`]: delivery counters

pub mod backlog;
pub mod backoff;
pub mod config;
pub mod destination;
pub mod error;
pub mod global;
pub mod logger;
pub mod sink;
pub mod stats;
pub mod worker;

pub use backlog::Backlog;
pub use backoff::Backoff;
pub use config::{BackoffConfig, FORMAT_ENV, TARGET_ENV, TraceConfig};
pub use destination::{Destination, UNIX_PREFIX, is_socket_address};
pub use error::{
    ConfigurationError, DeliveryError, DeliveryResult, DialError, EncodeError, EnqueueError,
    WriteError,
};
pub use logger::{EventQueue, Logger};
pub use sink::{Dialer, TcpDialer};
#[cfg(unix)]
pub use sink::UnixDialer;
pub use stats::{DeliveryStats, StatsSnapshot};
pub use worker::{ConnectionState, DeliveryWorker, FileWorker, WorkerOptions};

use std::future::Future;

use tracing::{info, warn};

/// Name of the thread hosting the worker outside a Tokio runtime
pub const WORKER_THREAD_NAME: &str = "calltrace-delivery";

/// Resolve the destination, start its worker and return the producer handle
///
/// Only sink setup can fail; once this returns, delivery problems never
/// surface to the caller.
pub fn start(config: TraceConfig) -> Result<Logger, ConfigurationError> {
    let destination = config.resolve_destination();
    let capacity = config.queue_capacity_for(destination.as_ref());
    let socket_mode = destination.as_ref().is_some_and(Destination::is_socket);
    let (logger, queue) = Logger::with_mode(config.format, capacity, socket_mode);

    match destination {
        None => {
            warn!("No trace destination configured, events will be discarded");
            spawn_worker(worker::discard(queue))?;
        }
        Some(Destination::File(path)) => {
            let file = sink::open_file_sink(&path)?;
            let worker = FileWorker::new(queue, file, config.format)
                .with_progress_every(config.progress_every);
            info!(path = %path.display(), format = %config.format, "Logging trace events to file");
            spawn_worker(worker.run())?;
        }
        Some(Destination::Tcp(addr)) => {
            let dialer = TcpDialer::new(addr.clone(), config.keepalive);
            let worker =
                DeliveryWorker::new(queue, dialer, config.format, WorkerOptions::from(&config));
            info!(%addr, format = %config.format, queue_capacity = capacity, "Streaming trace events over TCP");
            spawn_worker(worker.run())?;
        }
        #[cfg(unix)]
        Some(Destination::Unix(path)) => {
            info!(path = %path.display(), format = %config.format, "Streaming trace events over Unix socket");
            let dialer = UnixDialer::new(path);
            let worker =
                DeliveryWorker::new(queue, dialer, config.format, WorkerOptions::from(&config));
            spawn_worker(worker.run())?;
        }
        #[cfg(not(unix))]
        Some(Destination::Unix(path)) => {
            return Err(ConfigurationError::UnixUnsupported(path));
        }
    }

    Ok(logger)
}

/// Run a worker on the current runtime, or on a dedicated thread
fn spawn_worker<F>(worker: F) -> Result<(), ConfigurationError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn(worker);
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ConfigurationError::Runtime)?;
    std::thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || runtime.block_on(worker))
        .map_err(ConfigurationError::Runtime)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_without_destination_outside_runtime() {
        let logger = start(TraceConfig::default()).unwrap();
        logger.log(calltrace_core::Event::new("ignored", vec![], vec![]));
        assert_eq!(logger.stats().enqueued, 1);
    }

    #[test]
    fn test_start_unwritable_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("trace.log");
        let config = TraceConfig::default().with_destination(path.to_string_lossy());
        assert!(matches!(start(config), Err(ConfigurationError::OpenFile { .. })));
    }

    #[tokio::test]
    async fn test_start_inside_runtime_uses_it() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let logger = start(TraceConfig::default().with_destination(addr)).unwrap();
        assert_eq!(logger.format(), calltrace_core::Format::Json);

        let (_conn, _) = listener.accept().await.unwrap();
    }
}
