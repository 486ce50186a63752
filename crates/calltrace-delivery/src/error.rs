//! Delivery error types
//!
//! Only [`ConfigurationError`] ever reaches the host, and only at startup.
//! Everything else is handled inside the delivery worker.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub use calltrace_core::EncodeError;

/// Unified delivery error type
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Enqueue error: {0}")]
    Enqueue(#[from] EnqueueError),

    #[error("Dial error: {0}")]
    Dial(#[from] DialError),

    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// An event could not be placed on the queue
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnqueueError {
    /// The queue is at capacity; the event was dropped
    #[error("Event queue full, dropped event {event}")]
    Full { event: String },

    /// The delivery side has shut down
    #[error("Event queue closed, dropped event {event}")]
    Closed { event: String },
}

/// Establishing a connection to the destination failed
#[derive(Debug, Error)]
pub enum DialError {
    #[error("Dial timed out after {0:?}")]
    Timeout(Duration),

    #[error("Dial failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Writing an encoded message to the sink failed
#[derive(Debug, Error)]
#[error("Write failed: {0}")]
pub struct WriteError(#[from] pub std::io::Error);

/// The configured sink cannot be set up
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Could not open log file {}: {source}", .path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unix domain sockets are not supported on this platform: {}", .0.display())]
    UnixUnsupported(PathBuf),

    #[error("Could not start delivery worker: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Result type for delivery operations
pub type DeliveryResult<T> = Result<T, DeliveryError>;
