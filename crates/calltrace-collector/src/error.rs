//! Collector error types

use std::io;

use thiserror::Error;

/// Errors that stop the collector
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid listen address: {0:?}")]
    InvalidAddress(String),

    #[error("Unix domain sockets are not supported on this platform: {0}")]
    UnixUnsupported(String),
}

/// Errors reading one connection's stream
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Read failed: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid JSON message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid CBOR message: {0}")]
    Cbor(String),

    /// Well-formed message without the `pair(call, pair(results))` shape
    #[error("Message is not an event term")]
    NotAnEvent,
}

impl From<ciborium::de::Error<io::Error>> for DecodeError {
    fn from(err: ciborium::de::Error<io::Error>) -> Self {
        DecodeError::Cbor(err.to_string())
    }
}

impl DecodeError {
    /// Whether the stream can continue after this error
    ///
    /// Bad JSON or text lines are self-delimiting; a bad CBOR item loses
    /// framing for everything after it.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DecodeError::Json(_) | DecodeError::NotAnEvent)
    }
}
