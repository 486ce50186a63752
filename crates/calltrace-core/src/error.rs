//! Error types for event encoding

use thiserror::Error;

/// Failure to turn one event into a wire message
///
/// Never fatal: the delivery path logs it and drops the single event.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CBOR encoding failed: {0}")]
    Cbor(String),
}

impl From<ciborium::ser::Error<std::io::Error>> for EncodeError {
    fn from(err: ciborium::ser::Error<std::io::Error>) -> Self {
        EncodeError::Cbor(err.to_string())
    }
}

/// A format name that matches none of the known wire formats
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown wire format: {0}")]
pub struct UnknownFormat(pub String);
