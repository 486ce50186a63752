//! Wire encoders
//!
//! An [`Encoder`] turns one [`Event`] into one self-contained message. Calls
//! share no mutable state beyond the scratch buffer pool, so the bytes
//! returned are independent of every other call.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EncodeError, UnknownFormat};
use crate::event::Event;
use crate::pool::BufferPool;
use crate::wire::TimedEvent;

/// Wire format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum Format {
    /// Newline-delimited JSON term trees
    #[default]
    Json,
    /// Concatenated CBOR term trees
    Cbor,
    /// One human readable line per event
    Text,
    /// Pretty `Debug` dump, not machine readable
    Debug,
}

impl Format {
    pub const ALL: [Format; 4] = [Format::Json, Format::Cbor, Format::Text, Format::Debug];

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Cbor => "cbor",
            Format::Text => "text",
            Format::Debug => "debug",
        }
    }

    /// Parse a format name, falling back to [`Format::Json`]
    pub fn parse_lossy(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Format::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

impl From<String> for Format {
    fn from(name: String) -> Self {
        Format::parse_lossy(&name)
    }
}

impl From<Format> for &'static str {
    fn from(format: Format) -> Self {
        format.as_str()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stateless event encoder for one wire format
#[derive(Debug, Default)]
pub struct Encoder {
    format: Format,
    pool: BufferPool,
}

impl Encoder {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            pool: BufferPool::default(),
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Encode one event into a standalone message
    pub fn encode(&self, event: &Event) -> Result<Vec<u8>, EncodeError> {
        match self.format {
            Format::Text => Ok(format!("{event}\n").into_bytes()),
            Format::Debug => Ok(format!("{event:#?}\n").into_bytes()),
            Format::Json => {
                let mut buf = self.pool.get();
                serde_json::to_writer(&mut *buf, &TimedEvent::from_event(event))?;
                buf.push(b'\n');
                Ok(buf.to_message())
            }
            Format::Cbor => {
                let mut buf = self.pool.get();
                ciborium::into_writer(&TimedEvent::from_event(event), &mut *buf)?;
                Ok(buf.to_message())
            }
        }
    }
}
