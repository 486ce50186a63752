//! Stream decoding
//!
//! Turns one connection's byte stream back into payloads. JSON and text are
//! line delimited; CBOR items are self-delimiting and decoded back to back
//! from an accumulating buffer.

use std::fmt;
use std::io::{self, Cursor};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use calltrace_core::{Event, Format, TimedEvent};

use crate::error::DecodeError;

const READ_CHUNK: usize = 4096;

/// One decoded message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A JSON or CBOR event
    Event(Event),
    /// A line of text or debug output
    Line(String),
}

/// A payload and the connection it arrived on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub peer: String,
    pub payload: Payload,
}

impl Record {
    pub fn event(&self) -> Option<&Event> {
        match &self.payload {
            Payload::Event(event) => Some(event),
            Payload::Line(_) => None,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Event(event) => write!(f, "[{}] {} {}", self.peer, event.timestamp.to_rfc3339(), event),
            Payload::Line(line) => write!(f, "[{}] {}", self.peer, line),
        }
    }
}

/// Decodes successive payloads from a reader
pub struct StreamDecoder<R> {
    reader: BufReader<R>,
    format: Format,
    line: String,
    pending: Vec<u8>,
}

impl<R: AsyncRead + Unpin> StreamDecoder<R> {
    pub fn new(reader: R, format: Format) -> Self {
        Self {
            reader: BufReader::new(reader),
            format,
            line: String::new(),
            pending: Vec::new(),
        }
    }

    /// Next payload, or `None` at a clean end of stream
    pub async fn next(&mut self) -> Result<Option<Payload>, DecodeError> {
        match self.format {
            Format::Json => self.next_json().await,
            Format::Cbor => self.next_cbor().await,
            Format::Text | Format::Debug => Ok(self.next_line().await?.map(Payload::Line)),
        }
    }

    async fn next_line(&mut self) -> Result<Option<String>, DecodeError> {
        self.line.clear();
        if self.reader.read_line(&mut self.line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(self.line.trim_end_matches(['\n', '\r']).to_string()))
    }

    async fn next_json(&mut self) -> Result<Option<Payload>, DecodeError> {
        loop {
            let Some(line) = self.next_line().await? else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }
            let timed: TimedEvent = serde_json::from_str(&line)?;
            return to_payload(timed).map(Some);
        }
    }

    async fn next_cbor(&mut self) -> Result<Option<Payload>, DecodeError> {
        loop {
            if !self.pending.is_empty() {
                let mut cursor = Cursor::new(self.pending.as_slice());
                match ciborium::from_reader::<TimedEvent, _>(&mut cursor) {
                    Ok(timed) => {
                        let used = cursor.position() as usize;
                        self.pending.drain(..used);
                        return to_payload(timed).map(Some);
                    }
                    Err(ciborium::de::Error::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {}
                    Err(e) => return Err(e.into()),
                }
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Err(DecodeError::Cbor(format!(
                    "stream ended inside an item ({} bytes pending)",
                    self.pending.len()
                )));
            }
            self.pending.extend_from_slice(&chunk[..n]);
        }
    }
}

fn to_payload(timed: TimedEvent) -> Result<Payload, DecodeError> {
    timed
        .into_event()
        .map(Payload::Event)
        .ok_or(DecodeError::NotAnEvent)
}
