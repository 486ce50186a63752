//! # Calltrace Collector
//!
//! Reference receiver for calltrace event streams.
//!
//! A [`Collector`] binds a TCP address or Unix socket path, accepts any
//! number of connections and decodes each stream in the configured format:
//!
//! - `json`: one term tree per line, decoded back into an
//!   [`Event`](calltrace_core::Event)
//! - `cbor`: concatenated term trees, decoded back into events
//! - `text` / `debug`: raw lines
//!
//! Decoded [`Record`]s are forwarded on a channel. The
//! `calltrace-collector` binary prints them.
//!
//! ```rust,ignore
//! let collector = Collector::bind("127.0.0.1:8080", Format::Json).await?;
//! let (tx, mut rx) = tokio::sync::mpsc::channel(1024);
//! tokio::spawn(collector.run(tx));
//! while let Some(record) = rx.recv().await {
//!     println!("{record}");
//! }
//! ```

pub mod decode;
pub mod error;
pub mod server;

pub use decode::{Payload, Record, StreamDecoder};
pub use error::{CollectorError, DecodeError};
pub use server::{Collector, handle_connection};
