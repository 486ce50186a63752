//! # calltrace core
//!
//! Event model, value formatting and wire encoders shared by the delivery
//! pipeline and collectors.
//!
//! ## Overview
//!
//! - [`value`]: the closed [`Value`] sum type and its canonical string form
//! - [`event`]: the immutable [`Event`] record
//! - [`wire`]: the tagged term tree used by the JSON and CBOR formats
//! - [`encoder`]: [`Format`] selection and the stateless [`Encoder`]
//! - [`pool`]: scoped scratch buffers for the encoding hot path
//!
//! ## Example
//!
//! ```rust
//! use calltrace_core::{Encoder, Event, Format, Value};
//!
//! let event = Event::leave(1, "parse", &[Value::from("input")], &[Value::from(true)]);
//! let line = Encoder::new(Format::Text).encode(&event).unwrap();
//! assert_eq!(line, b"parse_Leave(1, \"input\") = (1)\n");
//! ```

pub mod encoder;
pub mod error;
pub mod event;
pub mod pool;
pub mod value;
pub mod wire;

pub use encoder::{Encoder, Format};
pub use error::{EncodeError, UnknownFormat};
pub use event::{ENTER_SUFFIX, Event, LEAVE_SUFFIX, TRACE_EVENT_NAME};
pub use pool::{BufferPool, PooledBuffer};
pub use value::{Opaque, Value, format};
pub use wire::{PAIR_FUNCTION_NAME, Term, TermKind, TimedEvent};
