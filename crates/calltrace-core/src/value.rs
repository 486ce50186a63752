//! Producer values and their canonical string form
//!
//! Instrumented code hands the emitter a slice of [`Value`]s. Each one is
//! rendered exactly once by [`Value::format`] and from then on travels as a
//! plain string. The set of categories is closed; anything outside it is
//! described by an [`Opaque`] kind/length/element descriptor.

use std::fmt;

/// A value captured at a trace point
#[derive(Clone, Copy)]
pub enum Value<'a> {
    /// Absent value (`None`, null pointer)
    Nil,
    /// Signed integer of any width
    Int(i64),
    /// Unsigned integer of any width
    Uint(u64),
    /// Double precision float
    Float(f64),
    /// Single precision float, formatted at its own precision
    Float32(f32),
    /// Text, rendered quoted
    Str(&'a str),
    /// Boolean, rendered as `1` / `0`
    Bool(bool),
    /// Variable length byte sequence
    Bytes(&'a [u8]),
    /// Sequence of byte sequences, rendered `|`-separated
    ByteSeqs(&'a [&'a [u8]]),
    /// Fixed-size byte array
    Array(&'a [u8]),
    /// Fixed-size array of 32-bit words, rendered as their little-endian bytes
    Words(&'a [u32]),
    /// An error, rendered as its quoted message
    Error(&'a dyn fmt::Display),
    /// Anything else
    Opaque(Opaque<'a>),
}

/// Descriptor for values outside the supported categories
///
/// Rendered as `<kind>[<len>]<elem>`, e.g. `[3]i32` for a slice or
/// `map[2]` for a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opaque<'a> {
    pub kind: &'a str,
    pub len: usize,
    pub elem: &'a str,
}

impl<'a> Opaque<'a> {
    pub const fn new(kind: &'a str, len: usize, elem: &'a str) -> Self {
        Self { kind, len, elem }
    }

    /// A slice or array of `len` elements of type `elem`
    pub const fn sequence(len: usize, elem: &'a str) -> Self {
        Self::new("", len, elem)
    }

    /// A map with `len` entries
    pub const fn map(len: usize) -> Self {
        Self::new("map", len, "")
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Error(err) => f.debug_tuple("Error").field(&err.to_string()).finish(),
            Value::Opaque(opaque) => f.debug_tuple("Opaque").field(opaque).finish(),
            other => f.write_str(&other.format()),
        }
    }
}

impl Value<'_> {
    /// Render the value to its canonical string
    ///
    /// Total: every value produces some string.
    pub fn format(&self) -> String {
        match *self {
            Value::Nil => String::new(),
            Value::Int(v) => v.to_string(),
            Value::Uint(v) => v.to_string(),
            Value::Float(v) => format!("{:.6}", v),
            Value::Float32(v) => format!("{:.6}", v),
            Value::Str(s) => format!("{:?}", s),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => "0".to_string(),
            Value::Bytes(bytes) | Value::Array(bytes) => {
                let mut out = String::with_capacity(2 + bytes.len() * 2);
                out.push_str("0x");
                push_hex(&mut out, bytes);
                out
            }
            Value::ByteSeqs(seqs) => {
                let total: usize = seqs.iter().map(|s| s.len() * 2 + 1).sum();
                let mut out = String::with_capacity(2 + total);
                out.push_str("0x");
                for (i, seq) in seqs.iter().enumerate() {
                    if i > 0 {
                        out.push('|');
                    }
                    push_hex(&mut out, seq);
                }
                out
            }
            Value::Words(words) => {
                let mut out = String::with_capacity(2 + words.len() * 8);
                out.push_str("0x");
                for word in words {
                    push_hex(&mut out, &word.to_le_bytes());
                }
                out
            }
            Value::Error(err) => format!("{:?}", err.to_string()),
            Value::Opaque(Opaque { kind, len, elem }) => format!("{kind}[{len}]{elem}"),
        }
    }
}

fn push_hex(out: &mut String, bytes: &[u8]) {
    if !bytes.is_empty() {
        out.push_str(&hex::encode(bytes));
    }
}

/// Format a value; shorthand for `value.into().format()`
pub fn format<'a>(value: impl Into<Value<'a>>) -> String {
    value.into().format()
}

macro_rules! impl_from_int {
    ($variant:ident as $wide:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Value<'_> {
                fn from(v: $t) -> Self {
                    Value::$variant(v as $wide)
                }
            }
        )*
    };
}

impl_from_int!(Int as i64: i8, i16, i32, i64, isize);
impl_from_int!(Uint as u64: u8, u16, u32, u64, usize);

impl From<f64> for Value<'_> {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value<'_> {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<bool> for Value<'_> {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::Str(v)
    }
}

impl<'a> From<&'a String> for Value<'a> {
    fn from(v: &'a String) -> Self {
        Value::Str(v.as_str())
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    fn from(v: &'a [u8]) -> Self {
        Value::Bytes(v)
    }
}

impl<'a> From<&'a Vec<u8>> for Value<'a> {
    fn from(v: &'a Vec<u8>) -> Self {
        Value::Bytes(v.as_slice())
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Value<'a> {
    fn from(v: &'a [u8; N]) -> Self {
        Value::Array(v.as_slice())
    }
}

impl<'a, const N: usize> From<&'a [u32; N]> for Value<'a> {
    fn from(v: &'a [u32; N]) -> Self {
        Value::Words(v.as_slice())
    }
}

impl<'a> From<&'a [&'a [u8]]> for Value<'a> {
    fn from(v: &'a [&'a [u8]]) -> Self {
        Value::ByteSeqs(v)
    }
}

impl<'a> From<Opaque<'a>> for Value<'a> {
    fn from(v: Opaque<'a>) -> Self {
        Value::Opaque(v)
    }
}

impl<'a, T: Into<Value<'a>>> From<Option<T>> for Value<'a> {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}
