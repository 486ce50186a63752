//! The trace event record

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Suffix appended to a function name for its entry event
pub const ENTER_SUFFIX: &str = "Enter";
/// Suffix appended to a function name for its exit event
pub const LEAVE_SUFFIX: &str = "Leave";
/// Separator between function name and suffix
pub const SEPARATOR: &str = "_";
/// Name of events produced by call-site traces
pub const TRACE_EVENT_NAME: &str = "TRACE";

/// One function entry, exit, or raw log record
///
/// All arguments and results are already formatted; an event carries no
/// type information beyond its strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event name, e.g. `handshake_Enter`
    pub name: String,
    /// Formatted arguments
    pub args: Vec<String>,
    /// Formatted results (empty for entry events)
    pub results: Vec<String>,
    /// When the event was created
    #[serde(rename = "time")]
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an event stamped with the current time
    pub fn new(name: impl Into<String>, args: Vec<String>, results: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
            results,
            timestamp: Utc::now(),
        }
    }

    /// Entry event: `<name>_Enter(id, args...)`
    pub fn enter(id: u64, name: &str, args: &[Value<'_>]) -> Self {
        Self::new(
            format!("{name}{SEPARATOR}{ENTER_SUFFIX}"),
            with_id(id, args),
            Vec::new(),
        )
    }

    /// Exit event: `<name>_Leave(id, args...) = (results...)`
    pub fn leave(id: u64, name: &str, args: &[Value<'_>], results: &[Value<'_>]) -> Self {
        Self::new(
            format!("{name}{SEPARATOR}{LEAVE_SUFFIX}"),
            with_id(id, args),
            results.iter().map(Value::format).collect(),
        )
    }

    /// Call-site trace event carrying a human readable location
    pub fn trace(location: &std::panic::Location<'_>) -> Self {
        Self::new(
            TRACE_EVENT_NAME,
            vec![format!(
                "Called from {}, line {}, column {}\n",
                location.file(),
                location.line(),
                location.column()
            )],
            Vec::new(),
        )
    }

    /// Whether the event carries results
    pub fn has_results(&self) -> bool {
        !self.results.is_empty()
    }

    /// Nanoseconds since the Unix epoch
    ///
    /// Saturates for timestamps outside the representable range
    /// (roughly years 1677 to 2262).
    pub fn unix_nanos(&self) -> i64 {
        self.timestamp
            .timestamp_nanos_opt()
            .unwrap_or(if self.timestamp.timestamp() < 0 { i64::MIN } else { i64::MAX })
    }
}

fn with_id(id: u64, args: &[Value<'_>]) -> Vec<String> {
    let mut formatted = Vec::with_capacity(args.len() + 1);
    formatted.push(id.to_string());
    formatted.extend(args.iter().map(Value::format));
    formatted
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.args.join(", "))?;
        if self.has_results() {
            write!(f, " = ({})", self.results.join(", "))?;
        }
        Ok(())
    }
}
