//! Configuration for the delivery pipeline

use std::time::Duration;

use serde::{Deserialize, Serialize};

use calltrace_core::Format;

use crate::destination::Destination;

/// Environment variable naming the destination
pub const TARGET_ENV: &str = "CALLTRACE_LOG_TARGET";
/// Environment variable naming the wire format
pub const FORMAT_ENV: &str = "CALLTRACE_LOG_FORMAT";

/// Main delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// File path, `host:port` or Unix socket path; `None` disables delivery
    pub destination: Option<String>,
    /// Wire format
    pub format: Format,
    /// Queue capacity for file or disabled destinations
    pub file_queue_capacity: usize,
    /// Queue capacity for socket destinations (absorbs network latency)
    pub socket_queue_capacity: usize,
    /// Maximum events held while the destination is unreachable
    pub backlog_capacity: usize,
    /// Reconnect backoff
    pub backoff: BackoffConfig,
    /// Upper bound on a single dial attempt
    pub dial_timeout: Duration,
    /// TCP keep-alive period
    pub keepalive: Duration,
    /// Log progress every this many delivered events (0 disables)
    pub progress_every: u64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            destination: None,
            format: Format::Json,
            file_queue_capacity: 10_000,
            socket_queue_capacity: 100_000,
            backlog_capacity: 10_000,
            backoff: BackoffConfig::default(),
            dial_timeout: Duration::from_secs(5),
            keepalive: Duration::from_secs(30),
            progress_every: 1_000,
        }
    }
}

impl TraceConfig {
    /// Create config from `CALLTRACE_LOG_TARGET` / `CALLTRACE_LOG_FORMAT`
    pub fn from_env() -> Self {
        Self {
            destination: std::env::var(TARGET_ENV).ok().filter(|t| !t.trim().is_empty()),
            format: std::env::var(FORMAT_ENV)
                .map(|f| Format::parse_lossy(&f))
                .unwrap_or_default(),
            ..Self::default()
        }
    }

    /// Set the destination
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Set the wire format
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Set the backlog capacity
    pub fn with_backlog_capacity(mut self, capacity: usize) -> Self {
        self.backlog_capacity = capacity.max(1);
        self
    }

    /// Set the reconnect backoff
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff = BackoffConfig { base, max };
        self
    }

    /// Resolved destination, if any
    pub fn resolve_destination(&self) -> Option<Destination> {
        self.destination.as_deref().and_then(Destination::parse)
    }

    /// Queue capacity appropriate for a destination
    pub fn queue_capacity_for(&self, destination: Option<&Destination>) -> usize {
        match destination {
            Some(d) if d.is_socket() => self.socket_queue_capacity,
            _ => self.file_queue_capacity,
        }
        .max(1)
    }
}

/// Exponential reconnect backoff bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// First delay, and the delay after any successful dial
    pub base: Duration,
    /// Cap on the delay
    pub max: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TraceConfig::default();
        assert!(config.destination.is_none());
        assert_eq!(config.format, Format::Json);
        assert_eq!(config.backlog_capacity, 10_000);
        assert_eq!(config.backoff.base, Duration::from_secs(1));
        assert_eq!(config.backoff.max, Duration::from_secs(30));
        assert_eq!(config.dial_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_queue_capacity_by_destination() {
        let config = TraceConfig::default();
        let tcp = Destination::Tcp("localhost:9000".into());
        let file = Destination::File("trace.log".into());
        assert_eq!(config.queue_capacity_for(Some(&tcp)), 100_000);
        assert_eq!(config.queue_capacity_for(Some(&file)), 10_000);
        assert_eq!(config.queue_capacity_for(None), 10_000);
    }

    #[test]
    fn test_builder_setters() {
        let config = TraceConfig::default()
            .with_destination("localhost:7000")
            .with_format(Format::Cbor)
            .with_backlog_capacity(0);
        assert_eq!(
            config.resolve_destination(),
            Some(Destination::Tcp("localhost:7000".into()))
        );
        assert_eq!(config.format, Format::Cbor);
        assert_eq!(config.backlog_capacity, 1);
    }

    #[test]
    fn test_deserialize_partial_with_unknown_format() {
        let config: TraceConfig =
            serde_json::from_str(r#"{"destination": "/tmp/trace.log", "format": "xml"}"#).unwrap();
        assert_eq!(config.format, Format::Json);
        assert_eq!(config.socket_queue_capacity, 100_000);
    }
}
