//! Diagnostics setup for calltrace processes
//!
//! The delivery pipeline reports its own health (connection changes, drops,
//! backlog overflow) through `tracing`. This crate installs a subscriber for
//! those diagnostics: JSONL or pretty console output, optional rotated file
//! output, and an `EnvFilter` that `RUST_LOG` overrides.
//!
//! Diagnostics go to stderr by default so they never mix with trace output a
//! program prints on stdout.
//!
//! # Quick Start
//!
//! ```ignore
//! use calltrace_logging::{DiagnosticsBuilder, LogConfig};
//!
//! // JSONL to stderr
//! DiagnosticsBuilder::new().init();
//!
//! // Pretty output while developing
//! DiagnosticsBuilder::new()
//!     .with_config(LogConfig::development())
//!     .init();
//! ```

pub mod config;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use tracing_appender::non_blocking::WorkerGuard;

use std::fs::{self, File};

use thiserror::Error;
use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Diagnostics setup errors
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log file: {0}")]
    File(#[from] std::io::Error),

    #[error("Failed to create rolling appender: {0}")]
    Appender(#[from] InitError),

    #[error("Global subscriber already set: {0}")]
    Init(#[from] TryInitError),
}

/// Builder for the diagnostics subscriber
pub struct DiagnosticsBuilder {
    config: LogConfig,
}

impl DiagnosticsBuilder {
    /// Builder with the default configuration (JSONL to stderr)
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Human readable console output
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.config.console.pretty = pretty;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Install the subscriber globally
    ///
    /// The returned guard flushes file output when dropped and must be kept
    /// alive for the life of the program.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.default_level));

        let mut layers: Vec<BoxedLayer> = Vec::new();
        if self.config.console.enabled {
            layers.push(console_layer(&self.config));
        }

        let mut guard = None;
        if let Some(file_config) = &self.config.file {
            let (writer, file_guard) = create_file_writer(file_config)?;
            layers.push(jsonl_layer(&self.config.jsonl, writer));
            guard = Some(file_guard);
        }

        Registry::default().with(layers).with(env_filter).try_init()?;
        Ok(guard)
    }

    /// Install the subscriber, reporting failure on stderr
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Warning: Failed to initialize diagnostics: {}", e);
                None
            }
        }
    }
}

impl Default for DiagnosticsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn console_layer(config: &LogConfig) -> BoxedLayer {
    let console = &config.console;
    match (console.pretty, console.stderr) {
        (true, true) => fmt::layer()
            .with_ansi(console.ansi)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        (true, false) => fmt::layer()
            .with_ansi(console.ansi)
            .with_target(true)
            .boxed(),
        (false, true) => jsonl_layer(&config.jsonl, std::io::stderr),
        (false, false) => jsonl_layer(&config.jsonl, std::io::stdout),
    }
}

/// JSONL formatting layer writing to `writer`
pub fn jsonl_layer<W>(jsonl: &JsonlConfig, writer: W) -> BoxedLayer
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(jsonl.include_spans)
        .flatten_event(jsonl.flatten_events)
        .with_file(jsonl.include_location)
        .with_line_number(jsonl.include_location)
        .with_thread_ids(jsonl.include_thread_info)
        .with_thread_names(jsonl.include_thread_info)
        .with_writer(writer)
        .boxed()
}

/// Non-blocking file writer; `Never` truncates a single file, the others rotate
fn create_file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    let rotation = match config.rotation {
        RotationStrategy::Never => {
            fs::create_dir_all(&config.directory)?;
            let path = config.directory.join(format!("{}.log", config.prefix));
            return Ok(tracing_appender::non_blocking(File::create(path)?));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };
    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&config.prefix)
        .filename_suffix("log")
        .build(&config.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize with default settings (JSONL to stderr)
pub fn init_default() {
    DiagnosticsBuilder::new().init();
}

/// Initialize for development (verbose, pretty console output)
pub fn init_development() {
    DiagnosticsBuilder::new()
        .with_config(LogConfig::development())
        .init();
}

/// Initialize for tests; safe to call from every test
pub fn init_testing() {
    let _ = DiagnosticsBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creation() {
        let builder = DiagnosticsBuilder::new();
        assert_eq!(builder.config().default_level, "info");
        assert!(!builder.config().console.pretty);
    }

    #[test]
    fn test_builder_with_config() {
        let builder = DiagnosticsBuilder::new().with_config(LogConfig::development());
        assert_eq!(builder.config().default_level, "debug");
        assert!(builder.config().console.pretty);
    }

    #[test]
    fn test_builder_setters() {
        let builder = DiagnosticsBuilder::new()
            .with_level("trace")
            .with_console(false)
            .with_pretty(true)
            .with_file_output(FileConfig::new("/tmp/calltrace"));
        let config = builder.config();
        assert_eq!(config.default_level, "trace");
        assert!(!config.console.enabled);
        assert!(config.console.pretty);
        assert!(config.file.is_some());
    }

    #[test]
    fn test_file_writer_never_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig::new(dir.path().join("nested"))
            .with_prefix("unit")
            .with_rotation(RotationStrategy::Never);
        let (_writer, _guard) = create_file_writer(&config).unwrap();
        assert!(dir.path().join("nested").join("unit.log").exists());
    }

    #[test]
    fn test_init_testing_is_idempotent() {
        init_testing();
        init_testing();
    }
}
