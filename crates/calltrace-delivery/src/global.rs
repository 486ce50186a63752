//! Process-wide logger for generated instrumentation
//!
//! Instrumented code usually cannot thread a [`Logger`] through every call,
//! so a single instance can be installed here. Every free function is a
//! no-op until then, and [`id`] returns 0.

use std::sync::OnceLock;

use calltrace_core::{Event, Value};

use crate::config::TraceConfig;
use crate::error::ConfigurationError;
use crate::logger::Logger;

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Install a logger; gives it back if one is already installed
pub fn install(logger: Logger) -> Result<(), Logger> {
    LOGGER.set(logger)
}

/// The installed logger, if any
pub fn get() -> Option<&'static Logger> {
    LOGGER.get()
}

/// Start delivery from the environment and install the resulting logger
///
/// Returns the already installed logger when called more than once.
pub fn init_from_env() -> Result<&'static Logger, ConfigurationError> {
    if let Some(logger) = LOGGER.get() {
        return Ok(logger);
    }
    let logger = crate::start(TraceConfig::from_env())?;
    // A concurrent caller may have won; its logger is the one kept.
    Ok(LOGGER.get_or_init(|| logger))
}

pub fn id() -> u64 {
    LOGGER.get().map_or(0, Logger::id)
}

pub fn log_enter(id: u64, name: &str, args: &[Value<'_>]) {
    if let Some(logger) = LOGGER.get() {
        logger.log_enter(id, name, args);
    }
}

pub fn log_leave(id: u64, name: &str, args: &[Value<'_>], results: &[Value<'_>]) {
    if let Some(logger) = LOGGER.get() {
        logger.log_leave(id, name, args, results);
    }
}

pub fn log(event: Event) {
    if let Some(logger) = LOGGER.get() {
        logger.log(event);
    }
}

#[track_caller]
pub fn call_trace() {
    if let Some(logger) = LOGGER.get() {
        logger.call_trace();
    }
}
