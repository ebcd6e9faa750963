//! Structured logger
//!
//! - One event = one JSON line with deterministic key ordering
//! - Explicit severity levels
//! - Lines are handed to `tracing`; installing a subscriber is the
//!   application's business

use std::collections::BTreeMap;
use std::fmt;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// High-volume detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structured logger that emits JSON lines through `tracing`
pub struct Logger;

impl Logger {
    /// Log an event with the given severity and fields
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        let line = Self::render(severity, event, fields);
        match severity {
            Severity::Trace => tracing::trace!(target: "astrology", event, "{}", line),
            Severity::Info => tracing::info!(target: "astrology", event, "{}", line),
            Severity::Warn => tracing::warn!(target: "astrology", event, "{}", line),
            Severity::Error => tracing::error!(target: "astrology", event, "{}", line),
        }
    }

    /// Renders one log line.
    ///
    /// Keys come out in alphabetical order. `event` and `severity` are
    /// reserved; caller fields with those names are ignored.
    pub fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut line: BTreeMap<&str, &str> = fields.iter().copied().collect();
        line.insert("event", event);
        line.insert("severity", severity.as_str());
        // A map of strings always serializes.
        serde_json::to_string(&line).unwrap_or_default()
    }

    /// Log at TRACE level
    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    /// Log at INFO level
    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    /// Log at WARN level
    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    /// Log at ERROR level
    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }
}
