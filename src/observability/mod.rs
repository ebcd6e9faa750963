//! Observability subsystem
//!
//! - Structured logging (JSON lines through `tracing`)
//! - Monotonic counters
//! - Typed lifecycle events
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on validation or persistence
//! 3. No background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use astrology::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::ModelRegistered, &[("model", "MeatSalad")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

fn severity_for(event: Event) -> Severity {
    if event.is_failure() {
        Severity::Warn
    } else if event.is_chatty() {
        Severity::Trace
    } else {
        Severity::Info
    }
}

/// Log a lifecycle event
pub fn log_event(event: Event) {
    Logger::log(severity_for(event), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity_for(event), event.as_str(), fields);
}
