//! Observability subsystem for nutridb
//!
//! This module provides:
//! - Structured logging (JSON)
//! - Deterministic metrics
//! - Operation event tracing
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use nutridb::observability::{Logger, Event, MetricsRegistry, ObservationScope};
//!
//! // Log an event
//! log_event(Event::FindComplete, &[("collection", "Food")]);
//!
//! // Track metrics
//! let metrics = MetricsRegistry::new();
//! metrics.increment_queries_executed();
//!
//! // Scope-based logging
//! let scope = ObservationScope::new("AGGREGATE");
//! // ... do work ...
//! scope.complete();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

/// Log an operation event with fields at the event's severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        // Verifies no panic at any severity
        log_event(Event::InsertComplete, &[("collection", "Food")]);
        log_event(Event::QueryRejected, &[("code", "NUTRI_VALIDATION_FAILED")]);
    }
}
