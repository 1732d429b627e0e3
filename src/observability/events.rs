//! Observability events for nutridb
//!
//! Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events in nutridb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded and applied
    ConfigLoaded,

    // Writes
    /// Documents inserted
    InsertComplete,
    /// Update applied to matching documents
    UpdateComplete,
    /// Documents removed
    DeleteComplete,

    // Reads
    /// Find cursor opened
    FindComplete,
    /// Count or distinct answered
    CountComplete,

    // Indexes
    /// Index built
    IndexCreated,
    /// Index removed
    IndexDropped,

    // Failures
    /// Operation rejected with an error
    QueryRejected,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::InsertComplete => "INSERT_COMPLETE",
            Event::UpdateComplete => "UPDATE_COMPLETE",
            Event::DeleteComplete => "DELETE_COMPLETE",
            Event::FindComplete => "FIND_COMPLETE",
            Event::CountComplete => "COUNT_COMPLETE",
            Event::IndexCreated => "INDEX_CREATED",
            Event::IndexDropped => "INDEX_DROPPED",
            Event::QueryRejected => "QUERY_REJECTED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::QueryRejected => Severity::Warn,
            Event::FindComplete | Event::CountComplete => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::ConfigLoaded,
            Event::InsertComplete,
            Event::UpdateComplete,
            Event::DeleteComplete,
            Event::FindComplete,
            Event::CountComplete,
            Event::IndexCreated,
            Event::IndexDropped,
            Event::QueryRejected,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_rejections_are_warnings() {
        assert_eq!(Event::QueryRejected.severity(), Severity::Warn);
        assert_eq!(Event::InsertComplete.severity(), Severity::Info);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::IndexCreated), "INDEX_CREATED");
    }
}
