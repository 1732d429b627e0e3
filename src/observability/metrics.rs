//! Metrics registry for nutridb
//!
//! - Counters only (no gauges, no histograms)
//! - Monotonic increase
//! - Thread-safe but lock-minimal

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Metrics registry containing all operational counters
///
/// All counters use Relaxed atomic increments, so a shared reference can be
/// read from any thread.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    documents_inserted: AtomicU64,
    documents_modified: AtomicU64,
    documents_deleted: AtomicU64,
    queries_executed: AtomicU64,
    queries_rejected: AtomicU64,
    aggregations: AtomicU64,
    map_reduce_runs: AtomicU64,
    index_builds: AtomicU64,
    index_drops: AtomicU64,
    index_scans: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Write metrics

    /// Add inserted documents
    pub fn add_inserted(&self, count: u64) {
        self.documents_inserted.fetch_add(count, Ordering::Relaxed);
    }

    /// Add modified documents
    pub fn add_modified(&self, count: u64) {
        self.documents_modified.fetch_add(count, Ordering::Relaxed);
    }

    /// Add deleted documents
    pub fn add_deleted(&self, count: u64) {
        self.documents_deleted.fetch_add(count, Ordering::Relaxed);
    }

    // Query metrics

    /// Increment queries executed
    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment queries rejected
    pub fn increment_queries_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment aggregation pipeline runs
    pub fn increment_aggregations(&self) {
        self.aggregations.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment map-reduce runs
    pub fn increment_map_reduce_runs(&self) {
        self.map_reduce_runs.fetch_add(1, Ordering::Relaxed);
    }

    // Index metrics

    /// Increment index builds
    pub fn increment_index_builds(&self) {
        self.index_builds.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment index drops
    pub fn increment_index_drops(&self) {
        self.index_drops.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment index-assisted scans
    pub fn increment_index_scans(&self) {
        self.index_scans.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current snapshot of all metrics as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_inserted: self.documents_inserted.load(Ordering::Relaxed),
            documents_modified: self.documents_modified.load(Ordering::Relaxed),
            documents_deleted: self.documents_deleted.load(Ordering::Relaxed),
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_rejected: self.queries_rejected.load(Ordering::Relaxed),
            aggregations: self.aggregations.load(Ordering::Relaxed),
            map_reduce_runs: self.map_reduce_runs.load(Ordering::Relaxed),
            index_builds: self.index_builds.load(Ordering::Relaxed),
            index_drops: self.index_drops.load(Ordering::Relaxed),
            index_scans: self.index_scans.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub documents_inserted: u64,
    pub documents_modified: u64,
    pub documents_deleted: u64,
    pub queries_executed: u64,
    pub queries_rejected: u64,
    pub aggregations: u64,
    pub map_reduce_runs: u64,
    pub index_builds: u64,
    pub index_drops: u64,
    pub index_scans: u64,
}
