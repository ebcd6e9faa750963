//! Metrics registry
//!
//! - Counters only, monotonic
//! - Reset only when the owning component is created
//! - Thread-safe, lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for the model registry and sessions.
///
/// Each component owns its own registry and bumps only the counters that
/// concern it.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Tables newly registered
    models_registered: AtomicU64,
    /// Declarations rejected at registration
    models_rejected: AtomicU64,
    /// Documents queued for insert
    inserts_tracked: AtomicU64,
    /// Documents queued for delete
    deletes_tracked: AtomicU64,
    /// Lookups answered from the identity map
    identity_hits: AtomicU64,
    /// Lookups that went to the store
    identity_misses: AtomicU64,
    /// Dead identity map entries swept
    identity_evictions: AtomicU64,
    /// Successful commits
    commits: AtomicU64,
    /// Commits rejected by the store or by externalization
    commit_failures: AtomicU64,
    /// Inserts and deletes applied by successful commits
    documents_written: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Model metadata

    pub fn increment_models_registered(&self) {
        self.models_registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_models_rejected(&self) {
        self.models_rejected.fetch_add(1, Ordering::Relaxed);
    }

    // Unit of work

    pub fn increment_inserts_tracked(&self) {
        self.inserts_tracked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deletes_tracked(&self) {
        self.deletes_tracked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_identity_hits(&self) {
        self.identity_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_identity_misses(&self) {
        self.identity_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_identity_evictions(&self, count: u64) {
        self.identity_evictions.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a successful commit of `documents` writes
    pub fn record_commit(&self, documents: u64) {
        self.commits.fetch_add(1, Ordering::Relaxed);
        self.documents_written.fetch_add(documents, Ordering::Relaxed);
    }

    pub fn increment_commit_failures(&self) {
        self.commit_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            models_registered: self.models_registered.load(Ordering::Relaxed),
            models_rejected: self.models_rejected.load(Ordering::Relaxed),
            inserts_tracked: self.inserts_tracked.load(Ordering::Relaxed),
            deletes_tracked: self.deletes_tracked.load(Ordering::Relaxed),
            identity_hits: self.identity_hits.load(Ordering::Relaxed),
            identity_misses: self.identity_misses.load(Ordering::Relaxed),
            identity_evictions: self.identity_evictions.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            commit_failures: self.commit_failures.load(Ordering::Relaxed),
            documents_written: self.documents_written.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub models_registered: u64,
    pub models_rejected: u64,
    pub inserts_tracked: u64,
    pub deletes_tracked: u64,
    pub identity_hits: u64,
    pub identity_misses: u64,
    pub identity_evictions: u64,
    pub commits: u64,
    pub commit_failures: u64,
    pub documents_written: u64,
}
