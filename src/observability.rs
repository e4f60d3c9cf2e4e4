//! Hint outcome counters

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    admitted: AtomicU64,
    issued: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    aborted: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "admitted", "Metric incremented");
    }

    pub fn hint_issued(&self) {
        self.issued.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "issued", "Metric incremented");
    }

    pub fn hint_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "completed", "Metric incremented");
    }

    pub fn hint_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "failed", "Metric incremented");
    }

    pub fn hint_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "skipped", "Metric incremented");
    }

    pub fn resource_aborted(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "aborted", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            admitted: self.admitted.load(Ordering::Relaxed),
            issued: self.issued.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub admitted: u64,
    pub issued: u64,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub aborted: u64,
}
