//! In-process counters for the model's startup/shutdown summary
//!
//! No metrics-export surface is implemented; these counters back a
//! textual summary only (see `Model::describe`).

use std::sync::atomic::{AtomicU64, Ordering};

/// Lightweight counters the model aggregates across its schedulers.
#[derive(Default)]
pub struct WiringMetrics {
    tasks_submitted: AtomicU64,
    tasks_completed: AtomicU64,
    handler_panics: AtomicU64,
    reservation_leaks: AtomicU64,
    squelched_drops: AtomicU64,
}

impl WiringMetrics {
    /// Record a task on-ramped onto some scheduler.
    pub fn record_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a task that completed (successfully or via handler panic).
    pub fn record_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a handler panic.
    pub fn record_handler_panic(&self) {
        self.handler_panics.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a reservation leak detection.
    pub fn record_reservation_leak(&self) {
        self.reservation_leaks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a task dropped by a squelched scheduler.
    pub fn record_squelched_drop(&self) {
        self.squelched_drops.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot the counters as a textual summary.
    pub fn summary(&self) -> String {
        format!(
            "tasks_submitted={} tasks_completed={} handler_panics={} reservation_leaks={} squelched_drops={}",
            self.tasks_submitted.load(Ordering::Relaxed),
            self.tasks_completed.load(Ordering::Relaxed),
            self.handler_panics.load(Ordering::Relaxed),
            self.reservation_leaks.load(Ordering::Relaxed),
            self.squelched_drops.load(Ordering::Relaxed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = WiringMetrics::default();
        metrics.record_submitted();
        metrics.record_completed();
        metrics.record_reservation_leak();
        let summary = metrics.summary();
        assert!(summary.contains("tasks_submitted=1"));
        assert!(summary.contains("reservation_leaks=1"));
    }
}
