//! Reservation-counted values
//!
//! Tracks outstanding releases on a shared value with the same
//! atomic-counter style `scheduler` and `observability::metrics` use for
//! their own stats. An [`AdvancedTransformer`](crate::wiring::AdvancedTransformer)
//! takes `fanOut - 1` additional reservations before forwarding to N sinks;
//! each sink calls [`Reserved::release`] exactly once.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tracing::error;

use crate::error::{WiringError, WiringResult};

struct Tracker {
    label: String,
    outstanding: AtomicI64,
}

/// A value with an explicit, atomically-tracked reservation count.
///
/// Cloning a `Reserved<T>` (via [`Clone`] or [`Reserved::share`]) does
/// **not** take an additional reservation — use
/// [`Reserved::reserve_additional`] for that. This separates Rust's own
/// `Arc` refcount (cheap sharing of the value) from the domain-level
/// reservation count the framework's invariants are stated in terms of.
pub struct Reserved<T> {
    value: Arc<T>,
    tracker: Arc<Tracker>,
}

impl<T> Clone for Reserved<T> {
    fn clone(&self) -> Self {
        self.share()
    }
}

impl<T> Reserved<T> {
    /// Wrap `value` with a single initial reservation, held by the caller.
    pub fn new(label: impl Into<String>, value: T) -> Self {
        Self {
            value: Arc::new(value),
            tracker: Arc::new(Tracker {
                label: label.into(),
                outstanding: AtomicI64::new(1),
            }),
        }
    }

    /// Borrow the underlying value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Take `n` additional reservations on top of the current holder's own.
    /// Used by the advanced transformer before fanning out to N sinks.
    pub fn reserve_additional(&self, n: i64) {
        self.tracker.outstanding.fetch_add(n, Ordering::AcqRel);
    }

    /// Release one reservation. Consumes this handle: a released `Reserved`
    /// must not be used again by its holder.
    pub fn release(self) {
        self.tracker.outstanding.fetch_sub(1, Ordering::AcqRel);
    }

    /// Produce another handle to the same value without changing the
    /// reservation count — for forwarding to a sink that will itself call
    /// [`Reserved::release`].
    pub fn share(&self) -> Self {
        Self {
            value: self.value.clone(),
            tracker: self.tracker.clone(),
        }
    }

    /// Current outstanding reservation count.
    pub fn outstanding(&self) -> i64 {
        self.tracker.outstanding.load(Ordering::Acquire)
    }

    /// Assert every expected release has happened. Called at state
    /// disposal; logs and returns an error instead of panicking, since a
    /// leak does not tear down the pipeline.
    pub fn assert_released(&self) -> WiringResult<()> {
        let remaining = self.outstanding();
        if remaining != 0 {
            error!(label = %self.tracker.label, remaining, "reservation leak detected at disposal");
            return Err(WiringError::ReservationLeak {
                value: self.tracker.label.clone(),
                outstanding: remaining.unsigned_abs() as u32,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_holder_releases_cleanly() {
        let reserved = Reserved::new("state-1", 42);
        assert_eq!(reserved.outstanding(), 1);
        let share = reserved.share();
        reserved.release();
        assert_eq!(share.outstanding(), 0);
    }

    #[test]
    fn fan_out_requires_exactly_fan_out_releases() {
        let reserved = Reserved::new("state-2", "payload".to_string());
        let fan_out = 3i64;
        reserved.reserve_additional(fan_out - 1);

        let shares: Vec<_> = (0..fan_out).map(|_| reserved.share()).collect();
        assert_eq!(reserved.outstanding(), fan_out);

        for share in shares {
            share.release();
        }
        assert_eq!(reserved.outstanding(), 0);
    }

    #[test]
    fn leak_is_detected_when_a_release_is_missing() {
        let reserved = Reserved::new("state-3", ());
        reserved.reserve_additional(1);
        let share = reserved.share();
        share.release();
        // The original holder's own release never happens.
        let err = reserved.assert_released().unwrap_err();
        assert!(matches!(err, WiringError::ReservationLeak { outstanding: 1, .. }));
    }
}
