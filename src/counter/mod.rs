//! Task counter: per-scheduler in-flight tracking and backpressure
//!
//! Built on the same park/retry pattern as `concurrency::work_stealing`
//! combined with a `CancelToken` scope: on-ramp/off-ramp a shared
//! `AtomicI64`, optionally parking the caller when at capacity.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use crate::concurrency::CancelToken;

/// Shared, clonable in-flight counter. Cloning shares the same atomic and
/// notifier, which is how tightly-coupled schedulers serialize a single
/// capacity check across each other.
#[derive(Clone)]
pub struct TaskCounter {
    inner: Arc<Inner>,
}

struct Inner {
    count: AtomicI64,
    capacity: Option<i64>,
    park_interval: Duration,
    notify: Notify,
}

impl TaskCounter {
    /// An unbounded counter: on-ramp always succeeds immediately.
    pub fn unbounded() -> Self {
        Self {
            inner: Arc::new(Inner {
                count: AtomicI64::new(0),
                capacity: None,
                park_interval: Duration::from_millis(1),
                notify: Notify::new(),
            }),
        }
    }

    /// A backpressuring counter: on-ramp parks and retries while the count
    /// is at or above `capacity`.
    pub fn backpressuring(capacity: i64, park_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                count: AtomicI64::new(0),
                capacity: Some(capacity),
                park_interval,
                notify: Notify::new(),
            }),
        }
    }

    /// Increment, parking until capacity allows it.
    pub async fn on_ramp(&self) {
        loop {
            if self.try_increment() {
                return;
            }
            self.park_for_interval().await;
        }
    }

    /// Increment, parking until capacity allows it or `token` is cancelled.
    /// Returns `false` if cancelled before the increment happened.
    pub async fn interruptable_on_ramp(&self, token: &CancelToken) -> bool {
        loop {
            if self.try_increment() {
                return true;
            }
            if token.is_cancelled() {
                return false;
            }
            tokio::select! {
                _ = self.park_for_interval() => {}
                _ = token.cancelled() => return false,
            }
        }
    }

    /// Best-effort increment. Never parks; returns whether it happened.
    pub fn attempt_on_ramp(&self) -> bool {
        self.try_increment()
    }

    /// Increment unconditionally, bypassing capacity. Used by INJECT edges.
    pub fn force_on_ramp(&self) {
        self.inner.count.fetch_add(1, Ordering::AcqRel);
    }

    /// Decrement. Must be matched 1:1 with an on-ramp of any kind.
    pub fn off_ramp(&self) {
        let previous = self.inner.count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "task counter decremented below zero");
        self.inner.notify.notify_waiters();
    }

    /// Snapshot the current count.
    pub fn get_count(&self) -> i64 {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Block until the count reaches zero.
    pub async fn wait_until_empty(&self) {
        loop {
            if self.get_count() <= 0 {
                return;
            }
            let notified = self.inner.notify.notified();
            if self.get_count() <= 0 {
                return;
            }
            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep(self.inner.park_interval) => {}
            }
        }
    }

    fn try_increment(&self) -> bool {
        match self.inner.capacity {
            None => {
                self.inner.count.fetch_add(1, Ordering::AcqRel);
                true
            }
            Some(capacity) => self
                .inner
                .count
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                    if current < capacity {
                        Some(current + 1)
                    } else {
                        None
                    }
                })
                .is_ok(),
        }
    }

    async fn park_for_interval(&self) {
        tokio::time::sleep(self.inner.park_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn on_ramp_off_ramp_round_trips() {
        let counter = TaskCounter::unbounded();
        counter.on_ramp().await;
        assert_eq!(counter.get_count(), 1);
        counter.off_ramp();
        assert_eq!(counter.get_count(), 0);
    }

    #[tokio::test]
    async fn attempt_on_ramp_fails_at_capacity() {
        let counter = TaskCounter::backpressuring(1, Duration::from_millis(5));
        assert!(counter.attempt_on_ramp());
        assert!(!counter.attempt_on_ramp());
        counter.off_ramp();
        assert!(counter.attempt_on_ramp());
    }

    #[tokio::test]
    async fn force_on_ramp_bypasses_capacity() {
        let counter = TaskCounter::backpressuring(1, Duration::from_millis(5));
        assert!(counter.attempt_on_ramp());
        counter.force_on_ramp();
        assert_eq!(counter.get_count(), 2);
    }

    #[tokio::test]
    async fn on_ramp_parks_until_capacity_frees() {
        let counter = TaskCounter::backpressuring(1, Duration::from_millis(5));
        counter.on_ramp().await;

        let waiter = counter.clone();
        let handle = tokio::spawn(async move {
            waiter.on_ramp().await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        counter.off_ramp();
        tokio::time::timeout(Duration::from_millis(200), handle)
            .await
            .expect("second on_ramp should complete once capacity frees")
            .unwrap();
    }

    #[tokio::test]
    async fn interruptable_on_ramp_returns_false_on_cancel() {
        let counter = TaskCounter::backpressuring(0, Duration::from_millis(5));
        let token = CancelToken::new();
        token.cancel();
        assert!(!counter.interruptable_on_ramp(&token).await);
    }

    #[tokio::test]
    async fn wait_until_empty_returns_once_drained() {
        let counter = TaskCounter::unbounded();
        counter.on_ramp().await;
        counter.on_ramp().await;

        let waiter = counter.clone();
        let handle = tokio::spawn(async move {
            waiter.wait_until_empty().await;
        });

        counter.off_ramp();
        assert!(!handle.is_finished());
        counter.off_ramp();

        tokio::time::timeout(Duration::from_millis(200), handle)
            .await
            .expect("wait_until_empty should resolve once count hits zero")
            .unwrap();
    }
}
