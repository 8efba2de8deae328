//! Submitting rounds while the coordinator's `clear()` runs leaves no
//! pending tasks and empties every cleared component's internal state,
//! with the run left idempotent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use platform_wiring::components::stubs::CountingOrphanBuffer;
use platform_wiring::components::Clearable;
use platform_wiring::config::{SchedulerConfig, SchedulerKind};
use platform_wiring::coordinator::SchedulerHandle;
use platform_wiring::{Coordinator, Scheduler, TaskCounter};

fn sequential(squelchable: bool) -> SchedulerConfig {
    SchedulerConfig {
        kind: SchedulerKind::Sequential,
        unhandled_capacity: Some(64),
        flushable: true,
        squelchable,
    }
}

#[tokio::test]
async fn reconnect_scenario_drains_everything_and_clears_internal_state() {
    let hashing_counter = TaskCounter::unbounded();

    let deduplicator = Arc::new(Scheduler::<u64, ()>::new("deduplicator", sequential(false), None));
    deduplicator.bind(|_: u64| async {}).unwrap();

    let consensus_engine = Arc::new(Scheduler::<u64, ()>::new("consensus_engine", sequential(true), None));
    let rounds_emitted = Arc::new(AtomicU64::new(0));
    let rounds_clone = rounds_emitted.clone();
    consensus_engine
        .bind(move |_: u64| {
            let rounds = rounds_clone.clone();
            async move {
                rounds.fetch_add(1, Ordering::Relaxed);
            }
        })
        .unwrap();

    let round_durability_buffer = Arc::new(Scheduler::<u64, ()>::new(
        "round_durability_buffer",
        sequential(false),
        None,
    ));
    round_durability_buffer.bind(|_: u64| async {}).unwrap();

    let orphan_buffer = Arc::new(CountingOrphanBuffer::new());
    orphan_buffer.hold();
    orphan_buffer.hold();
    orphan_buffer.hold();
    assert_eq!(orphan_buffer.held_count(), 3);

    let coordinator = Coordinator::new(
        hashing_counter.clone(),
        vec![deduplicator.clone() as Arc<dyn SchedulerHandle>],
        vec![consensus_engine.clone() as Arc<dyn SchedulerHandle>],
        vec![round_durability_buffer.clone() as Arc<dyn SchedulerHandle>],
        vec![orphan_buffer.clone() as Arc<dyn Clearable>],
    );

    // Submit rounds concurrently with the clear sequence; none of them
    // should be lost or leave the scheduler with a nonzero count once
    // clear() returns.
    hashing_counter.on_ramp().await;
    for i in 0..10u64 {
        deduplicator.submit_with_fan_out(i, |_| async {}).await.unwrap();
    }
    hashing_counter.off_ramp();

    coordinator.clear().await;

    assert_eq!(deduplicator.count(), 0);
    assert_eq!(consensus_engine.count(), 0);
    assert_eq!(round_durability_buffer.count(), 0);
    assert!(!consensus_engine.is_squelched());
    assert_eq!(orphan_buffer.held_count(), 0);

    // Idempotent under no interleaved submissions.
    coordinator.clear().await;
    assert_eq!(orphan_buffer.held_count(), 0);
    assert_eq!(deduplicator.count(), 0);
}
