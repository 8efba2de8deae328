//! The platform coordinator: reconnect-safe intake flush and four-phase
//! clear.
//!
//! Each phase is wrapped in its own `tracing` span via
//! `observability::tracing::WiringTracer`, applied here to a fixed
//! four-phase state machine: squelch, flush, stop-squelching, clear.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::Instrument;

use crate::components::Clearable;
use crate::config::SchedulerKind;
use crate::counter::TaskCounter;
use crate::observability::WiringTracer;
use crate::scheduler::Scheduler;

/// The subset of a [`Scheduler`]'s surface the coordinator needs, erased
/// over `In`/`Out` so schedulers of differing types can sit in one flush
/// or squelch list.
#[async_trait]
pub trait SchedulerHandle: Send + Sync {
    /// Scheduler name, for diagnostics.
    fn name(&self) -> &str;
    /// Current in-flight task count.
    fn count(&self) -> i64;
    /// Block until no task is in flight.
    async fn wait_until_empty(&self);
    /// Enable or disable squelch mode.
    fn set_squelched(&self, squelched: bool);
    /// Whether squelch mode is currently active.
    fn is_squelched(&self) -> bool;
}

#[async_trait]
impl<In, Out> SchedulerHandle for Scheduler<In, Out>
where
    In: Send + 'static,
    Out: Send + 'static,
{
    fn name(&self) -> &str {
        Scheduler::name(self)
    }

    fn count(&self) -> i64 {
        Scheduler::count(self)
    }

    async fn wait_until_empty(&self) {
        Scheduler::wait_until_empty(self).await
    }

    fn set_squelched(&self, squelched: bool) {
        Scheduler::set_squelched(self, squelched)
    }

    fn is_squelched(&self) -> bool {
        Scheduler::is_squelched(self)
    }
}

/// Drives the pipeline through its reconnect lifecycle.
///
/// Squelch affects only *future* handler invocations: a scheduler's
/// `dispatch` checks `is_squelched()` after the task has already on-ramped,
/// so work already past that check when squelch is enabled runs to
/// completion normally.
pub struct Coordinator {
    tracer: WiringTracer,
    /// Shared counter joint-flushed by the event-hasher and post-hash
    /// collector.
    hashing_counter: TaskCounter,
    /// Intake pipeline, in the exact flush order: internal validator,
    /// deduplicator, signature validator, orphan buffer, gossip, consensus
    /// engine, transaction prehandler, event-creation manager.
    intake_pipeline: Vec<Arc<dyn SchedulerHandle>>,
    /// Schedulers squelched in Phase 1 and released in Phase 3: consensus
    /// engine, event-creation manager, consensus round handler.
    cycle_breakers: Vec<Arc<dyn SchedulerHandle>>,
    /// Flushed in Phase 2 after the intake pipeline: state hasher,
    /// state-signature collector, round-durability buffer, consensus round
    /// handler.
    durability_flush_targets: Vec<Arc<dyn SchedulerHandle>>,
    /// Cleared in Phase 4: deduplicator, orphan buffer, gossip,
    /// state-signature collector, event-creation manager, round-durability
    /// buffer.
    clear_targets: Vec<Arc<dyn Clearable>>,
}

impl Coordinator {
    /// Build a coordinator over the named component groups. Construction
    /// order among groups is irrelevant; only the order *within*
    /// `intake_pipeline` matters, and must match the flush sequence above.
    pub fn new(
        hashing_counter: TaskCounter,
        intake_pipeline: Vec<Arc<dyn SchedulerHandle>>,
        cycle_breakers: Vec<Arc<dyn SchedulerHandle>>,
        durability_flush_targets: Vec<Arc<dyn SchedulerHandle>>,
        clear_targets: Vec<Arc<dyn Clearable>>,
    ) -> Self {
        Self {
            tracer: WiringTracer::default(),
            hashing_counter,
            intake_pipeline,
            cycle_breakers,
            durability_flush_targets,
            clear_targets,
        }
    }

    /// The intake flush algorithm: wait for the joint hashing counter to
    /// empty, then drain the intake pipeline in declared order. Idempotent
    /// under no interleaved submissions.
    pub async fn flush_intake_pipeline(&self) {
        async {
            self.hashing_counter.wait_until_empty().await;
            for scheduler in &self.intake_pipeline {
                scheduler.wait_until_empty().await;
            }
        }
        .instrument(self.tracer.flush_span())
        .await;
    }

    /// The four-phase clear algorithm. Idempotent under no interleaved
    /// submissions.
    pub async fn clear(&self) {
        self.squelch_phase().await;
        self.flush_phase().await;
        self.stop_squelching_phase().await;
        self.clear_phase().await;
    }

    async fn squelch_phase(&self) {
        async {
            for scheduler in &self.cycle_breakers {
                scheduler.set_squelched(true);
            }
            for scheduler in &self.cycle_breakers {
                scheduler.wait_until_empty().await;
            }
        }
        .instrument(self.tracer.clear_phase_span("squelch"))
        .await;
    }

    async fn flush_phase(&self) {
        async {
            self.flush_intake_pipeline().await;
            for scheduler in &self.durability_flush_targets {
                scheduler.wait_until_empty().await;
            }
        }
        .instrument(self.tracer.clear_phase_span("flush"))
        .await;
    }

    async fn stop_squelching_phase(&self) {
        async {
            for scheduler in &self.cycle_breakers {
                scheduler.set_squelched(false);
            }
        }
        .instrument(self.tracer.clear_phase_span("stop_squelching"))
        .await;
    }

    async fn clear_phase(&self) {
        async {
            for target in &self.clear_targets {
                target.clear();
            }
        }
        .instrument(self.tracer.clear_phase_span("clear"))
        .await;
    }
}
