//! Output wires and the solder edge types

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::WiringResult;
use crate::scheduler::Scheduler;

/// How a solder edge delivers an emitted value to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolderKind {
    /// Blocks the emitter when the target counter is at capacity.
    Default,
    /// Bypasses capacity via `forceOnRamp`. Used only to break cycles.
    Inject,
    /// Non-blocking; drops the value if the target counter is at capacity.
    Offer,
}

/// A soldering target for values of type `T`.
///
/// Implemented by [`SchedulerSink`] so an [`OutputWire<T>`] can fan out to a
/// downstream scheduler without knowing its output type.
#[async_trait]
pub trait Sink<T>: Send + Sync {
    /// Deliver `value`, blocking if the target is at capacity.
    async fn accept_default(&self, value: T) -> WiringResult<()>;
    /// Deliver `value`, bypassing capacity.
    async fn accept_inject(&self, value: T);
    /// Attempt to deliver `value`; returns whether it was accepted.
    async fn accept_offer(&self, value: T) -> bool;
}

/// Adapts a bound [`Scheduler<T, Out>`] into a [`Sink<T>`], discarding its
/// own output — the scheduler's separate output wire (if any) is soldered
/// independently.
pub struct SchedulerSink<T, Out> {
    scheduler: Arc<Scheduler<T, Out>>,
}

impl<T, Out> SchedulerSink<T, Out> {
    /// Wrap `scheduler` as a sink for its input type `T`.
    pub fn new(scheduler: Arc<Scheduler<T, Out>>) -> Self {
        Self { scheduler }
    }
}

#[async_trait]
impl<T, Out> Sink<T> for SchedulerSink<T, Out>
where
    T: Send + 'static,
    Out: Send + 'static,
{
    async fn accept_default(&self, value: T) -> WiringResult<()> {
        self.scheduler.submit_with_fan_out(value, |_| async {}).await
    }

    async fn accept_inject(&self, value: T) {
        let _ = self.scheduler.force_submit_with_fan_out(value, |_| async {}).await;
    }

    async fn accept_offer(&self, value: T) -> bool {
        self.scheduler
            .try_submit_with_fan_out(value, |_| async {})
            .await
            .unwrap_or(false)
    }
}

struct Edge<T> {
    kind: SolderKind,
    sink: Arc<dyn Sink<T>>,
}

/// A typed exit point. Emitted values are fanned out to every soldered
/// edge per its [`SolderKind`]: every value emitted is delivered to every
/// soldered downstream.
pub struct OutputWire<T> {
    name: Arc<str>,
    edges: Arc<RwLock<Vec<Edge<T>>>>,
}

impl<T> Clone for OutputWire<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            edges: self.edges.clone(),
        }
    }
}

impl<T> OutputWire<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new, unsoldered output wire.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            edges: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Wire name, for diagnostics and model descriptions.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Solder this output to `sink` with the given edge type.
    pub fn solder(&self, kind: SolderKind, sink: Arc<dyn Sink<T>>) {
        self.edges.write().push(Edge { kind, sink });
    }

    /// Number of soldered downstream edges.
    pub fn edge_count(&self) -> usize {
        self.edges.read().len()
    }

    /// Emit `value` to every soldered edge per its kind. Default edges are
    /// awaited sequentially in solder order (no cross-edge ordering
    /// guarantee beyond that is promised — use [`super::OrderedSolder`]
    /// when sequencing across sinks matters).
    pub async fn emit(&self, value: T) -> WiringResult<()> {
        let edges: Vec<_> = self
            .edges
            .read()
            .iter()
            .map(|edge| (edge.kind, edge.sink.clone()))
            .collect();

        for (kind, sink) in edges {
            match kind {
                SolderKind::Default => sink.accept_default(value.clone()).await?,
                SolderKind::Inject => sink.accept_inject(value.clone()).await,
                SolderKind::Offer => {
                    sink.accept_offer(value.clone()).await;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SchedulerConfig, SchedulerKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config(kind: SchedulerKind, capacity: Option<usize>) -> SchedulerConfig {
        SchedulerConfig {
            kind,
            unhandled_capacity: capacity,
            flushable: true,
            squelchable: false,
        }
    }

    #[tokio::test]
    async fn default_edge_delivers_to_bound_scheduler() {
        let downstream = Arc::new(Scheduler::<u32, ()>::new(
            "downstream",
            config(SchedulerKind::Sequential, Some(8)),
            None,
        ));
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        downstream
            .bind(move |x: u32| {
                let seen = seen_clone.clone();
                async move {
                    seen.fetch_add(x as usize, Ordering::Relaxed);
                }
            })
            .unwrap();

        let output = OutputWire::new("upstream.out");
        output.solder(SolderKind::Default, Arc::new(SchedulerSink::new(downstream.clone())));
        output.emit(7).await.unwrap();
        downstream.wait_until_empty().await;

        assert_eq!(seen.load(Ordering::Relaxed), 7);
    }

    #[tokio::test]
    async fn offer_edge_drops_when_target_is_full() {
        let downstream = Arc::new(Scheduler::<u32, ()>::new(
            "downstream",
            config(SchedulerKind::Sequential, Some(0)),
            None,
        ));
        downstream.bind(|_: u32| async {}).unwrap();

        let output = OutputWire::new("heartbeat.out");
        output.solder(SolderKind::Offer, Arc::new(SchedulerSink::new(downstream.clone())));

        // Capacity 0 means every offer is dropped; emit must not block.
        output.emit(1).await.unwrap();
        assert_eq!(downstream.count(), 0);
        assert_eq!(downstream.stats().tasks_submitted(), 0);
    }
}
