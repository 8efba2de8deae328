//! Transformer, splitter, filter, and advanced transformer

use std::sync::Arc;

use crate::error::WiringResult;
use crate::reservation::Reserved;
use crate::wiring::output_wire::OutputWire;

/// Named 1→1 pure map, re-emitted on its own output wire.
pub struct Transformer<In, Out> {
    name: Arc<str>,
    map: Arc<dyn Fn(In) -> Out + Send + Sync>,
    output: OutputWire<Out>,
}

impl<In, Out> Transformer<In, Out>
where
    In: Send + 'static,
    Out: Clone + Send + Sync + 'static,
{
    /// Build a transformer named `name`, applying `map`, emitting on `output`.
    pub fn new(
        name: impl Into<Arc<str>>,
        map: impl Fn(In) -> Out + Send + Sync + 'static,
        output: OutputWire<Out>,
    ) -> Self {
        Self {
            name: name.into(),
            map: Arc::new(map),
            output,
        }
    }

    /// Transformer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Output wire downstreams solder onto.
    pub fn output(&self) -> &OutputWire<Out> {
        &self.output
    }

    /// Apply the map and emit the result to every soldered downstream.
    pub async fn submit(&self, input: In) -> WiringResult<()> {
        let output = (self.map)(input);
        self.output.emit(output).await
    }
}

/// Splits a sequence output into N individual emissions, preserving order.
pub struct Splitter<T> {
    name: Arc<str>,
    output: OutputWire<T>,
}

impl<T> Splitter<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Build a splitter named `name`, emitting elements on `output`.
    pub fn new(name: impl Into<Arc<str>>, output: OutputWire<T>) -> Self {
        Self {
            name: name.into(),
            output,
        }
    }

    /// Splitter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Emit each element of `items` in order.
    pub async fn split(&self, items: Vec<T>) -> WiringResult<()> {
        for item in items {
            self.output.emit(item).await?;
        }
        Ok(())
    }
}

/// Boolean predicate; a dropped value is simply not forwarded. When `T` is
/// [`Reserved<U>`], use [`Filter::apply_releasing`] so a dropped value's
/// reservation is released by the filter itself.
pub struct Filter<T> {
    name: Arc<str>,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    output: OutputWire<T>,
}

impl<T> Filter<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Build a filter named `name` with the given predicate, emitting
    /// accepted values on `output`.
    pub fn new(
        name: impl Into<Arc<str>>,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
        output: OutputWire<T>,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
            output,
        }
    }

    /// Filter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Forward `value` if the predicate accepts it; drop it otherwise.
    pub async fn submit(&self, value: T) -> WiringResult<()> {
        if (self.predicate)(&value) {
            self.output.emit(value).await?;
        }
        Ok(())
    }
}

impl<U> Filter<Reserved<U>>
where
    U: Send + Sync + 'static,
{
    /// Forward `value` if accepted; otherwise release its reservation here,
    /// since a dropped reservable value's release is the filter's own
    /// responsibility: it must release exactly the reservations its
    /// predicate received.
    pub async fn apply_releasing(&self, value: Reserved<U>) -> WiringResult<()> {
        if (self.predicate)(&value) {
            self.output.emit(value).await
        } else {
            value.release();
            Ok(())
        }
    }
}

/// A reservation-aware 1→N transformer: takes `fanOut - 1` additional
/// reservations before forwarding a shared handle to each sink, so every
/// sink releases exactly once.
pub struct AdvancedTransformer<T> {
    name: Arc<str>,
    sinks: Vec<OutputWire<Reserved<T>>>,
}

impl<T> AdvancedTransformer<T>
where
    T: Send + Sync + 'static,
{
    /// Build an advanced transformer named `name` fanning out to `sinks`.
    pub fn new(name: impl Into<Arc<str>>, sinks: Vec<OutputWire<Reserved<T>>>) -> Self {
        Self {
            name: name.into(),
            sinks,
        }
    }

    /// Transformer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fan-out (number of sinks).
    pub fn fan_out(&self) -> usize {
        self.sinks.len()
    }

    /// Reserve `fanOut - 1` additional holds and forward a share to each
    /// sink in turn.
    pub async fn forward(&self, value: Reserved<T>) -> WiringResult<()> {
        if self.sinks.is_empty() {
            value.release();
            return Ok(());
        }

        value.reserve_additional(self.sinks.len() as i64 - 1);
        for sink in &self.sinks {
            sink.emit(value.share()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SchedulerConfig, SchedulerKind};
    use crate::scheduler::Scheduler;
    use crate::wiring::output_wire::{SchedulerSink, SolderKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sequential(capacity: Option<usize>) -> SchedulerConfig {
        SchedulerConfig {
            kind: SchedulerKind::Sequential,
            unhandled_capacity: capacity,
            flushable: true,
            squelchable: false,
        }
    }

    #[tokio::test]
    async fn transformer_maps_and_emits() {
        let downstream = Arc::new(Scheduler::<u32, ()>::new("downstream", sequential(Some(8)), None));
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        downstream
            .bind(move |x: u32| {
                let seen = seen_clone.clone();
                async move {
                    seen.store(x as usize, Ordering::Relaxed);
                }
            })
            .unwrap();

        let output = OutputWire::new("doubled");
        output.solder(SolderKind::Default, Arc::new(SchedulerSink::new(downstream.clone())));
        let transformer = Transformer::new("doubler", |x: u32| x * 2, output);

        transformer.submit(21).await.unwrap();
        downstream.wait_until_empty().await;
        assert_eq!(seen.load(Ordering::Relaxed), 42);
    }

    #[tokio::test]
    async fn splitter_preserves_order() {
        let downstream = Arc::new(Scheduler::<u32, ()>::new("downstream", sequential(Some(8)), None));
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        downstream
            .bind(move |x: u32| {
                let seen = seen_clone.clone();
                async move {
                    seen.lock().push(x);
                }
            })
            .unwrap();

        let output = OutputWire::new("items");
        output.solder(SolderKind::Default, Arc::new(SchedulerSink::new(downstream.clone())));
        let splitter = Splitter::new("expand", output);

        splitter.split(vec![1, 2, 3]).await.unwrap();
        downstream.wait_until_empty().await;
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn filter_drops_values_failing_predicate() {
        let downstream = Arc::new(Scheduler::<u32, ()>::new("downstream", sequential(Some(8)), None));
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

        let output = OutputWire::new("evens");
        output.solder(SolderKind::Default, Arc::new(SchedulerSink::new(downstream.clone())));
        let filter = Filter::new("even-only", |x: &u32| x % 2 == 0, output);

        filter.submit(3).await.unwrap();
        filter.submit(4).await.unwrap();
        downstream.wait_until_empty().await;
        assert_eq!(seen.load(Ordering::Relaxed), 4);
    }

    #[tokio::test]
    async fn advanced_transformer_balances_reservations_across_fan_out() {
        let a = Arc::new(Scheduler::<Reserved<u32>, ()>::new("a", sequential(Some(8)), None));
        let b = Arc::new(Scheduler::<Reserved<u32>, ()>::new("b", sequential(Some(8)), None));
        let c = Arc::new(Scheduler::<Reserved<u32>, ()>::new("c", sequential(Some(8)), None));

        for s in [&a, &b, &c] {
            s.bind(|value: Reserved<u32>| async move {
                value.release();
            })
            .unwrap();
        }

        let outputs: Vec<_> = [&a, &b, &c]
            .iter()
            .map(|s| {
                let output = OutputWire::new("fanout");
                output.solder(SolderKind::Default, Arc::new(SchedulerSink::new((*s).clone())));
                output
            })
            .collect();

        let transformer = AdvancedTransformer::new("fanout", outputs);
        let value = Reserved::new("reservable", 99u32);
        let tracked = value.share();
        transformer.forward(value).await.unwrap();

        a.wait_until_empty().await;
        b.wait_until_empty().await;
        c.wait_until_empty().await;

        assert_eq!(tracked.outstanding(), 0);
        tracked.assert_released().unwrap();
    }
}
