//! Ordered solder: one output fanned out to an ordered list of
//! sinks with guaranteed per-item sequential delivery — S1 receives v before
//! S2 is offered v, and so on. This is the mechanism behind the
//! keystone-flush protocol: the flush-request transformer must see a round
//! before the round-durability buffer does.

use std::sync::Arc;

use crate::error::WiringResult;
use crate::wiring::Sink;

/// An output soldered, in order, to a fixed list of sinks.
pub struct OrderedSolder<T> {
    name: Arc<str>,
    sinks: Vec<Arc<dyn Sink<T>>>,
}

impl<T> OrderedSolder<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Build an ordered solder from `sinks`, delivered in list order.
    pub fn new(name: impl Into<Arc<str>>, sinks: Vec<Arc<dyn Sink<T>>>) -> Self {
        Self {
            name: name.into(),
            sinks,
        }
    }

    /// Wire name, for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of ordered sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// True if this ordered solder has no sinks.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Emit `value` to each sink in order, awaiting each default-edge
    /// delivery before offering the value to the next sink.
    pub async fn emit(&self, value: T) -> WiringResult<()> {
        for sink in &self.sinks {
            sink.accept_default(value.clone()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct RecordingSink<T> {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        _marker: std::marker::PhantomData<T>,
    }

    #[async_trait::async_trait]
    impl<T: Send + Sync> Sink<T> for RecordingSink<T> {
        async fn accept_default(&self, _value: T) -> WiringResult<()> {
            self.log.lock().push(self.label);
            Ok(())
        }
        async fn accept_inject(&self, _value: T) {
            self.log.lock().push(self.label);
        }
        async fn accept_offer(&self, _value: T) -> bool {
            self.log.lock().push(self.label);
            true
        }
    }

    #[tokio::test]
    async fn sinks_are_visited_in_declared_order() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let flush_request = Arc::new(RecordingSink {
            label: "flush_request",
            log: log.clone(),
            _marker: std::marker::PhantomData,
        });
        let buffer_in = Arc::new(RecordingSink {
            label: "buffer_in",
            log: log.clone(),
            _marker: std::marker::PhantomData,
        });

        let solder = OrderedSolder::new(
            "round.out",
            vec![flush_request as Arc<dyn Sink<u64>>, buffer_in as Arc<dyn Sink<u64>>],
        );

        solder.emit(42).await.unwrap();
        assert_eq!(*log.lock(), vec!["flush_request", "buffer_in"]);
    }
}
