//! PCES durability and keystone-flush protocol.
//!
//! Built on [`crate::wiring::OrderedSolder`] (the general ordered-solder
//! primitive) applied to one sequencing requirement: the consensus
//! engine's round output must reach the flush-request transformer before
//! it reaches the round-durability buffer, so the PCES writer is never
//! starved by a full round-handler queue.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::Instrument;

use crate::components::stubs::{ConsensusRound, PcesWriter};
use crate::error::{WiringError, WiringResult};
use crate::observability::WiringTracer;
use crate::wiring::{OrderedSolder, OutputWire, Sink};

/// Sink (1) of the keystone-flush ordered solder: extracts the round's
/// keystone sequence number and submits a flush request to the PCES
/// writer.
pub struct FlushRequestTransformer<W> {
    writer: Arc<W>,
}

impl<W: PcesWriter> FlushRequestTransformer<W> {
    /// Build a flush-request transformer over `writer`.
    pub fn new(writer: Arc<W>) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W> Sink<ConsensusRound> for FlushRequestTransformer<W>
where
    W: PcesWriter + 'static,
{
    async fn accept_default(&self, value: ConsensusRound) -> WiringResult<()> {
        self.writer.submit_flush_request(value.keystone_sequence).await;
        Ok(())
    }

    async fn accept_inject(&self, value: ConsensusRound) {
        self.writer.submit_flush_request(value.keystone_sequence).await;
    }

    async fn accept_offer(&self, value: ConsensusRound) -> bool {
        self.writer.submit_flush_request(value.keystone_sequence).await;
        true
    }
}

/// Holds each consensus round until its keystone sequence number is ≤ the
/// latest durable sequence number, then emits it downstream to the
/// consensus round handler (sink (2) of the ordered solder).
pub struct RoundDurabilityBuffer {
    latest_durable: AtomicU64,
    pending: Mutex<VecDeque<ConsensusRound>>,
    output: OutputWire<ConsensusRound>,
    tracer: WiringTracer,
}

impl RoundDurabilityBuffer {
    /// Build a buffer emitting durable rounds on `output`.
    pub fn new(output: OutputWire<ConsensusRound>) -> Self {
        Self {
            latest_durable: AtomicU64::new(0),
            pending: Mutex::new(VecDeque::new()),
            output,
            tracer: WiringTracer::default(),
        }
    }

    /// The round-input wire: emit immediately if already durable,
    /// otherwise hold.
    pub async fn submit_round(&self, round: ConsensusRound) -> WiringResult<()> {
        if self.is_durable(round.keystone_sequence) {
            self.emit(round).await
        } else {
            self.pending.lock().push_back(round);
            Ok(())
        }
    }

    /// `setLatestDurableSequenceNumber`, an INJECT target that breaks the
    /// writer→buffer cycle. Releases every pending round whose keystone is
    /// now durable, oldest first.
    pub async fn set_latest_durable_sequence_number(&self, sequence: u64) -> WiringResult<()> {
        self.latest_durable.fetch_max(sequence, Ordering::AcqRel);
        self.release_durable_rounds().await
    }

    /// `checkForStaleRounds`: driven by a heartbeat for liveness even if
    /// no new events or durability notices arrive.
    pub async fn check_for_stale_rounds(&self) -> WiringResult<()> {
        self.release_durable_rounds().await
    }

    /// Rounds currently held pending durability.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    fn is_durable(&self, keystone_sequence: u64) -> bool {
        keystone_sequence <= self.latest_durable.load(Ordering::Acquire)
    }

    async fn release_durable_rounds(&self) -> WiringResult<()> {
        loop {
            let next = {
                let mut pending = self.pending.lock();
                match pending.front() {
                    Some(round) if self.is_durable(round.keystone_sequence) => pending.pop_front(),
                    _ => None,
                }
            };
            match next {
                Some(round) => self.emit(round).await?,
                None => return Ok(()),
            }
        }
    }

    /// Emit a round downstream, re-checking that its keystone is actually
    /// durable as a last line of defense before it leaves the buffer.
    async fn emit(&self, round: ConsensusRound) -> WiringResult<()> {
        let latest_durable = self.latest_durable.load(Ordering::Acquire);
        if round.keystone_sequence > latest_durable {
            return Err(WiringError::DurabilityViolation {
                keystone_sequence: round.keystone_sequence,
                latest_durable,
            });
        }
        self.output
            .emit(round)
            .instrument(self.tracer.durability_admission_span(round.keystone_sequence, true))
            .await
    }
}

struct DurabilityBufferSink {
    buffer: Arc<RoundDurabilityBuffer>,
}

#[async_trait]
impl Sink<ConsensusRound> for DurabilityBufferSink {
    async fn accept_default(&self, value: ConsensusRound) -> WiringResult<()> {
        self.buffer.submit_round(value).await
    }

    async fn accept_inject(&self, value: ConsensusRound) {
        let _ = self.buffer.submit_round(value).await;
    }

    async fn accept_offer(&self, value: ConsensusRound) -> bool {
        self.buffer.submit_round(value).await.is_ok()
    }
}

/// Build the keystone-flush ordered solder: the flush-request
/// transformer first, the round-durability buffer second, guaranteeing the
/// writer sees the keystone before the buffer can ever block on its own
/// downstream queue.
pub fn keystone_flush_solder<W>(
    writer: Arc<W>,
    buffer: Arc<RoundDurabilityBuffer>,
) -> OrderedSolder<ConsensusRound>
where
    W: PcesWriter + 'static,
{
    OrderedSolder::new(
        "consensus_round.out",
        vec![
            Arc::new(FlushRequestTransformer::new(writer)) as Arc<dyn Sink<ConsensusRound>>,
            Arc::new(DurabilityBufferSink { buffer }) as Arc<dyn Sink<ConsensusRound>>,
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::stubs::InMemoryPcesWriter;
    use crate::config::{SchedulerConfig, SchedulerKind};
    use crate::scheduler::Scheduler;
    use crate::wiring::SchedulerSink;
    use crate::wiring::SolderKind;
    use std::sync::atomic::AtomicUsize;

    fn round(keystone_sequence: u64) -> ConsensusRound {
        ConsensusRound {
            round_number: keystone_sequence,
            keystone_sequence,
            ancient_threshold: 0,
        }
    }

    #[tokio::test]
    async fn round_waits_until_its_keystone_is_durable() {
        let handler = Arc::new(Scheduler::<ConsensusRound, ()>::new(
            "consensus_round_handler",
            SchedulerConfig {
                kind: SchedulerKind::Direct,
                unhandled_capacity: None,
                flushable: true,
                squelchable: false,
            },
            None,
        ));
        let delivered = Arc::new(AtomicUsize::new(0));
        let delivered_clone = delivered.clone();
        handler
            .bind(move |_: ConsensusRound| {
                let delivered = delivered_clone.clone();
                async move {
                    delivered.fetch_add(1, Ordering::Relaxed);
                }
            })
            .unwrap();

        let output = OutputWire::new("durable_round.out");
        output.solder(SolderKind::Default, Arc::new(SchedulerSink::new(handler.clone())));
        let buffer = Arc::new(RoundDurabilityBuffer::new(output));

        buffer.submit_round(round(5)).await.unwrap();
        assert_eq!(buffer.pending_count(), 1);
        assert_eq!(delivered.load(Ordering::Relaxed), 0);

        buffer.set_latest_durable_sequence_number(5).await.unwrap();
        handler.wait_until_empty().await;
        assert_eq!(buffer.pending_count(), 0);
        assert_eq!(delivered.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn keystone_flush_solder_notifies_writer_before_buffer_holds_round() {
        let writer = Arc::new(InMemoryPcesWriter::new());
        let output = OutputWire::new("durable_round.out");
        let buffer = Arc::new(RoundDurabilityBuffer::new(output));

        let solder = keystone_flush_solder(writer.clone(), buffer.clone());
        solder.emit(round(7)).await.unwrap();

        // The flush-request sink ran first; the writer already knows about
        // sequence 7 even though the buffer will still hold the round.
        assert_eq!(writer.latest_durable_sequence_number(), 7);
        assert_eq!(buffer.pending_count(), 1);
    }

    #[tokio::test]
    async fn stale_round_check_releases_rounds_without_a_new_submission() {
        let output = OutputWire::new("durable_round.out");
        let buffer = Arc::new(RoundDurabilityBuffer::new(output));
        buffer.submit_round(round(3)).await.unwrap();
        buffer.set_latest_durable_sequence_number(1).await.unwrap();
        assert_eq!(buffer.pending_count(), 1);

        buffer.set_latest_durable_sequence_number(3).await.unwrap();
        buffer.check_for_stale_rounds().await.unwrap();
        assert_eq!(buffer.pending_count(), 0);
    }
}
