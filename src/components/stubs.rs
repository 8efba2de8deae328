//! In-process stub components: black-box implementations of the
//! capability traits, usable wherever the framework's own tests need a
//! PCES writer, consensus engine, or orphan buffer without pulling in the
//! real domain logic.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use crate::components::{Clearable, EventWindowSink, Squelchable};

/// The PCES writer collaborator surface consumed by the keystone-flush
/// protocol: `writeEvent`, `submitFlushRequest`,
/// `setMinimumAncientIdentifierToStore`, `beginStreamingNewEvents`, and a
/// monotonically non-decreasing latest-durable sequence number.
#[async_trait]
pub trait PcesWriter: Send + Sync {
    /// Persist one event at `sequence`.
    async fn write_event(&self, sequence: u64);
    /// Request that everything up to and including `sequence` be flushed.
    async fn submit_flush_request(&self, sequence: u64);
    /// Advance the minimum ancient identifier the writer must retain.
    fn set_minimum_ancient_identifier_to_store(&self, ancient_identifier: u64);
    /// Begin accepting newly streamed events.
    fn begin_streaming_new_events(&self);
    /// The latest sequence number known to be durable.
    fn latest_durable_sequence_number(&self) -> u64;
}

/// An in-memory [`PcesWriter`]: flush requests are durable the instant
/// they are submitted, so the latest-durable sequence number tracks the
/// highest flushed sequence seen so far.
pub struct InMemoryPcesWriter {
    latest_durable: AtomicU64,
    minimum_ancient: AtomicU64,
    streaming: AtomicBool,
}

impl InMemoryPcesWriter {
    /// Construct a writer with no durable sequence yet.
    pub fn new() -> Self {
        Self {
            latest_durable: AtomicU64::new(0),
            minimum_ancient: AtomicU64::new(0),
            streaming: AtomicBool::new(false),
        }
    }

    /// The minimum ancient identifier last set.
    pub fn minimum_ancient_identifier(&self) -> u64 {
        self.minimum_ancient.load(Ordering::Acquire)
    }

    /// Whether `beginStreamingNewEvents` has been called.
    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }
}

impl Default for InMemoryPcesWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PcesWriter for InMemoryPcesWriter {
    async fn write_event(&self, _sequence: u64) {}

    async fn submit_flush_request(&self, sequence: u64) {
        self.latest_durable.fetch_max(sequence, Ordering::AcqRel);
    }

    fn set_minimum_ancient_identifier_to_store(&self, ancient_identifier: u64) {
        self.minimum_ancient.store(ancient_identifier, Ordering::Release);
    }

    fn begin_streaming_new_events(&self) {
        self.streaming.store(true, Ordering::Release);
    }

    fn latest_durable_sequence_number(&self) -> u64 {
        self.latest_durable.load(Ordering::Acquire)
    }
}

/// One consensus round: a keystone event sequence number and the derived
/// event window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsensusRound {
    /// Round number, monotonically increasing.
    pub round_number: u64,
    /// Stream sequence number of this round's keystone event.
    pub keystone_sequence: u64,
    /// Ancient/non-ancient boundary derived for this round.
    pub ancient_threshold: u64,
}

/// A consensus engine stub: `addEvent` deterministically produces one
/// round per call, with the submitted sequence number as its keystone.
pub struct CountingConsensusEngine {
    rounds_emitted: AtomicU64,
}

impl CountingConsensusEngine {
    /// Construct an engine that has emitted no rounds yet.
    pub fn new() -> Self {
        Self {
            rounds_emitted: AtomicU64::new(0),
        }
    }

    /// `addEvent`: produce the next consensus round for `sequence`.
    pub async fn add_event(&self, sequence: u64) -> ConsensusRound {
        let round_number = self.rounds_emitted.fetch_add(1, Ordering::AcqRel);
        ConsensusRound {
            round_number,
            keystone_sequence: sequence,
            ancient_threshold: round_number,
        }
    }

    /// `outOfBandSnapshotUpdate`: accepted and ignored by this stub.
    pub fn out_of_band_snapshot_update(&self, _ancient_threshold: u64) {}

    /// Rounds produced so far.
    pub fn rounds_emitted(&self) -> u64 {
        self.rounds_emitted.load(Ordering::Acquire)
    }
}

impl Default for CountingConsensusEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// An orphan buffer stub: counts events currently held and tracks the
/// last event window it was told about, clearing both on `clear`.
pub struct CountingOrphanBuffer {
    held: AtomicU64,
    event_window: AtomicU64,
}

impl CountingOrphanBuffer {
    /// Construct an empty buffer.
    pub fn new() -> Self {
        Self {
            held: AtomicU64::new(0),
            event_window: AtomicU64::new(0),
        }
    }

    /// Hold one event.
    pub fn hold(&self) {
        self.held.fetch_add(1, Ordering::AcqRel);
    }

    /// Release one held event (e.g. once its parent becomes non-orphaned).
    pub fn release_one(&self) {
        self.held.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
            Some(n.saturating_sub(1))
        })
        .ok();
    }

    /// Count of events currently held.
    pub fn held_count(&self) -> u64 {
        self.held.load(Ordering::Acquire)
    }

    /// Last ancient threshold received via [`EventWindowSink::set_event_window`].
    pub fn event_window(&self) -> u64 {
        self.event_window.load(Ordering::Acquire)
    }
}

impl Default for CountingOrphanBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Clearable for CountingOrphanBuffer {
    fn clear(&self) {
        self.held.store(0, Ordering::Release);
    }
}

impl EventWindowSink for CountingOrphanBuffer {
    fn set_event_window(&self, ancient_threshold: u64) {
        self.event_window.store(ancient_threshold, Ordering::Release);
    }
}

/// A bare [`Squelchable`] flag, useful where a test needs a squelch
/// target without a whole scheduler attached.
pub struct SquelchFlag {
    squelched: AtomicBool,
}

impl SquelchFlag {
    /// Construct an unsquelched flag.
    pub fn new() -> Self {
        Self {
            squelched: AtomicBool::new(false),
        }
    }
}

impl Default for SquelchFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl Squelchable for SquelchFlag {
    fn set_squelched(&self, squelched: bool) {
        self.squelched.store(squelched, Ordering::Release);
    }

    fn is_squelched(&self) -> bool {
        self.squelched.load(Ordering::Acquire)
    }
}
