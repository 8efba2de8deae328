//! Component wiring and scheduling framework for a consensus platform's
//! event-processing pipeline.
//!
//! This crate provides the task counters, scheduler variants, and wire
//! graph operators components are soldered together with, the coordinator's
//! reconnect lifecycle (intake flush, squelch/flush/clear), and the
//! preconsensus event stream's durability and keystone-flush protocol.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod components;
pub mod concurrency;
pub mod config;
pub mod coordinator;
pub mod counter;
pub mod error;
pub mod observability;
pub mod pces;
pub mod reservation;
pub mod scheduler;
pub mod wiring;

pub use config::{ConfigLoader, SchedulerKind, WiringConfig};
pub use coordinator::Coordinator;
pub use counter::TaskCounter;
pub use error::{WiringError, WiringResult};
pub use pces::{keystone_flush_solder, FlushRequestTransformer, RoundDurabilityBuffer};
pub use reservation::Reserved;
pub use scheduler::Scheduler;
pub use wiring::{
    AdvancedTransformer, Filter, Heartbeat, Model, NoInput, OrderedSolder, OutputWire, Sink,
    SolderKind, Splitter, Transformer,
};
