//! Wire graph operators: solder, transformer, splitter, filter, advanced
//! transformer, ordered solder, heartbeat source, and the `Model` registry
//! that owns them all.
//!
//! Generalizes a fixed named-stage pipeline into an arbitrary soldered
//! graph of typed wires.

mod heartbeat;
mod model;
mod operators;
mod ordered_solder;
mod output_wire;

pub use heartbeat::{Heartbeat, NoInput};
pub use model::Model;
pub use operators::{AdvancedTransformer, Filter, Splitter, Transformer};
pub use ordered_solder::OrderedSolder;
pub use output_wire::{OutputWire, SchedulerSink, Sink, SolderKind};
