//! Component binding surface: the capability traits domain components
//! implement, and stub implementations used by the framework's own tests
//! in place of the real domain components.
//!
//! Components never reference each other directly, only via wires; the
//! framework depends only on these traits, never on a concrete domain type.

pub mod stubs;

use async_trait::async_trait;

/// A component that handles an input of type `T`, optionally producing
/// `Out`. This mirrors the method a [`crate::scheduler::Scheduler`]'s
/// bound handler implements, expressed as a standalone trait so components
/// can be constructed independently of the scheduler that will host them.
#[async_trait]
pub trait Handle<T, Out = ()>: Send + Sync {
    /// Handle one input, producing an output (or `()` for a void method).
    async fn handle(&self, input: T) -> Out;
}

/// A component whose internal state is reset synchronously when a `clear`
/// command is injected during the coordinator's clear phase.
pub trait Clearable: Send + Sync {
    /// Reset internal state. Must complete synchronously.
    fn clear(&self);
}

/// A component that consumes event-window updates, always via an INJECT
/// edge: the orphan buffer, deduplicator, validators, and event-window
/// manager all consume `setEventWindow` this way.
pub trait EventWindowSink: Send + Sync {
    /// Advance the ancient/non-ancient boundary.
    fn set_event_window(&self, ancient_threshold: u64);
}

/// A component that can be squelched during the coordinator's squelch and
/// stop-squelching phases.
pub trait Squelchable: Send + Sync {
    /// Enable or disable squelch mode.
    fn set_squelched(&self, squelched: bool);
    /// Whether squelch mode is currently active.
    fn is_squelched(&self) -> bool;
}
