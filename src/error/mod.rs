//! Error taxonomy for the wiring framework
//!
//! This module mirrors the five-category taxonomy the framework is specified
//! against: build errors, backpressure cancellation, handler exceptions,
//! reservation leaks, and durability violations. Build errors are fatal at
//! startup; handler exceptions are isolated to the offending task;
//! reservation leaks are reported but non-fatal; durability violations are
//! fatal (an invariant breach, not a recoverable condition).

use thiserror::Error;

/// Result type for wiring operations.
pub type WiringResult<T> = Result<T, WiringError>;

/// Errors produced by the wiring framework.
#[derive(Error, Debug)]
pub enum WiringError {
    // --- Build errors: fatal at startup ---
    /// A cycle was found in the graph that does not cross an INJECT edge or a
    /// DIRECT/DIRECT_THREADSAFE scheduler.
    #[error("cycle detected through non-INJECT edge: {path}")]
    CycleWithoutInject {
        /// Human-readable description of the offending cycle.
        path: String,
    },

    /// An input wire was bound to a handler more than once.
    #[error("input wire '{wire}' on scheduler '{scheduler}' already has a handler bound")]
    DoubleBind {
        /// Scheduler name.
        scheduler: String,
        /// Wire name.
        wire: String,
    },

    /// A wire was soldered or referenced before it was built.
    #[error("wire '{wire}' referenced before it was built")]
    UnboundWire {
        /// Wire name.
        wire: String,
    },

    /// A scheduler was built with no handler for a declared input wire.
    #[error("scheduler '{scheduler}' has no handler for input wire '{wire}'")]
    MissingHandler {
        /// Scheduler name.
        scheduler: String,
        /// Wire name.
        wire: String,
    },

    /// A CONCURRENT scheduler was built without the shared pool it dispatches
    /// onto.
    #[error("scheduler '{scheduler}' is CONCURRENT but was built without a shared pool")]
    MissingPool {
        /// Scheduler name.
        scheduler: String,
    },

    // --- Backpressure cancellation: not fatal, on-ramp not performed ---
    /// A parked on-ramp observed cancellation before the increment succeeded.
    #[error("on-ramp to '{counter}' cancelled while parked")]
    Cancelled {
        /// Name of the counter that was being on-ramped.
        counter: String,
    },

    // --- Handler exceptions: isolated to the task ---
    /// A scheduler's bound handler panicked while processing a task.
    #[error("handler for '{scheduler}' panicked: {message}")]
    HandlerPanicked {
        /// Scheduler name.
        scheduler: String,
        /// Captured panic message.
        message: String,
    },

    // --- Reservation leaks: reported, non-fatal ---
    /// A reservable value was disposed with outstanding, unreleased
    /// reservations.
    #[error("reservation leak on '{value}': {outstanding} outstanding release(s)")]
    ReservationLeak {
        /// Identifier of the leaked value.
        value: String,
        /// Count of releases that never happened.
        outstanding: u32,
    },

    // --- Durability violations: fatal, invariant breach ---
    /// A consensus round reached the round handler before its keystone event
    /// was durable.
    #[error(
        "durability violation: round with keystone sequence {keystone_sequence} delivered \
         before latest durable sequence {latest_durable}"
    )]
    DurabilityViolation {
        /// Keystone sequence number of the offending round.
        keystone_sequence: u64,
        /// Latest durable sequence number known at delivery time.
        latest_durable: u64,
    },

    /// Catch-all for conditions that do not fit the taxonomy above.
    #[error("internal wiring error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl WiringError {
    /// Whether this error aborts startup (a build error).
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            Self::CycleWithoutInject { .. }
                | Self::DoubleBind { .. }
                | Self::UnboundWire { .. }
                | Self::MissingHandler { .. }
                | Self::MissingPool { .. }
        )
    }

    /// Whether this error must terminate the process (an invariant breach).
    pub fn is_fatal(&self) -> bool {
        self.is_build_error() || matches!(self, Self::DurabilityViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_errors_are_fatal() {
        let err = WiringError::DoubleBind {
            scheduler: "orphan_buffer".into(),
            wire: "event_in".into(),
        };
        assert!(err.is_build_error());
        assert!(err.is_fatal());
    }

    #[test]
    fn reservation_leak_is_not_fatal() {
        let err = WiringError::ReservationLeak {
            value: "signed-state-12".into(),
            outstanding: 1,
        };
        assert!(!err.is_fatal());
    }

    #[test]
    fn durability_violation_is_fatal_but_not_a_build_error() {
        let err = WiringError::DurabilityViolation {
            keystone_sequence: 42,
            latest_durable: 40,
        };
        assert!(err.is_fatal());
        assert!(!err.is_build_error());
    }
}
