//! Concurrency primitives shared by the scheduler and coordinator layers
//!
//! - [`cancel_token`] backs cancellation of parked backpressure on-ramps.
//! - [`work_stealing`] is the shared pool CONCURRENT schedulers dispatch
//!   onto, sized per [`crate::config::PoolConfig`].

pub mod cancel_token;
pub mod work_stealing;

pub use cancel_token::{CancelScope, CancelToken};
pub use work_stealing::{SharedPool, SharedPoolConfig};

/// Result type for concurrency-primitive operations.
pub type ConcurrencyResult<T> = Result<T, ConcurrencyError>;

/// Concurrency-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum ConcurrencyError {
    /// A task observed cancellation before completing.
    #[error("task cancelled")]
    Cancelled,

    /// A spawned task's join handle returned an error.
    #[error("join error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}
