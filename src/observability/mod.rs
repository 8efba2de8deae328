//! Logging and observability layer
//!
//! The framework exposes no metrics-export surface: observable output is
//! textual, carried on `tracing` spans. This module
//! wraps the span sites the coordinator and scheduler use, and a small
//! in-process counter set for the model's startup summary.

pub mod metrics;
pub mod tracing;

pub use metrics::WiringMetrics;
pub use tracing::{TracingConfig, WiringTracer};
