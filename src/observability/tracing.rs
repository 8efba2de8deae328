//! Span sites used by the model, scheduler, and coordinator
//!
//! `tracing-subscriber`'s `EnvFilter` selects verbosity at startup from
//! [`crate::config::LoggingConfig`]; this module only owns the span shapes,
//! not the subscriber itself (the binary entry point installs one).

use tracing::{span, Level, Span};

/// Tracing configuration, independent of the subscriber that consumes it.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name attached to every span.
    pub service_name: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "platform-wiring".to_string(),
        }
    }
}

/// Span factory for wiring-lifecycle events.
pub struct WiringTracer {
    config: TracingConfig,
}

impl WiringTracer {
    /// Create a tracer with the given config.
    pub fn new(config: TracingConfig) -> Self {
        Self { config }
    }

    /// Span covering model construction (wiring build time).
    pub fn model_build_span(&self) -> Span {
        span!(Level::INFO, "model.build", service = %self.config.service_name)
    }

    /// Span covering a scheduler's start/stop transition.
    pub fn scheduler_lifecycle_span(&self, scheduler: &str, transition: &str) -> Span {
        span!(
            Level::INFO,
            "scheduler.lifecycle",
            scheduler.name = scheduler,
            scheduler.transition = transition
        )
    }

    /// Span covering a squelch phase transition.
    pub fn squelch_span(&self, scheduler: &str, squelched: bool) -> Span {
        span!(
            Level::INFO,
            "scheduler.squelch",
            scheduler.name = scheduler,
            scheduler.squelched = squelched
        )
    }

    /// Span covering one phase of the coordinator's clear algorithm.
    pub fn clear_phase_span(&self, phase: &str) -> Span {
        span!(Level::INFO, "coordinator.clear_phase", phase)
    }

    /// Span covering the intake flush algorithm.
    pub fn flush_span(&self) -> Span {
        span!(Level::INFO, "coordinator.flush_intake")
    }

    /// Span covering a durability-buffer admission decision.
    pub fn durability_admission_span(&self, keystone_sequence: u64, admitted: bool) -> Span {
        span!(
            Level::INFO,
            "pces.durability_admission",
            round.keystone_sequence = keystone_sequence,
            admitted
        )
    }
}

impl Default for WiringTracer {
    fn default() -> Self {
        Self::new(TracingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracer_builds_spans() {
        let tracer = WiringTracer::default();
        let _span = tracer.model_build_span();
        let _span = tracer.scheduler_lifecycle_span("orphan_buffer", "start");
        let _span = tracer.clear_phase_span("squelch");
    }
}
