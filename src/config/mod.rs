//! Configuration for the wiring framework
//!
//! Layered configuration: built-in defaults, optionally overridden by a
//! loaded file, finally overridden by environment variables. `validate()`
//! runs after every load.

use crate::error::{WiringError, WiringResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Loads [`WiringConfig`] from defaults, a file, or the environment.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML/JSON file on disk.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> WiringResult<WiringConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| WiringError::Internal {
            message: format!("failed to read config file: {e}"),
        })?;
        Self::load_from_str(&content)
    }

    /// Load configuration from a JSON string.
    pub fn load_from_str(content: &str) -> WiringResult<WiringConfig> {
        let config: WiringConfig = serde_json::from_str(content).map_err(|e| WiringError::Internal {
            message: format!("failed to parse config: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load defaults and apply `PLATFORM_WIRING_*` environment overrides.
    pub fn load_from_env() -> WiringResult<WiringConfig> {
        let mut config = WiringConfig::default();

        if let Ok(val) = std::env::var("PLATFORM_WIRING_POOL_MULTIPLIER") {
            if let Ok(parsed) = val.parse() {
                config.pool.default_pool_multiplier = parsed;
            }
        }
        if let Ok(val) = std::env::var("PLATFORM_WIRING_POOL_CONSTANT") {
            if let Ok(parsed) = val.parse() {
                config.pool.default_pool_constant = parsed;
            }
        }
        if let Ok(val) = std::env::var("PLATFORM_WIRING_EVENT_HASHER_CAPACITY") {
            if let Ok(parsed) = val.parse() {
                config.event_hasher_unhandled_capacity = parsed;
            }
        }
        if let Ok(val) = std::env::var("PLATFORM_WIRING_LOG_LEVEL") {
            config.logging.level = val;
        }
        if let Ok(val) = std::env::var("PLATFORM_WIRING_FORCE_IGNORE_PCES_SIGNATURES") {
            config.testing.force_ignore_pces_signatures = val == "1" || val.eq_ignore_ascii_case("true");
        }

        config.validate()?;
        Ok(config)
    }
}

/// Top-level wiring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WiringConfig {
    /// Shared work-stealing pool sizing.
    pub pool: PoolConfig,
    /// Per-component scheduler configuration, keyed by component name.
    pub schedulers: HashMap<String, SchedulerConfig>,
    /// Shared capacity of the event-hasher / post-hash-collector counter.
    pub event_hasher_unhandled_capacity: usize,
    /// Heartbeat periods for heartbeat-driven components.
    pub heartbeats: HeartbeatConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Testing-only overrides.
    pub testing: TestingConfig,
}

impl WiringConfig {
    /// Validate the whole configuration tree.
    pub fn validate(&self) -> WiringResult<()> {
        self.pool.validate()?;
        self.logging.validate()?;
        for (name, sched) in &self.schedulers {
            sched.validate().map_err(|e| WiringError::Internal {
                message: format!("scheduler '{name}': {e}"),
            })?;
        }
        Ok(())
    }

    /// Look up scheduler config for a named component, falling back to a
    /// SEQUENTIAL default if the component was not explicitly configured.
    pub fn scheduler_config(&self, component: &str) -> SchedulerConfig {
        self.schedulers
            .get(component)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for WiringConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            schedulers: HashMap::new(),
            event_hasher_unhandled_capacity: 10_000,
            heartbeats: HeartbeatConfig::default(),
            logging: LoggingConfig::default(),
            testing: TestingConfig::default(),
        }
    }
}

/// Shared work-stealing pool sizing: `max(1, multiplier * cores + constant)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Multiplier applied to the detected core count.
    pub default_pool_multiplier: f64,
    /// Constant added after the multiplier.
    pub default_pool_constant: i64,
}

impl PoolConfig {
    /// Validate pool sizing parameters.
    pub fn validate(&self) -> WiringResult<()> {
        if self.default_pool_multiplier < 0.0 {
            return Err(WiringError::Internal {
                message: "default_pool_multiplier must be non-negative".into(),
            });
        }
        Ok(())
    }

    /// Resolve the pool size for a given core count.
    pub fn resolve(&self, cores: usize) -> usize {
        let sized = (self.default_pool_multiplier * cores as f64) as i64 + self.default_pool_constant;
        sized.max(1) as usize
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            default_pool_multiplier: 1.0,
            default_pool_constant: 0,
        }
    }
}

/// The five scheduler variants a component may be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerKind {
    /// Single-threaded, FIFO, preserves submission order.
    Sequential,
    /// Parallel on the shared pool, no ordering.
    Concurrent,
    /// Caller-thread, unsynchronized.
    Direct,
    /// Caller-thread, safe under concurrent callers.
    DirectThreadsafe,
    /// Drops every task.
    NoOp,
}

/// Per-component scheduler configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Scheduler variant.
    pub kind: SchedulerKind,
    /// Backpressure capacity. `None` means unbounded (never backpressures).
    pub unhandled_capacity: Option<usize>,
    /// Whether this scheduler participates in the flush algorithm.
    pub flushable: bool,
    /// Whether this scheduler can be squelched during reconnect.
    pub squelchable: bool,
}

impl SchedulerConfig {
    /// Validate this scheduler's configuration.
    pub fn validate(&self) -> WiringResult<()> {
        if self.kind == SchedulerKind::NoOp && self.unhandled_capacity.is_some() {
            return Err(WiringError::Internal {
                message: "a NO_OP scheduler cannot declare a backpressure capacity".into(),
            });
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            kind: SchedulerKind::Sequential,
            unhandled_capacity: Some(10_000),
            flushable: true,
            squelchable: false,
        }
    }
}

/// Heartbeat periods for the heartbeat-driven components in the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Period between `checkForStaleRounds` ticks on the durability buffer.
    pub stale_round_check_period: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            stale_round_check_period: Duration::from_millis(500),
        }
    }
}

/// Logging configuration, layered over `tracing`/`tracing-subscriber`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter string (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Emit structured (span-field) logs rather than plain text.
    pub structured: bool,
}

impl LoggingConfig {
    /// Validate the log level name.
    pub fn validate(&self) -> WiringResult<()> {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&self.level.as_str()) {
            return Err(WiringError::Internal {
                message: format!("invalid log level: {}", self.level),
            });
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            structured: true,
        }
    }
}

/// Testing-only configuration overrides, never set in production.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TestingConfig {
    /// Skip PCES signature validation (unit/integration tests only).
    pub force_ignore_pces_signatures: bool,
    /// Validate the initial state snapshot at startup.
    pub validate_initial_state: bool,
}

impl Default for TestingConfig {
    fn default() -> Self {
        Self {
            force_ignore_pces_signatures: false,
            validate_initial_state: true,
        }
    }
}
