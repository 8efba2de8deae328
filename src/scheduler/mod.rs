//! Scheduler variants that execute a bound component's handler
//!
//! A single generic [`Scheduler<In, Out>`] dispatches on [`SchedulerKind`]
//! rather than five duplicated types, since the variant only changes *how*
//! a handler runs, never its interface.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{Mutex as AsyncMutex, OnceCell};
use tracing::error;

use crate::concurrency::SharedPool;
use crate::config::{SchedulerConfig, SchedulerKind};
use crate::counter::TaskCounter;
use crate::error::{WiringError, WiringResult};

/// A boxed, owned future — the shape every scheduler handler returns.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// The bound handler for a scheduler's single input wire.
pub type Handler<In, Out> = Arc<dyn Fn(In) -> BoxFuture<Out> + Send + Sync>;

/// An out-of-band reporter for uncaught handler errors.
/// When set on a scheduler, every [`WiringError::HandlerPanicked`] is handed
/// to it in addition to being logged.
pub type ErrorReporter = Arc<dyn Fn(WiringError) + Send + Sync>;

/// Execution counters for a single scheduler.
#[derive(Default)]
pub struct SchedulerStats {
    tasks_submitted: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_squelched: AtomicU64,
    handler_panics: AtomicU64,
}

impl SchedulerStats {
    /// Tasks accepted (on-ramped), regardless of outcome.
    pub fn tasks_submitted(&self) -> u64 {
        self.tasks_submitted.load(Ordering::Relaxed)
    }

    /// Tasks whose handler ran to completion.
    pub fn tasks_completed(&self) -> u64 {
        self.tasks_completed.load(Ordering::Relaxed)
    }

    /// Tasks discarded by squelch or NO_OP.
    pub fn tasks_squelched(&self) -> u64 {
        self.tasks_squelched.load(Ordering::Relaxed)
    }

    /// Handler invocations that panicked.
    pub fn handler_panics(&self) -> u64 {
        self.handler_panics.load(Ordering::Relaxed)
    }
}

/// An executor for one bound component's task stream.
///
/// `In`/`Out` are the component method's argument and return type. `Out`
/// carries `()` for void methods (no output wire).
pub struct Scheduler<In, Out> {
    name: String,
    kind: SchedulerKind,
    counter: TaskCounter,
    squelched: Arc<AtomicBool>,
    squelchable: bool,
    handler: OnceCell<Handler<In, Out>>,
    sequential_lock: Arc<AsyncMutex<()>>,
    pool: Option<Arc<SharedPool>>,
    stats: Arc<SchedulerStats>,
    error_reporter: Option<ErrorReporter>,
}

impl<In, Out> Scheduler<In, Out>
where
    In: Send + 'static,
    Out: Send + 'static,
{
    /// Build an unbound scheduler. `pool` is required (and only used) for
    /// [`SchedulerKind::Concurrent`].
    pub fn new(name: impl Into<String>, config: SchedulerConfig, pool: Option<Arc<SharedPool>>) -> Self {
        let counter = match config.unhandled_capacity {
            Some(capacity) => {
                TaskCounter::backpressuring(capacity as i64, std::time::Duration::from_millis(5))
            }
            None => TaskCounter::unbounded(),
        };

        Self {
            name: name.into(),
            kind: config.kind,
            counter,
            squelched: Arc::new(AtomicBool::new(false)),
            squelchable: config.squelchable,
            handler: OnceCell::new(),
            sequential_lock: Arc::new(AsyncMutex::new(())),
            pool,
            stats: Arc::new(SchedulerStats::default()),
            error_reporter: None,
        }
    }

    /// Register a separate out-of-band reporter invoked with every
    /// uncaught handler error.
    pub fn with_error_reporter(mut self, reporter: ErrorReporter) -> Self {
        self.error_reporter = Some(reporter);
        self
    }

    /// Bind the component's handler. May only be called once.
    pub fn bind<F, Fut>(&self, handler: F) -> WiringResult<()>
    where
        F: Fn(In) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Out> + Send + 'static,
    {
        let boxed: Handler<In, Out> = Arc::new(move |input| Box::pin(handler(input)));
        self.handler.set(boxed).map_err(|_| WiringError::DoubleBind {
            scheduler: self.name.clone(),
            wire: "input".to_string(),
        })
    }

    /// Scheduler name, as supplied at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current in-flight task count.
    pub fn count(&self) -> i64 {
        self.counter.get_count()
    }

    /// Block until no task is in flight.
    pub async fn wait_until_empty(&self) {
        self.counter.wait_until_empty().await;
    }

    /// Enable or disable squelch mode. A no-op if this scheduler was not
    /// declared squelchable.
    pub fn set_squelched(&self, squelched: bool) {
        if self.squelchable {
            self.squelched.store(squelched, Ordering::Release);
        }
    }

    /// Whether squelch mode is currently active.
    pub fn is_squelched(&self) -> bool {
        self.squelched.load(Ordering::Acquire)
    }

    /// Execution counters.
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Submit one task, blocking (parking) while the counter is at capacity
    /// (the default-edge solder policy). `fan_out` is run with the handler's
    /// output *before* the counter off-ramps, so backpressure from soldered
    /// downstreams is still visible to this scheduler's upstream.
    pub async fn submit_with_fan_out<Fut>(
        &self,
        input: In,
        fan_out: impl FnOnce(Out) -> Fut + Send + 'static,
    ) -> WiringResult<()>
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.kind == SchedulerKind::NoOp {
            self.stats.tasks_squelched.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }
        self.counter.on_ramp().await;
        self.dispatch(input, fan_out).await
    }

    /// Best-effort submit (the OFFER-edge policy): never parks. Returns
    /// whether the task was accepted; `false` means it was dropped because
    /// the counter was at capacity.
    pub async fn try_submit_with_fan_out<Fut>(
        &self,
        input: In,
        fan_out: impl FnOnce(Out) -> Fut + Send + 'static,
    ) -> WiringResult<bool>
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.kind == SchedulerKind::NoOp {
            self.stats.tasks_squelched.fetch_add(1, Ordering::Relaxed);
            return Ok(false);
        }
        if !self.counter.attempt_on_ramp() {
            return Ok(false);
        }
        self.dispatch(input, fan_out).await.map(|_| true)
    }

    /// Force a submit (the INJECT-edge policy): bypasses capacity entirely,
    /// guaranteeing progress at the cost of unbounded counter growth.
    pub async fn force_submit_with_fan_out<Fut>(
        &self,
        input: In,
        fan_out: impl FnOnce(Out) -> Fut + Send + 'static,
    ) -> WiringResult<()>
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.kind == SchedulerKind::NoOp {
            self.stats.tasks_squelched.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }
        self.counter.force_on_ramp();
        self.dispatch(input, fan_out).await
    }

    async fn dispatch<Fut>(
        &self,
        input: In,
        fan_out: impl FnOnce(Out) -> Fut + Send + 'static,
    ) -> WiringResult<()>
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stats.tasks_submitted.fetch_add(1, Ordering::Relaxed);

        if self.is_squelched() {
            self.stats.tasks_squelched.fetch_add(1, Ordering::Relaxed);
            self.counter.off_ramp();
            return Ok(());
        }

        let handler = match self.handler.get().cloned() {
            Some(handler) => handler,
            None => {
                self.counter.off_ramp();
                return Err(WiringError::MissingHandler {
                    scheduler: self.name.clone(),
                    wire: "input".to_string(),
                });
            }
        };

        match self.kind {
            SchedulerKind::Sequential => {
                let _permit = self.sequential_lock.lock().await;
                self.run_inline(&handler, input, fan_out).await;
            }
            SchedulerKind::Direct | SchedulerKind::DirectThreadsafe => {
                // DIRECT never suspends and runs unsynchronized; DIRECT_THREADSAFE
                // runs on the caller thread too, but its handler (supplied by the
                // bound component) is responsible for its own interior
                // synchronization.
                self.run_inline(&handler, input, fan_out).await;
            }
            SchedulerKind::Concurrent => {
                let pool = match self.pool.as_ref() {
                    Some(pool) => pool.clone(),
                    None => {
                        self.counter.off_ramp();
                        return Err(WiringError::MissingPool {
                            scheduler: self.name.clone(),
                        });
                    }
                };
                let counter = self.counter.clone();
                let stats = self.stats.clone();
                let name = self.name.clone();
                let reporter = self.error_reporter.clone();
                pool.spawn(async move {
                    Self::run_handler(&handler, input, fan_out, &counter, &stats, &name, reporter.as_ref()).await;
                });
            }
            SchedulerKind::NoOp => unreachable!("handled above"),
        }

        Ok(())
    }

    async fn run_inline<Fut>(
        &self,
        handler: &Handler<In, Out>,
        input: In,
        fan_out: impl FnOnce(Out) -> Fut + Send + 'static,
    ) where
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::run_handler(
            handler,
            input,
            fan_out,
            &self.counter,
            &self.stats,
            &self.name,
            self.error_reporter.as_ref(),
        )
        .await;
    }

    /// Run the handler, fan out its output, and off-ramp the counter. A
    /// handler panic is caught here: it is logged and the counter still
    /// decrements, but no value reaches the soldered downstreams.
    async fn run_handler<Fut>(
        handler: &Handler<In, Out>,
        input: In,
        fan_out: impl FnOnce(Out) -> Fut + Send + 'static,
        counter: &TaskCounter,
        stats: &SchedulerStats,
        name: &str,
        reporter: Option<&ErrorReporter>,
    ) where
        Fut: Future<Output = ()> + Send + 'static,
    {
        match AssertUnwindSafe(handler(input)).catch_unwind().await {
            Ok(output) => {
                fan_out(output).await;
                stats.tasks_completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "handler panicked with a non-string payload".to_string());
                stats.handler_panics.fetch_add(1, Ordering::Relaxed);
                error!(scheduler = name, %message, "handler panicked");
                if let Some(reporter) = reporter {
                    reporter(WiringError::HandlerPanicked {
                        scheduler: name.to_string(),
                        message,
                    });
                }
            }
        }
        counter.off_ramp();
    }
}
