//! Shared work-stealing pool for CONCURRENT schedulers
//!
//! CONCURRENT schedulers dispatch onto a single process-wide
//! pool, sized `max(1, defaultPoolMultiplier * cores + defaultPoolConstant)`
//! and built once by the [`crate::wiring::Model`]. Workers keep a local
//! LIFO deque for cache locality, pull in batches from a global injector,
//! and fall back to randomly stealing from siblings before parking.
//!
//! # Example
//! ```no_run
//! use platform_wiring::concurrency::SharedPool;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = SharedPool::new(4)?;
//!     pool.spawn(async { /* CPU-bound handler work */ });
//!     pool.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::deque::{Injector, Stealer, Worker as DequeWorker};

use crate::error::{WiringError, WiringResult};

/// A boxed unit of CONCURRENT-scheduler work.
type Task = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Sizing and tuning for [`SharedPool`].
#[derive(Debug, Clone)]
pub struct SharedPoolConfig {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Steal attempts before a worker parks.
    pub max_steal_attempts: usize,
    /// Park duration between steal rounds.
    pub park_timeout: Duration,
}

impl Default for SharedPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            max_steal_attempts: 16,
            park_timeout: Duration::from_millis(50),
        }
    }
}

/// Metrics the pool tracks about its own utilization.
#[derive(Default)]
pub struct PoolMetrics {
    /// Total tasks handed to the pool.
    pub tasks_spawned: AtomicUsize,
    /// Total tasks that finished running.
    pub tasks_completed: AtomicUsize,
    /// Total tasks picked up via stealing rather than the local queue.
    pub tasks_stolen: AtomicUsize,
}

/// The shared work-stealing pool every CONCURRENT scheduler dispatches onto.
pub struct SharedPool {
    injector: Arc<Injector<Task>>,
    workers: Vec<WorkerHandle>,
    shutdown: Arc<AtomicBool>,
    config: SharedPoolConfig,
    metrics: Arc<PoolMetrics>,
}

struct WorkerHandle {
    thread: Option<thread::JoinHandle<()>>,
}

impl SharedPool {
    /// Build a pool with `worker_count` workers and default tuning.
    pub fn new(worker_count: usize) -> WiringResult<Self> {
        Self::with_config(SharedPoolConfig {
            worker_count,
            ..SharedPoolConfig::default()
        })
    }

    /// Build a pool sized from [`crate::config::PoolConfig::resolve`].
    ///
    /// Each worker's single-threaded runtime is built before its thread is
    /// spawned, so a runtime-build or thread-spawn failure surfaces here as
    /// a [`WiringError`] instead of panicking on the worker thread.
    pub fn with_config(config: SharedPoolConfig) -> WiringResult<Self> {
        let injector = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let metrics = Arc::new(PoolMetrics::default());

        let mut local_queues = Vec::with_capacity(config.worker_count);
        let mut stealers = Vec::with_capacity(config.worker_count);
        for _ in 0..config.worker_count {
            let queue = DequeWorker::new_fifo();
            stealers.push(queue.stealer());
            local_queues.push(queue);
        }
        let stealers = Arc::new(stealers);

        let mut workers = Vec::with_capacity(config.worker_count);
        for (id, local_queue) in local_queues.into_iter().enumerate() {
            let worker = Worker {
                id,
                local_queue,
                injector: injector.clone(),
                shutdown: shutdown.clone(),
                config: config.clone(),
                metrics: metrics.clone(),
            };
            let stealers = stealers.clone();
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| WiringError::Internal {
                    message: format!("failed to build shared-pool worker runtime: {e}"),
                })?;
            let thread = thread::Builder::new()
                .name(format!("wiring-pool-{id}"))
                .spawn(move || worker.run(stealers, runtime))
                .map_err(|e| WiringError::Internal {
                    message: format!("failed to spawn shared-pool worker thread: {e}"),
                })?;
            workers.push(WorkerHandle {
                thread: Some(thread),
            });
        }

        Ok(Self {
            injector,
            workers,
            shutdown,
            config,
            metrics,
        })
    }

    /// Hand a task to the pool. Never blocks; the injector is unbounded.
    /// Backpressure for CONCURRENT schedulers is applied by the owning
    /// scheduler's [`crate::counter::TaskCounter`] before `spawn` is called.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.injector.push(Box::pin(future));
        self.metrics.tasks_spawned.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of live worker threads.
    pub fn worker_count(&self) -> usize {
        self.config.worker_count
    }

    /// Pool utilization counters.
    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }

    /// Signal shutdown and join every worker thread.
    pub async fn shutdown(mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        for handle in self.workers.drain(..) {
            if let Some(thread) = handle.thread {
                let _ = thread.join();
            }
        }
    }
}

struct Worker {
    id: usize,
    local_queue: DequeWorker<Task>,
    injector: Arc<Injector<Task>>,
    shutdown: Arc<AtomicBool>,
    config: SharedPoolConfig,
    metrics: Arc<PoolMetrics>,
}

impl Worker {
    fn run(mut self, stealers: Arc<Vec<Stealer<Task>>>, runtime: tokio::runtime::Runtime) {
        runtime.block_on(async {
            loop {
                if self.shutdown.load(Ordering::Relaxed) {
                    break;
                }

                if let Some(task) = self.local_queue.pop() {
                    self.execute(task).await;
                    continue;
                }

                if let crossbeam::deque::Steal::Success(task) =
                    self.injector.steal_batch_and_pop(&self.local_queue)
                {
                    self.execute(task).await;
                    continue;
                }

                if self.try_steal(&stealers).await {
                    continue;
                }

                tokio::time::sleep(self.config.park_timeout).await;
            }
        });
    }

    async fn try_steal(&mut self, stealers: &[Stealer<Task>]) -> bool {
        for _ in 0..self.config.max_steal_attempts {
            if stealers.len() <= 1 {
                return false;
            }
            let victim = fastrand::usize(..stealers.len());
            if victim == self.id {
                continue;
            }
            match stealers[victim].steal_batch_and_pop(&self.local_queue) {
                crossbeam::deque::Steal::Success(task) => {
                    self.metrics.tasks_stolen.fetch_add(1, Ordering::Relaxed);
                    self.execute(task).await;
                    return true;
                }
                crossbeam::deque::Steal::Empty => {}
                crossbeam::deque::Steal::Retry => continue,
            }
        }
        false
    }

    async fn execute(&self, mut task: Task) {
        task.as_mut().await;
        self.metrics.tasks_completed.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;

    #[tokio::test]
    async fn pool_runs_every_spawned_task() {
        let pool = SharedPool::new(2).unwrap();
        let counter = Arc::new(StdAtomicUsize::new(0));

        for _ in 0..200 {
            let counter = counter.clone();
            pool.spawn(async move {
                counter.fetch_add(1, Ordering::Relaxed);
            });
        }

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(counter.load(Ordering::Relaxed), 200);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn pool_size_matches_requested_worker_count() {
        let pool = SharedPool::new(3).unwrap();
        assert_eq!(pool.worker_count(), 3);
        pool.shutdown().await;
    }
}
