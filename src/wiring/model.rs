//! The model: registry of schedulers, the shared pool, heartbeats, and the
//! build-time cycle check.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::concurrency::{SharedPool, SharedPoolConfig};
use crate::config::{SchedulerKind, WiringConfig};
use crate::error::{WiringError, WiringResult};
use crate::observability::tracing::{TracingConfig, WiringTracer};
use crate::wiring::heartbeat::Heartbeat;

struct Edge {
    from: String,
    to: String,
    injected: bool,
}

/// Owns the process-wide shared pool, the scheduler-kind registry used for
/// the cycle check, and the set of heartbeat sources.
///
/// Individual [`crate::scheduler::Scheduler`] instances remain owned by
/// application wiring code (their input/output types vary per component);
/// the model tracks only what every scheduler has in common: its name,
/// kind, and the solder edges reaching it.
pub struct Model {
    config: WiringConfig,
    pool: Arc<SharedPool>,
    tracer: WiringTracer,
    scheduler_kinds: RwLock<HashMap<String, SchedulerKind>>,
    edges: RwLock<Vec<Edge>>,
    heartbeats: RwLock<Vec<(Arc<Heartbeat>, Option<tokio::task::JoinHandle<()>>)>>,
}

impl Model {
    /// Build a model from `config`, sizing the shared pool immediately.
    pub fn new(config: WiringConfig) -> WiringResult<Self> {
        let cores = num_cpus::get();
        let pool = Arc::new(SharedPool::with_config(SharedPoolConfig {
            worker_count: config.pool.resolve(cores),
            ..SharedPoolConfig::default()
        })?);
        let tracer = WiringTracer::new(TracingConfig {
            service_name: "platform-wiring".to_string(),
        });

        Ok(Self {
            config,
            pool,
            tracer,
            scheduler_kinds: RwLock::new(HashMap::new()),
            edges: RwLock::new(Vec::new()),
            heartbeats: RwLock::new(Vec::new()),
        })
    }

    /// The shared work-stealing pool every CONCURRENT scheduler dispatches onto.
    pub fn shared_pool(&self) -> Arc<SharedPool> {
        self.pool.clone()
    }

    /// The loaded configuration.
    pub fn config(&self) -> &WiringConfig {
        &self.config
    }

    /// The model's tracer, for span-per-lifecycle-operation logging.
    pub fn tracer(&self) -> &WiringTracer {
        &self.tracer
    }

    /// Register a scheduler's name and kind, for the cycle check and for
    /// [`Model::describe`].
    pub fn register_scheduler(&self, name: impl Into<String>, kind: SchedulerKind) {
        self.scheduler_kinds.write().insert(name.into(), kind);
    }

    /// Record a solder edge between two named schedulers and re-run the
    /// cycle check. `injected` marks an INJECT edge, which may legally
    /// close a cycle.
    pub fn register_edge(
        &self,
        from: impl Into<String>,
        to: impl Into<String>,
        injected: bool,
    ) -> WiringResult<()> {
        self.edges.write().push(Edge {
            from: from.into(),
            to: to.into(),
            injected,
        });
        self.check_for_illegal_cycle()
    }

    /// Register (and do not yet start) a heartbeat source.
    pub fn register_heartbeat(&self, heartbeat: Arc<Heartbeat>) {
        self.heartbeats.write().push((heartbeat, None));
    }

    /// Start every registered heartbeat.
    pub fn start_heartbeats(&self) {
        let mut heartbeats = self.heartbeats.write();
        for (heartbeat, handle) in heartbeats.iter_mut() {
            if handle.is_none() {
                *handle = Some(heartbeat.start());
            }
        }
    }

    /// Stop every registered heartbeat and await its tick loop exiting.
    pub async fn stop_heartbeats(&self) {
        let handles: Vec<_> = {
            let mut heartbeats = self.heartbeats.write();
            heartbeats
                .iter_mut()
                .map(|(heartbeat, handle)| {
                    heartbeat.stop();
                    handle.take()
                })
                .collect()
        };
        for handle in handles.into_iter().flatten() {
            let _ = handle.await;
        }
    }

    /// A textual description of the registered schedulers and edges, in
    /// the spirit of a wire diagram. No wire-protocol surface is exposed;
    /// this is diagnostic output only.
    pub fn describe(&self) -> String {
        let kinds = self.scheduler_kinds.read();
        let edges = self.edges.read();

        let mut out = String::from("platform-wiring model\n");
        let mut names: Vec<_> = kinds.keys().collect();
        names.sort();
        for name in names {
            out.push_str(&format!("  scheduler {name} [{:?}]\n", kinds[name]));
        }
        for edge in edges.iter() {
            let kind = if edge.injected { "INJECT" } else { "default/offer" };
            out.push_str(&format!("  {} --{}--> {}\n", edge.from, kind, edge.to));
        }
        out
    }

    /// Walk the non-INJECT subgraph restricted to SEQUENTIAL/CONCURRENT
    /// schedulers (the only ones that hold a queue and so can deadlock) and
    /// fail if it contains a cycle.
    fn check_for_illegal_cycle(&self) -> WiringResult<()> {
        let kinds = self.scheduler_kinds.read();
        let edges = self.edges.read();

        let is_queueing = |name: &str| {
            matches!(
                kinds.get(name),
                Some(SchedulerKind::Sequential) | Some(SchedulerKind::Concurrent)
            )
        };

        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in edges.iter() {
            if edge.injected {
                continue;
            }
            if is_queueing(&edge.from) && is_queueing(&edge.to) {
                adjacency.entry(&edge.from).or_default().push(&edge.to);
            }
        }

        let mut visiting = std::collections::HashSet::new();
        let mut visited = std::collections::HashSet::new();
        let mut stack = Vec::new();

        for &start in adjacency.keys() {
            if visited.contains(start) {
                continue;
            }
            if let Some(cycle) = Self::dfs(start, &adjacency, &mut visiting, &mut visited, &mut stack) {
                return Err(WiringError::CycleWithoutInject { path: cycle });
            }
        }
        Ok(())
    }

    fn dfs<'a>(
        node: &'a str,
        adjacency: &HashMap<&'a str, Vec<&'a str>>,
        visiting: &mut std::collections::HashSet<&'a str>,
        visited: &mut std::collections::HashSet<&'a str>,
        stack: &mut Vec<&'a str>,
    ) -> Option<String> {
        visiting.insert(node);
        stack.push(node);

        if let Some(neighbors) = adjacency.get(node) {
            for &next in neighbors {
                if visiting.contains(next) {
                    let start = stack.iter().position(|&n| n == next).unwrap_or(0);
                    let mut path: Vec<&str> = stack[start..].to_vec();
                    path.push(next);
                    return Some(path.join(" -> "));
                }
                if !visited.contains(next) {
                    if let Some(cycle) = Self::dfs(next, adjacency, visiting, visited, stack) {
                        return Some(cycle);
                    }
                }
            }
        }

        stack.pop();
        visiting.remove(node);
        visited.insert(node);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_edge_cycle_between_sequential_schedulers_is_rejected() {
        let model = Model::new(WiringConfig::default()).unwrap();
        model.register_scheduler("a", SchedulerKind::Sequential);
        model.register_scheduler("b", SchedulerKind::Sequential);
        model.register_edge("a", "b", false).unwrap();
        let err = model.register_edge("b", "a", false).unwrap_err();
        assert!(matches!(err, WiringError::CycleWithoutInject { .. }));
    }

    #[test]
    fn inject_edge_breaks_the_cycle_rule() {
        let model = Model::new(WiringConfig::default()).unwrap();
        model.register_scheduler("a", SchedulerKind::Sequential);
        model.register_scheduler("b", SchedulerKind::Sequential);
        model.register_edge("a", "b", false).unwrap();
        model.register_edge("b", "a", true).unwrap();
    }

    #[test]
    fn cycle_through_a_direct_scheduler_is_legal() {
        let model = Model::new(WiringConfig::default()).unwrap();
        model.register_scheduler("a", SchedulerKind::Sequential);
        model.register_scheduler("adapter", SchedulerKind::Direct);
        model.register_edge("a", "adapter", false).unwrap();
        model.register_edge("adapter", "a", false).unwrap();
    }

    #[test]
    fn describe_lists_schedulers_and_edges() {
        let model = Model::new(WiringConfig::default()).unwrap();
        model.register_scheduler("event_hasher", SchedulerKind::Concurrent);
        model.register_edge("event_hasher", "deduplicator", false).unwrap();
        let description = model.describe();
        assert!(description.contains("event_hasher"));
        assert!(description.contains("deduplicator"));
    }
}
