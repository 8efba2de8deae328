//! Wiring framework demo CLI
//!
//! Assembles a toy event-hasher → deduplicator pipeline, drives it with a
//! heartbeat, and prints the model description — a minimal stand-in for
//! the full consensus platform wiring this crate's library targets.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use platform_wiring::config::{ConfigLoader, SchedulerConfig, SchedulerKind, WiringConfig};
use platform_wiring::wiring::{Heartbeat, Model, NoInput, OutputWire, SchedulerSink, SolderKind};
use platform_wiring::Scheduler;

#[derive(Parser)]
#[command(name = "wiring-demo")]
#[command(about = "Demonstrates the component wiring and scheduling framework")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wire a toy pipeline and print its model description.
    Describe,
    /// Wire a toy pipeline, run it for a duration, and report counts.
    Run {
        /// How long to run, in milliseconds.
        #[arg(long, default_value = "500")]
        duration_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = ConfigLoader::load_from_env().context("loading wiring configuration")?;

    match cli.command {
        Commands::Describe => {
            let demo = build_demo_pipeline(&config)?;
            println!("{}", demo.model.describe());
        }
        Commands::Run { duration_ms } => {
            let demo = build_demo_pipeline(&config)?;
            demo.model.start_heartbeats();

            tokio::time::sleep(Duration::from_millis(duration_ms)).await;

            demo.event_hasher.wait_until_empty().await;
            demo.model.stop_heartbeats().await;

            println!(
                "event_hasher processed {} tasks; deduplicator saw {} unique events",
                demo.event_hasher.stats().tasks_completed(),
                demo.deduplicated.load(Ordering::Relaxed)
            );
        }
    }

    Ok(())
}

struct DemoPipeline {
    model: Model,
    event_hasher: Arc<Scheduler<NoInput, ()>>,
    deduplicated: Arc<AtomicU64>,
}

/// Wire `event_hasher -> deduplicator`, with a heartbeat driving the hasher
/// the way the real platform's event-hasher is kept alive between gossip
/// arrivals (the durability buffer's `checkForStaleRounds` is the same
/// shape, one layer up).
///
/// `event_hasher`'s handler emits directly onto its own output wire rather
/// than returning a value for the scheduler to fan out, since the
/// heartbeat drives it through a [`SchedulerSink`] adapter that discards
/// its `Out` (a scheduler's own output wire is soldered independently of
/// whatever soldered it, per [`OutputWire`]'s contract).
fn build_demo_pipeline(config: &WiringConfig) -> anyhow::Result<DemoPipeline> {
    let model = Model::new(config.clone())?;

    let deduplicator = Arc::new(Scheduler::<u64, ()>::new(
        "deduplicator",
        config.scheduler_config("deduplicator"),
        None,
    ));
    let deduplicated = Arc::new(AtomicU64::new(0));
    let deduplicated_clone = deduplicated.clone();
    deduplicator
        .bind(move |_: u64| {
            let deduplicated = deduplicated_clone.clone();
            async move {
                deduplicated.fetch_add(1, Ordering::Relaxed);
            }
        })
        .context("binding the deduplicator handler")?;
    model.register_scheduler("deduplicator", SchedulerKind::Sequential);

    let hasher_output = OutputWire::new("event_hasher.out");
    hasher_output.solder(SolderKind::Default, Arc::new(SchedulerSink::new(deduplicator)));

    let sequence = Arc::new(AtomicU64::new(0));
    let event_hasher = Arc::new(Scheduler::<NoInput, ()>::new(
        "event_hasher",
        SchedulerConfig {
            kind: SchedulerKind::Concurrent,
            unhandled_capacity: Some(config.event_hasher_unhandled_capacity),
            flushable: true,
            squelchable: false,
        },
        Some(model.shared_pool()),
    ));
    let hasher_output_clone = hasher_output.clone();
    event_hasher
        .bind(move |_: NoInput| {
            let sequence = sequence.clone();
            let hasher_output = hasher_output_clone.clone();
            async move {
                let next = sequence.fetch_add(1, Ordering::Relaxed);
                let _ = hasher_output.emit(next).await;
            }
        })
        .context("binding the event_hasher handler")?;
    model.register_scheduler("event_hasher", SchedulerKind::Concurrent);
    model
        .register_edge("event_hasher", "deduplicator", false)
        .context("event_hasher -> deduplicator wiring")?;

    let heartbeat_output = OutputWire::new("heartbeat.out");
    heartbeat_output.solder(SolderKind::Offer, Arc::new(SchedulerSink::new(event_hasher.clone())));
    let heartbeat = Arc::new(Heartbeat::new(
        "event_hasher_heartbeat",
        config.heartbeats.stale_round_check_period,
        heartbeat_output,
    ));
    model.register_heartbeat(heartbeat);

    Ok(DemoPipeline {
        model,
        event_hasher,
        deduplicated,
    })
}
