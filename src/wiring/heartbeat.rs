//! Heartbeat source: periodic tick emitting `NoInput`, typically
//! OFFER-soldered so a full downstream queue drops ticks rather than
//! blocking the heartbeat.

use std::time::Duration;

use crate::concurrency::CancelToken;
use crate::wiring::output_wire::OutputWire;

/// Marker type emitted on every heartbeat tick; carries no data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoInput;

/// A periodic tick source.
pub struct Heartbeat {
    name: String,
    period: Duration,
    output: OutputWire<NoInput>,
    cancel: CancelToken,
}

impl Heartbeat {
    /// Build a heartbeat named `name`, ticking every `period`, emitting on
    /// `output`.
    pub fn new(name: impl Into<String>, period: Duration, output: OutputWire<NoInput>) -> Self {
        Self {
            name: name.into(),
            period,
            output,
            cancel: CancelToken::new(),
        }
    }

    /// Heartbeat name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn the tick loop. Dropping the returned handle does not stop the
    /// heartbeat — call [`Heartbeat::stop`] for that.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let output = self.output.clone();
        let period = self.period;
        let cancel = self.cancel.clone();
        let name = self.name.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if output.emit(NoInput).await.is_err() {
                            tracing::warn!(heartbeat = %name, "heartbeat emission failed");
                        }
                    }
                    _ = cancel.cancelled() => break,
                }
            }
        })
    }

    /// Stop the tick loop.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}
