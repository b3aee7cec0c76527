//! Staleness detection and synthetic signal-loss samples.
//!
//! A consumer watching a sensor must see an explicit "signal lost"
//! transition rather than silence. The monitor scans the registry on a
//! fixed tick and records a zero-value sample for every sensor that has
//! gone quiet, through the same ingest path as real samples.

use crate::telemetry::sample::{epoch_secs, SensorSample};
use crate::telemetry::sink::SampleSink;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Scan the registry once and synthesize a zero sample for every sensor
/// whose last update is more than `timeout` seconds before `now`.
///
/// The synthetic sample goes through the normal ingest path, so it resets
/// the sensor's `last_update` clock: one zero per timeout period elapsed,
/// never one per tick. Returns the number of sensors marked.
pub fn sweep(sink: &SampleSink, now: f64, timeout: f64) -> usize {
    let stale = sink.registry().stale_sensors(now, timeout);
    let count = stale.len();
    for sensor_id in stale {
        tracing::info!(
            sensor_id,
            timeout_secs = timeout,
            "sensor silent past timeout, recording signal loss"
        );
        sink.ingest(SensorSample::new(sensor_id, 0, now));
    }
    count
}

/// Handle to the running liveness monitor task.
pub struct LivenessMonitor {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl LivenessMonitor {
    /// Spawn the fixed-tick monitor loop on the current tokio runtime.
    pub fn spawn(sink: SampleSink, tick: Duration, timeout: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let timeout_secs = timeout.as_secs_f64();
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        tracing::debug!("liveness monitor stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        sweep(&sink, epoch_secs(), timeout_secs);
                    }
                }
            }
        });
        Self {
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    /// Stop the tick loop and wait for the task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}
