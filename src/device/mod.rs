//! Device lifecycle: the seam to the sensor-access layer and the
//! supervised session that keeps it open.
//!
//! The radio/USB protocol lives behind [`SensorDevice`]; this module only
//! manages opening the handle, draining decoded samples into the ingest
//! path, and recovering from transient faults with a fixed cool-down.
//! Sensors connect and disconnect routinely, so mid-session errors are
//! retried forever and surfaced only as `sensor_status` events. Failing to
//! become ready inside the startup window is the one fatal case.

pub mod simulated;

// Re-export the built-in driver alongside the seam it implements
pub use simulated::{SimulatedConfig, SimulatedDevice};

use crate::hub::{SensorMessage, SensorStatus};
use crate::telemetry::sample::SensorSample;
use crate::telemetry::sink::SampleSink;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How often the drain loop re-checks the shutdown flag and retry deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Depth of the driver-to-session sample bridge.
const EVENT_QUEUE_DEPTH: usize = 1024;

/// Errors from the device-access layer.
#[derive(Debug)]
pub enum DeviceError {
    /// The device did not become ready within the startup window.
    InitTimeout(Duration),
    /// Transient I/O failure; the session retries these.
    Io(String),
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::InitTimeout(window) => {
                write!(f, "device not ready within {:.0?} startup window", window)
            }
            DeviceError::Io(msg) => write!(f, "device I/O error: {msg}"),
        }
    }
}

impl std::error::Error for DeviceError {}

/// Event delivered by a device driver to the session.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// A decoded heart-rate sample.
    Sample(SensorSample),
    /// The driver hit an I/O failure and stopped delivering samples.
    Fault(String),
}

/// Handle to the sensor-access layer.
///
/// `open` must start delivering decoded samples to `tx` from the driver's
/// own execution context and return once the handle is ready; `close` must
/// stop delivery and release the handle. Both are only called from the
/// session thread, never concurrently.
pub trait SensorDevice: Send {
    fn open(&mut self, tx: Sender<DeviceEvent>) -> Result<(), DeviceError>;
    fn close(&mut self);
}

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Device closed, waiting out the reconnect cool-down.
    Idle,
    Opening,
    /// Device open, no sample received yet.
    Scanning,
    /// At least one sample received since the last open.
    Connected,
}

/// Tuning knobs for the session loop.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Cool-down before reopening after a fault
    pub reconnect_backoff: Duration,
    /// Bounded startup window for the first open
    pub init_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_backoff: Duration::from_secs(5),
            init_timeout: Duration::from_secs(30),
        }
    }
}

/// Supervised recovery loop around a [`SensorDevice`].
///
/// Runs on its own thread so a blocking driver can never stall the async
/// side of the process.
pub struct DeviceSession {
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl DeviceSession {
    /// Open the device and start the drain loop.
    ///
    /// Startup is bounded by `init_timeout`: open failures inside the
    /// window are transient like any later fault and retried with
    /// `reconnect_backoff` between attempts; only running out the window
    /// without a successful open is fatal. After the device is up, faults
    /// are retried forever and reported only as broadcast status events.
    pub fn start(
        device: Box<dyn SensorDevice>,
        sink: SampleSink,
        config: SessionConfig,
    ) -> Result<Self, DeviceError> {
        let init_timeout = config.init_timeout;
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = bounded::<Result<(), DeviceError>>(1);

        let thread_running = running.clone();
        let handle = thread::Builder::new()
            .name("pulsehub-session".to_string())
            .spawn(move || run_session(device, sink, config, thread_running, ready_tx))
            .map_err(|e| DeviceError::Io(format!("failed to spawn session thread: {e}")))?;

        match ready_rx.recv_timeout(init_timeout) {
            Ok(Ok(())) => Ok(Self {
                running,
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                // An open call is stuck. Tell the loop to exit whenever the
                // driver returns; the thread cannot be joined safely here.
                running.store(false, Ordering::SeqCst);
                Err(DeviceError::InitTimeout(init_timeout))
            }
        }
    }

    /// Stop the drain loop, close the device, and join the session thread.
    pub fn shutdown(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

fn run_session(
    mut device: Box<dyn SensorDevice>,
    sink: SampleSink,
    config: SessionConfig,
    running: Arc<AtomicBool>,
    ready_tx: Sender<Result<(), DeviceError>>,
) {
    // The session keeps its own sender alive so the channel never
    // disconnects while a reopen is pending.
    let (event_tx, event_rx) = bounded::<DeviceEvent>(EVENT_QUEUE_DEPTH);

    // Startup: open failures are transient, so retry with the usual
    // cool-down until the device comes up or the window runs out. The
    // supervisor is waiting on ready_tx with the same deadline.
    let deadline = Instant::now() + config.init_timeout;
    let mut state = loop {
        match device.open(event_tx.clone()) {
            Ok(()) => {
                let _ = ready_tx.send(Ok(()));
                publish_status(&sink, SensorStatus::Scanning, None, None);
                tracing::info!("device open, scanning for sensors");
                break SessionState::Scanning;
            }
            Err(e) => {
                tracing::error!("device open failed: {e}");
                publish_status(&sink, SensorStatus::Error, None, Some(e.to_string()));
                device.close();
                if Instant::now() + config.reconnect_backoff >= deadline {
                    let _ = ready_tx.send(Err(DeviceError::InitTimeout(config.init_timeout)));
                    return;
                }
                thread::sleep(config.reconnect_backoff);
                if !running.load(Ordering::SeqCst) {
                    return;
                }
            }
        }
    };

    let mut retry_at: Option<Instant> = None;

    while running.load(Ordering::SeqCst) {
        if let Some(deadline) = retry_at {
            if Instant::now() >= deadline {
                retry_at = None;
                state = reopen(&mut *device, &event_tx, &sink, &config, &mut retry_at);
            }
        }

        match event_rx.recv_timeout(POLL_INTERVAL) {
            Ok(DeviceEvent::Sample(sample)) => {
                if state == SessionState::Scanning {
                    state = SessionState::Connected;
                    tracing::info!(sensor_id = sample.sensor_id, "sensor connected");
                    publish_status(&sink, SensorStatus::Connected, Some(sample.sensor_id), None);
                }
                sink.ingest(sample);
            }
            Ok(DeviceEvent::Fault(message)) => {
                tracing::error!("device fault: {message}");
                publish_status(&sink, SensorStatus::Error, None, Some(message));
                if state != SessionState::Idle {
                    device.close();
                    state = SessionState::Idle;
                }
                retry_at = Some(Instant::now() + config.reconnect_backoff);
            }
            Err(RecvTimeoutError::Timeout) => {}
            // Unreachable while event_tx is held above, but end cleanly.
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if state != SessionState::Idle {
        device.close();
    }
    tracing::info!("device session stopped");
}

fn reopen(
    device: &mut dyn SensorDevice,
    event_tx: &Sender<DeviceEvent>,
    sink: &SampleSink,
    config: &SessionConfig,
    retry_at: &mut Option<Instant>,
) -> SessionState {
    tracing::info!("reopening device");
    match device.open(event_tx.clone()) {
        Ok(()) => {
            publish_status(sink, SensorStatus::Scanning, None, None);
            tracing::info!("device open, scanning for sensors");
            SessionState::Scanning
        }
        Err(e) => {
            tracing::error!("device reopen failed: {e}");
            publish_status(sink, SensorStatus::Error, None, Some(e.to_string()));
            device.close();
            *retry_at = Some(Instant::now() + config.reconnect_backoff);
            SessionState::Idle
        }
    }
}

fn publish_status(
    sink: &SampleSink,
    status: SensorStatus,
    sensor_id: Option<u32>,
    message: Option<String>,
) {
    sink.hub().publish(SensorMessage::SensorStatus {
        status,
        sensor_id,
        message,
    });
}
