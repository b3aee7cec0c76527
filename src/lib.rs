//! Pulsehub - multi-sensor heart-rate telemetry hub.
//!
//! Ingests decoded samples from wireless heart-rate sensors, keeps a
//! bounded recent history per sensor, records explicit signal-loss samples
//! when a sensor goes quiet, and fans every update out to subscribers in
//! real time. Protocol decoding, persistence, and UI are external
//! collaborators behind the [`device::SensorDevice`] and
//! [`identity::IdentityResolver`] seams.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐  samples   ┌───────────────┐   events   ┌──────────────┐
//! │ DeviceSession │───────────▶│  SampleSink   │───────────▶│ BroadcastHub │
//! │  (reconnects) │            │  + Registry   │            │  (fan-out)   │
//! └───────────────┘            └───────▲───────┘            └──────────────┘
//!                                      │ synthetic zeros
//!                              ┌───────┴─────────┐
//!                              │ LivenessMonitor │
//!                              │  (fixed tick)   │
//!                              └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pulsehub::{
//!     BroadcastHub, Config, DeviceSession, LivenessMonitor, NoIdentity, SampleSink,
//!     SensorRegistry, SessionConfig, SimulatedConfig, SimulatedDevice,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), pulsehub::DeviceError> {
//! let config = Config::default();
//! let registry = Arc::new(SensorRegistry::new(config.max_points));
//! let hub = BroadcastHub::new(config.event_capacity);
//! let sink = SampleSink::new(registry.clone(), hub.clone(), Arc::new(NoIdentity));
//!
//! let mut events = hub.subscribe();
//! let device = Box::new(SimulatedDevice::new(SimulatedConfig::default()));
//! let session = DeviceSession::start(device, sink.clone(), SessionConfig::default())?;
//! let monitor = LivenessMonitor::spawn(sink, config.liveness_tick, config.heartbeat_timeout);
//!
//! while let Ok(message) = events.recv().await {
//!     println!("{}", serde_json::to_string(&message).unwrap());
//! }
//!
//! monitor.shutdown().await;
//! session.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod device;
pub mod hub;
pub mod identity;
pub mod liveness;
pub mod telemetry;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use device::{
    DeviceError, DeviceEvent, DeviceSession, SensorDevice, SessionConfig, SessionState,
    SimulatedConfig, SimulatedDevice,
};
pub use hub::{BroadcastHub, SensorMessage, SensorStatus};
pub use identity::{IdentityBinding, IdentityError, IdentityResolver, MemoryResolver, NoIdentity};
pub use liveness::LivenessMonitor;
pub use telemetry::{
    RecordOutcome, RegistryError, SampleBuffer, SampleSink, SensorRegistry, SensorSample,
    SensorSeries,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
