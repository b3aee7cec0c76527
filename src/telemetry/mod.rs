//! In-memory telemetry state: sample values, bounded per-sensor history,
//! the shared sensor registry, and the common ingestion path.

pub mod buffer;
pub mod registry;
pub mod sample;
pub mod sink;

// Re-export commonly used types
pub use buffer::SampleBuffer;
pub use registry::{RecordOutcome, RegistryError, SensorRegistry};
pub use sample::{epoch_secs, SensorSample, SensorSeries};
pub use sink::SampleSink;
