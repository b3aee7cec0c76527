//! Shared registry of known sensors and their recent history.
//!
//! All state lives behind an internal lock and is reached through registry
//! methods only. `record_sample` is atomic with respect to the buffer
//! append, the `last_update` write, and the first-seen check-and-set, so
//! two ingestion contexts can never both observe "not yet seen" for the
//! same sensor.

use crate::telemetry::buffer::SampleBuffer;
use crate::telemetry::sample::{SensorSample, SensorSeries};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Errors surfaced by registry queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// The sensor id has never reported a sample. "No data yet", not a fault.
    NotFound(u32),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::NotFound(id) => write!(f, "sensor {id} has not reported any data"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Per-sensor state owned exclusively by the registry.
#[derive(Debug)]
struct SensorRecord {
    buffer: SampleBuffer,
    last_update: f64,
}

/// Outcome of recording one sample, captured under the registry lock.
///
/// Callers drive all side effects (broadcast, identity lookup) from this
/// value after the lock is released.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordOutcome {
    pub sample: SensorSample,
    /// True exactly once per sensor id: on the sample that introduced it.
    pub new_sensor: bool,
}

/// Mapping from sensor id to its record, synchronized internally.
#[derive(Debug)]
pub struct SensorRegistry {
    max_points: usize,
    sensors: Mutex<HashMap<u32, SensorRecord>>,
}

impl SensorRegistry {
    pub fn new(max_points: usize) -> Self {
        Self {
            max_points,
            sensors: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u32, SensorRecord>> {
        // A poisoned lock only means another thread panicked mid-update;
        // the map itself is still structurally valid, so keep serving.
        match self.sensors.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record a sample, creating the sensor record on first sight.
    ///
    /// Always appends to the sensor's buffer and advances `last_update` to
    /// the sample timestamp, for synthetic samples as well as real ones.
    pub fn record_sample(&self, sample: SensorSample) -> RecordOutcome {
        let mut sensors = self.lock();
        let new_sensor = !sensors.contains_key(&sample.sensor_id);
        let record = sensors
            .entry(sample.sensor_id)
            .or_insert_with(|| SensorRecord {
                buffer: SampleBuffer::new(self.max_points),
                last_update: sample.timestamp,
            });
        record.buffer.push(sample);
        record.last_update = sample.timestamp;
        RecordOutcome { sample, new_sensor }
    }

    /// Sensors whose last update is strictly older than `threshold` seconds,
    /// ascending by id. Pure query, no mutation.
    pub fn stale_sensors(&self, now: f64, threshold: f64) -> Vec<u32> {
        let sensors = self.lock();
        let mut stale: Vec<u32> = sensors
            .iter()
            .filter(|(_, record)| now - record.last_update > threshold)
            .map(|(&id, _)| id)
            .collect();
        stale.sort_unstable();
        stale
    }

    /// Snapshot one sensor's recent history.
    pub fn series(&self, sensor_id: u32) -> Result<SensorSeries, RegistryError> {
        let sensors = self.lock();
        sensors
            .get(&sensor_id)
            .map(|record| record.buffer.series())
            .ok_or(RegistryError::NotFound(sensor_id))
    }

    /// Timestamp of the sensor's most recent accepted sample.
    pub fn last_update(&self, sensor_id: u32) -> Result<f64, RegistryError> {
        let sensors = self.lock();
        sensors
            .get(&sensor_id)
            .map(|record| record.last_update)
            .ok_or(RegistryError::NotFound(sensor_id))
    }

    /// Every sensor id ever recorded, ascending.
    pub fn active_sensors(&self) -> Vec<u32> {
        let sensors = self.lock();
        let mut ids: Vec<u32> = sensors.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
