//! Sample value types shared across the pipeline.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One decoded heart-rate observation from a wireless sensor.
///
/// Samples are immutable once created. Synthetic signal-loss samples
/// (heart rate `0`) produced by the liveness monitor travel through the
/// same type and the same ingest path as real ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    /// Device-reported sensor identifier
    pub sensor_id: u32,
    /// Heart rate in beats per minute (`0` marks signal loss)
    pub heart_rate: u16,
    /// Wall-clock timestamp in fractional epoch seconds
    pub timestamp: f64,
}

impl SensorSample {
    pub fn new(sensor_id: u32, heart_rate: u16, timestamp: f64) -> Self {
        Self {
            sensor_id,
            heart_rate,
            timestamp,
        }
    }

    /// Create a sample stamped with the current wall-clock time.
    pub fn now(sensor_id: u32, heart_rate: u16) -> Self {
        Self::new(sensor_id, heart_rate, epoch_secs())
    }

    /// Whether this is a synthetic signal-loss placeholder.
    pub fn is_synthetic(&self) -> bool {
        self.heart_rate == 0
    }
}

/// Current wall-clock time as fractional epoch seconds.
pub fn epoch_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Copy-out snapshot of one sensor's recent history, oldest first.
///
/// `times` and `heart_rates` are index-aligned and always the same length;
/// this is the shape the query surface serves to consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSeries {
    pub times: Vec<f64>,
    pub heart_rates: Vec<u16>,
}

impl SensorSeries {
    pub fn len(&self) -> usize {
        self.heart_rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heart_rates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_flag() {
        assert!(SensorSample::new(5, 0, 1.0).is_synthetic());
        assert!(!SensorSample::new(5, 72, 1.0).is_synthetic());
    }

    #[test]
    fn test_now_uses_wall_clock() {
        let sample = SensorSample::now(5, 72);
        assert!(sample.timestamp > 1_600_000_000.0);
    }
}
