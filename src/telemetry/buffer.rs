//! Bounded per-sensor sample history.

use crate::telemetry::sample::{SensorSample, SensorSeries};
use std::collections::VecDeque;

/// Fixed-capacity time series of samples with FIFO eviction.
///
/// Holds up to `max_points` samples, oldest first. Timestamps and heart
/// rates stay index-aligned by construction since each sample is stored
/// whole.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: VecDeque<SensorSample>,
    max_points: usize,
}

impl SampleBuffer {
    pub fn new(max_points: usize) -> Self {
        // Zero capacity would let push grow past the bound; keep one point.
        let max_points = max_points.max(1);
        Self {
            samples: VecDeque::with_capacity(max_points),
            max_points,
        }
    }

    /// Append a sample, evicting the oldest when at capacity.
    pub fn push(&mut self, sample: SensorSample) {
        if self.samples.len() == self.max_points {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterate retained samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &SensorSample> {
        self.samples.iter()
    }

    /// Snapshot the buffer into the wire-facing series shape.
    pub fn series(&self) -> SensorSeries {
        SensorSeries {
            times: self.samples.iter().map(|s| s.timestamp).collect(),
            heart_rates: self.samples.iter().map(|s| s.heart_rate).collect(),
        }
    }
}
