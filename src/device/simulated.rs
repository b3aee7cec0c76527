//! Simulated sensor source for demos and integration tests.
//!
//! Stands in for the radio-layer driver: each simulated strap emits a slow
//! heart-rate wave on its own schedule, with an optional dropout point to
//! exercise signal-loss handling without unplugging hardware.

use crate::device::{DeviceError, DeviceEvent, SensorDevice};
use crate::telemetry::sample::SensorSample;
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Behavior of the simulated straps.
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// Sensor ids the simulated straps report
    pub sensor_ids: Vec<u32>,
    /// Interval between samples, per strap
    pub sample_interval: Duration,
    /// Stop transmitting (without closing) after this many beats, if set
    pub dropout_after: Option<u32>,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            sensor_ids: vec![101, 102],
            sample_interval: Duration::from_millis(500),
            dropout_after: None,
        }
    }
}

/// Driver emitting scripted heart-rate samples from a worker thread.
pub struct SimulatedDevice {
    config: SimulatedConfig,
    running: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl SimulatedDevice {
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl SensorDevice for SimulatedDevice {
    fn open(&mut self, tx: Sender<DeviceEvent>) -> Result<(), DeviceError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(DeviceError::Io("device already open".to_string()));
        }
        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let config = self.config.clone();
        self.worker = Some(thread::spawn(move || {
            let mut beat: u32 = 0;
            while running.load(Ordering::SeqCst) {
                let transmitting = config.dropout_after.map_or(true, |n| beat < n);
                if transmitting {
                    for (strap, &sensor_id) in config.sensor_ids.iter().enumerate() {
                        let sample = SensorSample::now(sensor_id, wave(beat, strap));
                        if tx.send(DeviceEvent::Sample(sample)).is_err() {
                            // Session is gone; nothing left to feed.
                            return;
                        }
                    }
                }
                beat = beat.wrapping_add(1);
                thread::sleep(config.sample_interval);
            }
        }));

        Ok(())
    }

    fn close(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Slow triangle wave around a resting rate, offset per strap so multiple
/// simulated sensors stay distinguishable.
fn wave(beat: u32, strap: usize) -> u16 {
    let base = 65 + (strap as u16) * 8;
    let phase = (beat % 40) as u16;
    let swing = if phase < 20 { phase } else { 40 - phase };
    base + swing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_wave_stays_in_plausible_range() {
        for strap in 0..4 {
            for beat in 0..200 {
                let hr = wave(beat, strap);
                assert!((60..=120).contains(&hr), "hr {hr} out of range");
            }
        }
    }

    #[test]
    fn test_emits_samples_for_each_configured_strap() {
        let (tx, rx) = bounded(64);
        let mut device = SimulatedDevice::new(SimulatedConfig {
            sensor_ids: vec![7, 9],
            sample_interval: Duration::from_millis(10),
            dropout_after: None,
        });

        device.open(tx).unwrap();
        let mut seen = Vec::new();
        for _ in 0..2 {
            match rx.recv_timeout(Duration::from_secs(2)).unwrap() {
                DeviceEvent::Sample(sample) => seen.push(sample.sensor_id),
                DeviceEvent::Fault(msg) => panic!("unexpected fault: {msg}"),
            }
        }
        device.close();

        assert_eq!(seen, vec![7, 9]);
    }

    #[test]
    fn test_double_open_is_rejected() {
        let (tx, _rx) = bounded(64);
        let mut device = SimulatedDevice::new(SimulatedConfig::default());
        device.open(tx.clone()).unwrap();
        assert!(device.open(tx).is_err());
        device.close();
    }

    #[test]
    fn test_dropout_stops_transmission() {
        let (tx, rx) = bounded(64);
        let mut device = SimulatedDevice::new(SimulatedConfig {
            sensor_ids: vec![5],
            sample_interval: Duration::from_millis(5),
            dropout_after: Some(3),
        });

        device.open(tx).unwrap();
        thread::sleep(Duration::from_millis(100));
        device.close();

        assert_eq!(rx.try_iter().count(), 3);
    }
}
