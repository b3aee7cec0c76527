//! Single ingestion path shared by the device session and the liveness
//! monitor.
//!
//! Every sample, real or synthetic, flows through [`SampleSink::ingest`]:
//! record into the registry, then drive the broadcast events and the
//! one-shot identity lookup from the outcome captured under the lock. The
//! lock is never held across the lookup or the publishes.

use crate::hub::{BroadcastHub, SensorMessage};
use crate::identity::IdentityResolver;
use crate::telemetry::registry::{RecordOutcome, SensorRegistry};
use crate::telemetry::sample::SensorSample;
use std::sync::Arc;

/// Shared handle for recording samples and emitting the resulting events.
///
/// Cloning is cheap; all clones feed the same registry and hub.
#[derive(Clone)]
pub struct SampleSink {
    registry: Arc<SensorRegistry>,
    hub: BroadcastHub,
    resolver: Arc<dyn IdentityResolver>,
}

impl SampleSink {
    pub fn new(
        registry: Arc<SensorRegistry>,
        hub: BroadcastHub,
        resolver: Arc<dyn IdentityResolver>,
    ) -> Self {
        Self {
            registry,
            hub,
            resolver,
        }
    }

    pub fn registry(&self) -> &Arc<SensorRegistry> {
        &self.registry
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Record one sample and emit the resulting events.
    ///
    /// On a sensor's first sighting this additionally publishes
    /// `new_sensor` and, when the resolver finds a binding,
    /// `sensor_athlete`. A failed lookup is logged and ingestion continues.
    pub fn ingest(&self, sample: SensorSample) -> RecordOutcome {
        let outcome = self.registry.record_sample(sample);

        tracing::debug!(
            sensor_id = sample.sensor_id,
            heart_rate = sample.heart_rate,
            "sample recorded"
        );

        self.hub.publish(SensorMessage::HeartRateData {
            sensor_id: sample.sensor_id,
            heart_rate: sample.heart_rate,
            time: sample.timestamp,
        });

        if outcome.new_sensor {
            tracing::info!(sensor_id = sample.sensor_id, "new sensor discovered");
            self.hub.publish(SensorMessage::NewSensor {
                sensor_id: sample.sensor_id,
            });

            match self.resolver.lookup(sample.sensor_id) {
                Ok(Some(athlete)) => {
                    self.hub.publish(SensorMessage::SensorAthlete {
                        sensor_id: sample.sensor_id,
                        athlete,
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(sensor_id = sample.sensor_id, "{e}");
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentityBinding, IdentityError, MemoryResolver, NoIdentity};
    use tokio::sync::broadcast::error::TryRecvError;

    fn binding() -> IdentityBinding {
        IdentityBinding {
            first_name: "Ada".to_string(),
            last_name: "Kova".to_string(),
            max_hr: Some(192),
        }
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<SensorMessage>) -> Vec<SensorMessage> {
        let mut events = Vec::new();
        while let Ok(message) = rx.try_recv() {
            events.push(message);
        }
        events
    }

    #[test]
    fn test_first_sample_emits_new_sensor_and_athlete() {
        let resolver = MemoryResolver::new();
        resolver.bind(5, binding());

        let sink = SampleSink::new(
            Arc::new(SensorRegistry::new(100)),
            BroadcastHub::new(64),
            Arc::new(resolver),
        );
        let mut rx = sink.hub().subscribe();

        sink.ingest(SensorSample::new(5, 70, 1.0));
        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], SensorMessage::HeartRateData { sensor_id: 5, .. }));
        assert_eq!(events[1], SensorMessage::NewSensor { sensor_id: 5 });
        assert_eq!(
            events[2],
            SensorMessage::SensorAthlete {
                sensor_id: 5,
                athlete: binding(),
            }
        );

        // The second sample yields neither new_sensor nor sensor_athlete.
        sink.ingest(SensorSample::new(5, 72, 2.0));
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SensorMessage::HeartRateData { heart_rate: 72, .. }));
    }

    #[test]
    fn test_unbound_sensor_emits_no_athlete_event() {
        let sink = SampleSink::new(
            Arc::new(SensorRegistry::new(100)),
            BroadcastHub::new(64),
            Arc::new(NoIdentity),
        );
        let mut rx = sink.hub().subscribe();

        sink.ingest(SensorSample::new(9, 70, 1.0));
        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(!events
            .iter()
            .any(|e| matches!(e, SensorMessage::SensorAthlete { .. })));
    }

    #[test]
    fn test_lookup_failure_does_not_abort_ingestion() {
        struct FailingResolver;
        impl IdentityResolver for FailingResolver {
            fn lookup(&self, _sensor_id: u32) -> Result<Option<IdentityBinding>, IdentityError> {
                Err(IdentityError::Lookup("store unreachable".to_string()))
            }
        }

        let sink = SampleSink::new(
            Arc::new(SensorRegistry::new(100)),
            BroadcastHub::new(64),
            Arc::new(FailingResolver),
        );
        let mut rx = sink.hub().subscribe();

        let outcome = sink.ingest(SensorSample::new(4, 70, 1.0));
        assert!(outcome.new_sensor);
        assert_eq!(sink.registry().series(4).unwrap().len(), 1);

        // heart_rate_data and new_sensor still go out.
        assert!(matches!(
            rx.try_recv().unwrap(),
            SensorMessage::HeartRateData { .. }
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            SensorMessage::NewSensor { .. }
        ));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }
}
