//! Broadcast fan-out of telemetry events.
//!
//! Wraps a `tokio::sync::broadcast` channel so that publishing never blocks
//! sample ingestion: with no subscribers an event is simply dropped, and a
//! subscriber that falls behind loses the oldest events first. Events for
//! the same sensor are delivered in the order they were recorded.

use crate::identity::IdentityBinding;
use serde::Serialize;
use tokio::sync::broadcast;

/// Connection status reported alongside `sensor_status` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorStatus {
    Scanning,
    Connected,
    Error,
}

/// Externally observable event, shaped for direct JSON delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SensorMessage {
    /// A previously unknown sensor reported its first sample.
    NewSensor { sensor_id: u32 },
    /// Device session state change, with an optional message on errors.
    SensorStatus {
        status: SensorStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        sensor_id: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// One accepted sample, real or synthetic.
    HeartRateData {
        sensor_id: u32,
        heart_rate: u16,
        time: f64,
    },
    /// Athlete binding resolved on a sensor's first sighting.
    SensorAthlete {
        sensor_id: u32,
        athlete: IdentityBinding,
    },
}

/// Fan-out hub for telemetry events.
///
/// Cloning is cheap; every clone publishes into the same channel.
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    tx: broadcast::Sender<SensorMessage>,
}

impl BroadcastHub {
    /// Create a hub whose subscribers may buffer up to `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all current subscribers, best-effort.
    pub fn publish(&self, message: SensorMessage) {
        // send only fails when nobody is subscribed; that is not an error
        let _ = self.tx.send(message);
    }

    /// Subscribe to all events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SensorMessage> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_publish_without_subscribers_is_a_no_op() {
        let hub = BroadcastHub::new(16);
        hub.publish(SensorMessage::NewSensor { sensor_id: 1 });
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_subscribers_receive_in_order() {
        let hub = BroadcastHub::new(16);
        let mut rx = hub.subscribe();

        hub.publish(SensorMessage::NewSensor { sensor_id: 5 });
        hub.publish(SensorMessage::HeartRateData {
            sensor_id: 5,
            heart_rate: 72,
            time: 1.0,
        });

        assert_eq!(rx.try_recv().unwrap(), SensorMessage::NewSensor { sensor_id: 5 });
        assert_eq!(
            rx.try_recv().unwrap(),
            SensorMessage::HeartRateData {
                sensor_id: 5,
                heart_rate: 72,
                time: 1.0,
            }
        );
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_slow_subscriber_loses_oldest_events() {
        let hub = BroadcastHub::new(2);
        let mut rx = hub.subscribe();

        for hr in [70, 71, 72, 73] {
            hub.publish(SensorMessage::HeartRateData {
                sensor_id: 1,
                heart_rate: hr,
                time: hr as f64,
            });
        }

        // The two oldest events are gone; the newest ones win.
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Lagged(2))));
        assert_eq!(
            rx.try_recv().unwrap(),
            SensorMessage::HeartRateData {
                sensor_id: 1,
                heart_rate: 72,
                time: 72.0,
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            SensorMessage::HeartRateData {
                sensor_id: 1,
                heart_rate: 73,
                time: 73.0,
            }
        );
    }

    #[test]
    fn test_wire_shapes() {
        let json = serde_json::to_string(&SensorMessage::HeartRateData {
            sensor_id: 5,
            heart_rate: 72,
            time: 12.5,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"event":"heart_rate_data","sensor_id":5,"heart_rate":72,"time":12.5}"#
        );

        let json = serde_json::to_string(&SensorMessage::SensorStatus {
            status: SensorStatus::Scanning,
            sensor_id: None,
            message: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"event":"sensor_status","status":"scanning"}"#);

        let json = serde_json::to_string(&SensorMessage::SensorAthlete {
            sensor_id: 5,
            athlete: IdentityBinding {
                first_name: "Ada".to_string(),
                last_name: "Kova".to_string(),
                max_hr: Some(192),
            },
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"event":"sensor_athlete","sensor_id":5,"athlete":{"first_name":"Ada","last_name":"Kova","max_hr":192}}"#
        );
    }
}
