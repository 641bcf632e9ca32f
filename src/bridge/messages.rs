//! Wire messages exchanged with the vehicle simulator.
//!
//! Messages are adjacently tagged JSON (`event` / `data`) so a peer written
//! in any language can dispatch on the event name. Inbound telemetry carries
//! raw simulator units; conversion to harness units happens at the bridge
//! boundary, not on the wire.

use serde::{Deserialize, Serialize};

/// Factor converting wire speed (m/s) to harness speed (km/h)
pub const MS_TO_KMH: f64 = 3.6;

/// Collision sentinel meaning "no contact"
pub const NO_COLLISION: &str = "none";

/// Messages arriving from the simulator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Simulator established its connection; no payload
    Connect,
    /// Per-frame vehicle telemetry
    Telemetry(TelemetryPayload),
}

/// One telemetry sample from the simulator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryPayload {
    /// Vehicle speed in m/s
    pub speed: f64,
    /// Cross-track error: lateral offset from the road centerline
    pub cte: f64,
    /// Filtered cross-track error used by the simulator's own controller
    pub cte_pid: f64,
    pub pos_x: f64,
    pub pos_y: f64,
    pub pos_z: f64,
    /// Name of the object hit, or `"none"`
    pub hit: String,
    /// Identifier of the track currently deployed in the simulator
    pub track: String,
    /// Base64-encoded camera frame
    pub image: String,
}

/// Messages sent to the simulator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Control command; values travel as their decimal string representation
    Steer {
        steering_angle: String,
        throttle: String,
    },
    /// Deliver a generated track, at most once per episode
    Track { track_string: String },
    /// Ask the simulator to reset the vehicle
    Reset,
}

impl OutboundMessage {
    /// Build a control command from numeric steering and throttle
    pub fn steer(steering: f64, throttle: f64) -> Self {
        Self::Steer {
            steering_angle: steering.to_string(),
            throttle: throttle.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_round_trip() {
        let json = serde_json::to_string(&InboundMessage::Connect).unwrap();
        assert!(json.contains("\"connect\""));
        let parsed: InboundMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed, InboundMessage::Connect));
    }

    #[test]
    fn test_telemetry_deserialization() {
        let json = r#"{
            "event": "telemetry",
            "data": {
                "speed": 10.0, "cte": 0.5, "cte_pid": 0.4,
                "pos_x": 1.0, "pos_y": 2.0, "pos_z": 3.0,
                "hit": "none", "track": "road-1", "image": "AAAA"
            }
        }"#;
        let parsed: InboundMessage = serde_json::from_str(json).unwrap();
        match parsed {
            InboundMessage::Telemetry(t) => {
                assert_eq!(t.speed, 10.0);
                assert_eq!(t.hit, NO_COLLISION);
                assert_eq!(t.track, "road-1");
            }
            other => panic!("expected telemetry, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_fields_are_rejected() {
        let json = r#"{"event": "telemetry", "data": {"speed": 10.0}}"#;
        assert!(serde_json::from_str::<InboundMessage>(json).is_err());
    }

    #[test]
    fn test_steer_serializes_values_as_strings() {
        let msg = OutboundMessage::steer(-0.25, 0.5);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"steering_angle\":\"-0.25\""));
        assert!(json.contains("\"throttle\":\"0.5\""));
    }

    #[test]
    fn test_outbound_event_tags() {
        let track = serde_json::to_string(&OutboundMessage::Track {
            track_string: "t".to_string(),
        })
        .unwrap();
        assert!(track.contains("\"event\":\"track\""));

        let reset = serde_json::to_string(&OutboundMessage::Reset).unwrap();
        assert!(reset.contains("\"event\":\"reset\""));
    }
}
