//! Inbound packet data model.
//!
//! Sensor devices send two kinds of JSON object: a presence packet carrying the
//! `isSeated` discriminator and a pressure packet carrying `sensors`. Anything
//! else that is still a JSON object is accepted and logged verbatim.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::IngestError;

use super::sensor::{SensorChannels, SensorSnapshot};

/// A parsed inbound packet. `body` is kept verbatim for the log.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundPacket {
    pub is_seated: Option<bool>,
    pub sensors: Option<SensorChannels>,
    pub body: Value,
}

impl InboundPacket {
    pub fn parse(raw: &str) -> Result<Self, IngestError> {
        let body: Value = serde_json::from_str(raw)?;
        Self::from_value(body)
    }

    pub fn from_value(body: Value) -> Result<Self, IngestError> {
        let object = body
            .as_object()
            .ok_or_else(|| IngestError::Malformed("packet is not a JSON object".into()))?;

        let is_seated = match object.get("isSeated") {
            None | Some(Value::Null) => None,
            Some(Value::Bool(flag)) => Some(*flag),
            Some(other) => {
                return Err(IngestError::Malformed(format!(
                    "isSeated must be a boolean, got {other}"
                )))
            }
        };

        let sensors = match object.get("sensors") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(SensorChannels::from_json_map(map)),
            Some(other) => {
                return Err(IngestError::Malformed(format!(
                    "sensors must be an object, got {other}"
                )))
            }
        };

        Ok(Self {
            is_seated,
            sensors,
            body,
        })
    }

    /// Whether observers should be told about this packet.
    pub fn carries_state(&self) -> bool {
        self.is_seated.is_some() || self.sensors.is_some()
    }
}

/// A packet after the ingestion point stamped it.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketRecord {
    pub received_at: DateTime<Utc>,
    pub sender: String,
    pub packet: InboundPacket,
}

impl PacketRecord {
    pub fn snapshot(&self) -> Option<SensorSnapshot> {
        self.packet.sensors.as_ref().map(|channels| SensorSnapshot {
            received_at: self.received_at,
            channels: channels.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pressure_packet() {
        let packet = InboundPacket::parse(
            r#"{"sensors": {"seat_top_left": 312, "back_top_right": 90}, "timestamp": "2026-01-05T14:28:33.123Z"}"#,
        )
        .unwrap();

        assert_eq!(packet.is_seated, None);
        let sensors = packet.sensors.as_ref().unwrap();
        assert_eq!(sensors.get("seat_top_left"), Some(312.0));
        assert_eq!(sensors.get("back_top_right"), Some(90.0));
        assert!(packet.carries_state());
    }

    #[test]
    fn parses_presence_packet() {
        let packet = InboundPacket::parse(r#"{"isSeated": false, "detectedAt": "x"}"#).unwrap();

        assert_eq!(packet.is_seated, Some(false));
        assert!(packet.sensors.is_none());
        assert!(packet.carries_state());
    }

    #[test]
    fn other_objects_are_accepted_without_state() {
        let packet = InboundPacket::parse(r#"{"type": "hello"}"#).unwrap();
        assert!(!packet.carries_state());
    }

    #[test]
    fn rejects_non_objects_and_bad_fields() {
        assert!(InboundPacket::parse("not json").unwrap_err().is_malformed());
        assert!(InboundPacket::parse("[1,2,3]").unwrap_err().is_malformed());
        assert!(InboundPacket::parse(r#"{"isSeated": "yes"}"#)
            .unwrap_err()
            .is_malformed());
        assert!(InboundPacket::parse(r#"{"sensors": 12}"#)
            .unwrap_err()
            .is_malformed());
    }
}
