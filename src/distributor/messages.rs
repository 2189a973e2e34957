use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::posture::SeatState;

/// Everything the server pushes to observers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    Ack,
    State { payload: SeatState },
    Heartbeat { at: DateTime<Utc> },
}

impl OutboundMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
