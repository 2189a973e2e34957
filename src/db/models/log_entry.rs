//! Snapshot log entry data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::packet::PacketRecord;
use super::sensor::SensorSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Packet,
    Bucket,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Packet => "packet",
            EntryKind::Bucket => "bucket",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "packet" => Some(EntryKind::Packet),
            "bucket" => Some(EntryKind::Bucket),
            _ => None,
        }
    }
}

/// Interval average produced by one aggregator flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateBucket {
    /// Start of the interval (the previous flush time)
    pub time: DateTime<Utc>,
    pub avg: f64,
    pub sample_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    Packet(PacketRecord),
    Bucket(AggregateBucket),
}

impl LogEntry {
    pub fn kind(&self) -> EntryKind {
        match self {
            LogEntry::Packet(_) => EntryKind::Packet,
            LogEntry::Bucket(_) => EntryKind::Bucket,
        }
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        match self {
            LogEntry::Packet(record) => record.received_at,
            LogEntry::Bucket(bucket) => bucket.time,
        }
    }

    /// The sensor snapshot this entry carries, if any.
    pub fn snapshot(&self) -> Option<SensorSnapshot> {
        match self {
            LogEntry::Packet(record) => record.snapshot(),
            LogEntry::Bucket(_) => None,
        }
    }
}
