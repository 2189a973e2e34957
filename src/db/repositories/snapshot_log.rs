use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, to_i64},
    models::{AggregateBucket, EntryKind, InboundPacket, LogEntry, PacketRecord, SensorSnapshot},
};
use crate::error::StorageFault;

/// A row exactly as SQLite returned it; decoding happens off the DB thread so that a
/// bad row surfaces as `StorageFault::Corrupt` instead of a generic query error.
struct StoredRow {
    id: i64,
    kind: String,
    recorded_at: String,
    sender: Option<String>,
    payload: String,
}

const SELECT_COLUMNS: &str = "SELECT id, kind, recorded_at, sender, payload FROM snapshot_log";

fn read_row(row: &Row) -> rusqlite::Result<StoredRow> {
    Ok(StoredRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        recorded_at: row.get(2)?,
        sender: row.get(3)?,
        payload: row.get(4)?,
    })
}

fn decode_row(row: StoredRow) -> Result<LogEntry, StorageFault> {
    let corrupt = |reason: String| StorageFault::Corrupt { id: row.id, reason };

    let kind = EntryKind::parse(&row.kind)
        .ok_or_else(|| corrupt(format!("unknown entry kind '{}'", row.kind)))?;

    match kind {
        EntryKind::Packet => {
            let received_at = parse_datetime(&row.recorded_at, "recorded_at")
                .map_err(|err| corrupt(format!("{err:#}")))?;
            let packet =
                InboundPacket::parse(&row.payload).map_err(|err| corrupt(err.to_string()))?;
            Ok(LogEntry::Packet(PacketRecord {
                received_at,
                sender: row.sender.clone().unwrap_or_default(),
                packet,
            }))
        }
        EntryKind::Bucket => {
            let bucket: AggregateBucket =
                serde_json::from_str(&row.payload).map_err(|err| corrupt(err.to_string()))?;
            Ok(LogEntry::Bucket(bucket))
        }
    }
}

/// Column values beside the payload: sender, has_sensors, is_seated.
struct EncodedEntry {
    sender: Option<String>,
    has_sensors: bool,
    is_seated: Option<bool>,
    payload: String,
}

fn encode_entry(entry: &LogEntry) -> anyhow::Result<EncodedEntry> {
    match entry {
        LogEntry::Packet(record) => Ok(EncodedEntry {
            sender: Some(record.sender.clone()),
            has_sensors: record.packet.sensors.is_some(),
            is_seated: record.packet.is_seated,
            payload: record.packet.body.to_string(),
        }),
        LogEntry::Bucket(bucket) => Ok(EncodedEntry {
            sender: None,
            has_sensors: false,
            is_seated: None,
            payload: serde_json::to_string(bucket).context("failed to serialize bucket")?,
        }),
    }
}

/// One page of state-bearing packets, newest first.
///
/// Rows are decoded only as the page is consumed, so a corrupt row surfaces only
/// when a reader actually reaches it.
pub struct StateTail {
    rows: Vec<StoredRow>,
}

impl StateTail {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cursor for the next older page.
    pub fn oldest_id(&self) -> Option<i64> {
        self.rows.last().map(|row| row.id)
    }

    pub fn into_entries(self) -> impl Iterator<Item = Result<LogEntry, StorageFault>> {
        self.rows.into_iter().map(decode_row)
    }
}

impl Database {
    /// Appends one entry and trims the log to the newest `max_entries` rows.
    pub async fn append_entry(
        &self,
        entry: &LogEntry,
        max_entries: Option<u64>,
    ) -> Result<i64, StorageFault> {
        let kind = entry.kind();
        let recorded_at = format_datetime(&entry.recorded_at());
        let encoded = encode_entry(entry).map_err(StorageFault::Unavailable)?;

        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open append transaction")?;
            tx.execute(
                "INSERT INTO snapshot_log (kind, recorded_at, sender, has_sensors, is_seated, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    kind.as_str(),
                    recorded_at,
                    encoded.sender,
                    encoded.has_sensors,
                    encoded.is_seated,
                    encoded.payload
                ],
            )
            .context("failed to insert snapshot log entry")?;
            let id = tx.last_insert_rowid();

            if let Some(limit) = max_entries {
                tx.execute(
                    "DELETE FROM snapshot_log
                     WHERE id <= (SELECT id FROM snapshot_log ORDER BY id DESC LIMIT 1 OFFSET ?1)",
                    params![to_i64(limit)?],
                )
                .context("failed to trim snapshot log")?;
            }

            tx.commit().context("failed to commit snapshot log append")?;
            Ok(id)
        })
        .await
        .map_err(StorageFault::Unavailable)
    }

    /// The whole log in append order.
    pub async fn read_all(&self) -> Result<Vec<LogEntry>, StorageFault> {
        let rows = self
            .execute(|conn| {
                let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id ASC"))?;
                let rows = stmt
                    .query_map([], read_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
            .map_err(StorageFault::Unavailable)?;

        rows.into_iter().map(decode_row).collect()
    }

    /// Packets that can decide the seat state (sensor-bearing, or `isSeated: false`)
    /// older than `before_id`, newest first, at most `limit` of them.
    pub async fn state_tail(
        &self,
        before_id: Option<i64>,
        limit: u32,
    ) -> Result<StateTail, StorageFault> {
        let before_id = before_id.unwrap_or(i64::MAX);
        let rows = self
            .execute(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_COLUMNS} WHERE id < ?1 AND kind = 'packet'
                     AND (has_sensors = 1 OR is_seated = 0)
                     ORDER BY id DESC LIMIT ?2"
                ))?;
                let rows = stmt
                    .query_map(params![before_id, limit], read_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
            .map_err(StorageFault::Unavailable)?;

        Ok(StateTail { rows })
    }

    /// Most recent sensor-bearing packet, if any.
    pub async fn latest_snapshot(&self) -> Result<Option<SensorSnapshot>, StorageFault> {
        let row = self
            .execute(|conn| {
                let row = conn
                    .query_row(
                        &format!(
                            "{SELECT_COLUMNS} WHERE kind = 'packet' AND has_sensors = 1
                             ORDER BY id DESC LIMIT 1"
                        ),
                        [],
                        read_row,
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(StorageFault::Unavailable)?;

        match row {
            Some(row) => Ok(decode_row(row)?.snapshot()),
            None => Ok(None),
        }
    }

    /// Receive time of the newest packet, used to keep stamps monotonic across restarts.
    pub async fn latest_packet_time(&self) -> Result<Option<DateTime<Utc>>, StorageFault> {
        let raw = self
            .execute(|conn| {
                let raw: Option<String> = conn
                    .query_row(
                        "SELECT recorded_at FROM snapshot_log
                         WHERE kind = 'packet' ORDER BY id DESC LIMIT 1",
                        [],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(raw)
            })
            .await
            .map_err(StorageFault::Unavailable)?;

        raw.map(|value| parse_datetime(&value, "recorded_at"))
            .transpose()
            .map_err(|err| StorageFault::Corrupt {
                id: -1,
                reason: format!("{err:#}"),
            })
    }

    /// Buckets whose interval starts at or after `since`, oldest first.
    pub async fn buckets_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<AggregateBucket>, StorageFault> {
        let since = format_datetime(&since);
        let rows = self
            .execute(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_COLUMNS} WHERE kind = 'bucket' AND recorded_at >= ?1 ORDER BY id ASC"
                ))?;
                let rows = stmt
                    .query_map(params![since], read_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
            .map_err(StorageFault::Unavailable)?;

        rows.into_iter()
            .map(|row| match decode_row(row)? {
                LogEntry::Bucket(bucket) => Ok(bucket),
                LogEntry::Packet(_) => Err(StorageFault::Corrupt {
                    id: -1,
                    reason: "packet returned by bucket query".into(),
                }),
            })
            .collect()
    }

    pub async fn entry_count(&self) -> Result<u64, StorageFault> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM snapshot_log", [], |row| {
                row.get(0)
            })?;
            Ok(count.max(0) as u64)
        })
        .await
        .map_err(StorageFault::Unavailable)
    }

    /// Empties the log in one statement. Returns the number of removed entries.
    pub async fn reset_log(&self) -> Result<u64, StorageFault> {
        self.execute(|conn| {
            let removed = conn
                .execute("DELETE FROM snapshot_log", [])
                .context("failed to clear snapshot log")?;
            Ok(removed as u64)
        })
        .await
        .map_err(StorageFault::Unavailable)
    }
}
