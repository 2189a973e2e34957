use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    aggregation::IntervalAggregator,
    db::{AggregateBucket, Database, InboundPacket, LogEntry, PacketRecord, SensorChannels},
    distributor::{ObserverHub, OutboundMessage},
    error::{IngestError, StorageFault},
    posture::{SeatState, SessionScanner},
    settings::Settings,
    utils::time::format_clock,
};

const ENABLE_LOGS: bool = true;

/// State-deciding packets fetched per round trip while replaying a session.
const STATE_TAIL_PAGE: u32 = 256;

use crate::{log_debug, log_error, log_info, log_warn};

/// One point of the bucket history as served to dashboards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub time: String,
    pub avg: f64,
    pub sample_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub observers: usize,
    pub log_entries: u64,
}

/// State mutated only under the pipeline lock.
struct PipelineState {
    aggregator: IntervalAggregator,
    last_received_at: Option<DateTime<Utc>>,
}

impl PipelineState {
    /// Receive time for a packet arriving at `now`; never earlier than the previous one.
    fn stamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.last_received_at {
            Some(last) if last > now => last,
            _ => now,
        }
    }
}

/// Owns the ingestion pipeline: stamping, logging, aggregation and fan-out.
///
/// Append, flush and reset all run under one async lock, so the log and the
/// aggregator buffer never disagree about what has been reset.
#[derive(Clone)]
pub struct SeatMonitor {
    db: Database,
    pipeline: Arc<Mutex<PipelineState>>,
    hub: ObserverHub,
    settings: Arc<Settings>,
}

impl SeatMonitor {
    pub async fn new(db: Database, hub: ObserverHub, settings: Arc<Settings>) -> anyhow::Result<Self> {
        Self::new_at(db, hub, settings, Utc::now()).await
    }

    pub async fn new_at(
        db: Database,
        hub: ObserverHub,
        settings: Arc<Settings>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Self> {
        let last_received_at = db.latest_packet_time().await?;
        if let Some(last) = last_received_at {
            log_info!("resuming snapshot log, last packet received at {}", last);
        }

        Ok(Self {
            db,
            pipeline: Arc::new(Mutex::new(PipelineState {
                aggregator: IntervalAggregator::new(now),
                last_received_at,
            })),
            hub,
            settings,
        })
    }

    pub fn hub(&self) -> &ObserverHub {
        &self.hub
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn ingest(&self, sender: Uuid, raw: &str) -> Result<PacketRecord, IngestError> {
        self.ingest_at(sender, raw, Utc::now()).await
    }

    /// Accepts one raw packet from `sender`.
    ///
    /// An accepted packet is stamped, appended, fed to the aggregator when it carries
    /// sensors, acknowledged to its sender and, when it carries seat data, followed by
    /// a state broadcast. Rejected packets produce no ack and leave no trace.
    ///
    /// The ack and the broadcast are sent before the pipeline lock is released, so
    /// observers see states in append order.
    pub async fn ingest_at(
        &self,
        sender: Uuid,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<PacketRecord, IngestError> {
        let packet = InboundPacket::parse(raw).map_err(|err| {
            log_warn!("dropping packet from {}: {}", sender, err);
            err
        })?;

        let mut pipeline = self.pipeline.lock().await;
        let record = PacketRecord {
            received_at: pipeline.stamp(now),
            sender: sender.to_string(),
            packet,
        };

        self.db
            .append_entry(&LogEntry::Packet(record.clone()), self.settings.max_log_entries)
            .await
            .map_err(|err| {
                log_error!("dropping packet from {}: {}", sender, err);
                err
            })?;

        pipeline.last_received_at = Some(record.received_at);
        if let Some(channels) = &record.packet.sensors {
            pipeline.aggregator.ingest(channels.clone());
        }

        if let Some(flag) = record.packet.is_seated {
            log_debug!("device {} reports isSeated={}", sender, flag);
        }

        self.hub.send_to(&sender, &OutboundMessage::Ack);
        if record.packet.carries_state() {
            self.broadcast_state(now).await;
        }
        drop(pipeline);
        Ok(record)
    }

    pub async fn current_state(&self, now: DateTime<Utc>) -> Result<SeatState, StorageFault> {
        self.scan_state(now, STATE_TAIL_PAGE).await
    }

    /// Replays the current session from the newest end of the log, one page at a
    /// time, stopping at the first packet that ends it. Older rows are never decoded.
    async fn scan_state(&self, now: DateTime<Utc>, page: u32) -> Result<SeatState, StorageFault> {
        let mut scanner = SessionScanner::new(&self.settings.posture);
        let mut cursor = None;

        'pages: loop {
            let tail = self.db.state_tail(cursor, page).await?;
            let exhausted = tail.len() < page as usize;
            cursor = tail.oldest_id();

            for entry in tail.into_entries() {
                if !scanner.visit(&entry?) {
                    break 'pages;
                }
            }
            if exhausted {
                break;
            }
        }

        Ok(scanner.finish(now, &self.settings.session))
    }

    /// Pushes the current state to every observer. A log read failure is reported
    /// as an empty history rather than suppressing the broadcast.
    pub async fn broadcast_state(&self, now: DateTime<Utc>) -> usize {
        let state = match self.current_state(now).await {
            Ok(state) => state,
            Err(err) => {
                log_error!("reading snapshot log for broadcast failed: {}", err);
                SeatState::empty()
            }
        };
        self.hub.notify(&OutboundMessage::State { payload: state })
    }

    pub fn heartbeat(&self, now: DateTime<Utc>) -> usize {
        self.hub.notify(&OutboundMessage::Heartbeat { at: now })
    }

    /// Buckets from the trailing history window, oldest first, with clock-formatted times.
    pub async fn bucket_history(&self, now: DateTime<Utc>) -> Result<Vec<HistoryPoint>, StorageFault> {
        let since = now - Duration::hours(self.settings.history_window_hours);
        let offset = self.settings.display_utc_offset_minutes;
        let buckets = self.db.buckets_since(since).await?;
        Ok(buckets
            .into_iter()
            .map(|bucket| HistoryPoint {
                time: format_clock(bucket.time, offset),
                avg: bucket.avg,
                sample_count: bucket.sample_count,
            })
            .collect())
    }

    pub async fn latest_snapshot(&self) -> Result<Option<SensorChannels>, StorageFault> {
        Ok(self
            .db
            .latest_snapshot()
            .await?
            .map(|snapshot| snapshot.channels))
    }

    /// Writes the pending bucket, if any. On a storage failure the buffer and the
    /// interval start are kept so the next tick retries with the same data.
    pub async fn flush(&self, now: DateTime<Utc>) -> Result<Option<AggregateBucket>, StorageFault> {
        let mut pipeline = self.pipeline.lock().await;
        let Some(bucket) = pipeline.aggregator.pending_bucket() else {
            return Ok(None);
        };

        self.db
            .append_entry(&LogEntry::Bucket(bucket.clone()), self.settings.max_log_entries)
            .await?;
        pipeline.aggregator.commit_flush(now);

        log_info!(
            "flushed bucket at {}: avg {} over {} snapshots",
            bucket.time,
            bucket.avg,
            bucket.sample_count
        );
        Ok(Some(bucket))
    }

    /// Empties the log and the aggregator together, then tells observers.
    pub async fn reset(&self, now: DateTime<Utc>) -> Result<(), StorageFault> {
        let mut pipeline = self.pipeline.lock().await;
        let removed = self.db.reset_log().await?;
        pipeline.aggregator.reset(now);
        log_info!("snapshot log reset, {} entries removed", removed);

        self.broadcast_state(now).await;
        drop(pipeline);
        Ok(())
    }

    pub async fn health(&self) -> Result<HealthReport, StorageFault> {
        Ok(HealthReport {
            observers: self.hub.count(),
            log_entries: self.db.entry_count().await?,
        })
    }
}
