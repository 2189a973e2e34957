use chrono::{DateTime, Utc};

use crate::db::models::{AggregateBucket, SensorChannels};

/// Buffers raw channels between flush ticks.
///
/// The bucket average is taken over every individual reading of every buffered
/// snapshot, not per channel. Owned by the pipeline lock; never shared directly.
#[derive(Debug, Clone)]
pub struct IntervalAggregator {
    buffer: Vec<SensorChannels>,
    last_flush: DateTime<Utc>,
}

impl IntervalAggregator {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            buffer: Vec::new(),
            last_flush: started_at,
        }
    }

    /// Buffers one snapshot. A snapshot without readings adds nothing to the average
    /// and is not counted.
    pub fn ingest(&mut self, channels: SensorChannels) {
        if !channels.is_empty() {
            self.buffer.push(channels);
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn last_flush(&self) -> DateTime<Utc> {
        self.last_flush
    }

    /// The bucket a flush would append right now; `None` while no reading is buffered.
    pub fn pending_bucket(&self) -> Option<AggregateBucket> {
        let (sum, count) = self
            .buffer
            .iter()
            .flat_map(|channels| channels.readings())
            .fold((0.0_f64, 0_u64), |(sum, count), value| (sum + value, count + 1));

        if count == 0 {
            return None;
        }

        Some(AggregateBucket {
            time: self.last_flush,
            avg: round2(sum / count as f64),
            sample_count: self.buffer.len() as u64,
        })
    }

    /// Marks the pending bucket as persisted: clears the buffer and opens a new
    /// interval at `now`.
    pub fn commit_flush(&mut self, now: DateTime<Utc>) {
        self.buffer.clear();
        self.last_flush = now;
    }

    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.buffer.clear();
        self.last_flush = now;
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
