//! Sitting-session reconstruction.
//!
//! Session length is never stored. It is replayed from the log on every read by
//! walking state-deciding packets newest to oldest until the first one that does not
//! count as seated, so duration always agrees with the current rules.
//!
//! A packet decides state when it carries sensors (reclassified on the spot) or when
//! it reports `isSeated: false`. `isSeated: true` alone is not enough to call the
//! seat occupied, so such packets are skipped.

use chrono::{DateTime, Utc};

use crate::db::models::{LogEntry, PacketRecord};

use super::classifier::classify;
use super::config::{PostureConfig, SessionConfig};
use super::types::{PostureLabel, PostureLevel, PostureMetrics, PostureVerdict, SeatState};

/// Verdict a single packet implies, if it implies one.
fn packet_verdict(record: &PacketRecord, config: &PostureConfig) -> Option<PostureVerdict> {
    match (&record.packet.sensors, record.packet.is_seated) {
        (Some(channels), _) => Some(classify(channels, config)),
        (None, Some(false)) => Some(PostureVerdict::unoccupied(PostureMetrics::default())),
        (None, _) => None,
    }
}

/// Incremental newest-first replay of the log.
///
/// Feed entries with [`SessionScanner::visit`] until it returns `false`, then call
/// [`SessionScanner::finish`].
pub struct SessionScanner<'a> {
    posture: &'a PostureConfig,
    latest: Option<(DateTime<Utc>, PostureVerdict)>,
    session_start: Option<DateTime<Utc>>,
    done: bool,
}

impl<'a> SessionScanner<'a> {
    pub fn new(posture: &'a PostureConfig) -> Self {
        Self {
            posture,
            latest: None,
            session_start: None,
            done: false,
        }
    }

    /// Takes the next older entry. Returns whether older entries are still needed.
    pub fn visit(&mut self, entry: &LogEntry) -> bool {
        if self.done {
            return false;
        }
        let LogEntry::Packet(record) = entry else {
            return true;
        };
        let Some(verdict) = packet_verdict(record, self.posture) else {
            return true;
        };

        if self.latest.is_none() {
            self.latest = Some((record.received_at, verdict));
        }
        if verdict.is_seated {
            self.session_start = Some(record.received_at);
        } else {
            self.done = true;
        }
        !self.done
    }

    pub fn finish(self, now: DateTime<Utc>, session: &SessionConfig) -> SeatState {
        let Some((detected_at, verdict)) = self.latest else {
            return SeatState::empty();
        };

        let minutes = match (verdict.is_seated, self.session_start) {
            (true, Some(start)) => seated_minutes(start, now),
            _ => 0,
        };
        let verdict = escalate(verdict, minutes, session);

        SeatState {
            is_seated: verdict.is_seated,
            level: verdict.level,
            label: verdict.label,
            metrics: verdict.metrics,
            seated_minutes: minutes,
            detected_at: Some(detected_at),
        }
    }
}

/// Whole minutes elapsed since `start`; never negative.
pub fn seated_minutes(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - start).num_seconds().max(0) / 60
}

/// Applies the duration escalation to a verdict.
pub fn escalate(verdict: PostureVerdict, minutes: i64, config: &SessionConfig) -> PostureVerdict {
    if !verdict.is_seated {
        return verdict;
    }

    let mut escalated = verdict;
    if minutes >= config.prolonged_minutes {
        escalated.level = PostureLevel::Danger;
        if escalated.label == PostureLabel::GoodPosture {
            escalated.label = PostureLabel::ProlongedSitting;
        }
    } else if let Some(warn_minutes) = config.warn_minutes {
        if minutes >= warn_minutes && escalated.level == PostureLevel::Normal {
            escalated.level = PostureLevel::Warn;
        }
    }
    escalated
}

/// Current seat state as of `now`, replayed from a history in append order.
pub fn seat_state(
    history: &[LogEntry],
    now: DateTime<Utc>,
    posture: &PostureConfig,
    session: &SessionConfig,
) -> SeatState {
    let mut scanner = SessionScanner::new(posture);
    for entry in history.iter().rev() {
        if !scanner.visit(entry) {
            break;
        }
    }
    scanner.finish(now, session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{AggregateBucket, InboundPacket};
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 14, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(secs)
    }

    fn record(secs: i64, body: serde_json::Value) -> LogEntry {
        LogEntry::Packet(PacketRecord {
            received_at: at(secs),
            sender: "seat".into(),
            packet: InboundPacket::from_value(body).unwrap(),
        })
    }

    fn sensors(secs: i64, seat: f64, back: f64) -> LogEntry {
        record(
            secs,
            json!({
                "sensors": {
                    "seat_front": seat, "seat_back": seat, "seat_left": seat, "seat_right": seat,
                    "back_front": back, "back_back": back, "back_left": back, "back_right": back,
                }
            }),
        )
    }

    fn seated(secs: i64) -> LogEntry {
        sensors(secs, 300.0, 0.0)
    }

    fn empty_seat(secs: i64) -> LogEntry {
        sensors(secs, 0.0, 0.0)
    }

    fn presence(secs: i64, flag: bool) -> LogEntry {
        record(secs, json!({ "isSeated": flag }))
    }

    fn state_at(history: &[LogEntry], now: DateTime<Utc>) -> SeatState {
        seat_state(history, now, &PostureConfig::default(), &SessionConfig::default())
    }

    #[test]
    fn empty_history_is_unoccupied() {
        assert_eq!(state_at(&[], t0()), SeatState::empty());
    }

    #[test]
    fn three_snapshots_seventy_seconds_apart() {
        let history = vec![seated(0), seated(70), seated(140)];
        let state = state_at(&history, at(200));

        assert!(state.is_seated);
        assert_eq!(state.seated_minutes, 200 / 60);
        assert_eq!(state.detected_at, Some(at(140)));
        assert_eq!(state.level, PostureLevel::Danger);
        assert_eq!(state.label, PostureLabel::ProlongedSitting);
    }

    #[test]
    fn scan_stops_at_last_unseated_snapshot() {
        let history = vec![seated(0), empty_seat(60), seated(120), seated(180)];
        assert_eq!(state_at(&history, at(250)).seated_minutes, (250 - 120) / 60);
    }

    #[test]
    fn scanner_asks_for_nothing_past_the_break() {
        let config = PostureConfig::default();
        let mut scanner = SessionScanner::new(&config);

        assert!(scanner.visit(&seated(180)));
        assert!(scanner.visit(&presence(170, true)));
        assert!(!scanner.visit(&empty_seat(60)));
        assert!(!scanner.visit(&seated(0)));
    }

    #[test]
    fn buckets_and_seated_presence_do_not_break_a_session() {
        let history = vec![
            seated(0),
            LogEntry::Bucket(AggregateBucket {
                time: at(0),
                avg: 150.0,
                sample_count: 1,
            }),
            presence(30, true),
            seated(60),
        ];
        assert_eq!(state_at(&history, at(130)).seated_minutes, 2);
    }

    #[test]
    fn unseated_presence_ends_the_session() {
        let history = vec![seated(0), seated(70), seated(140), presence(150, false)];
        let state = state_at(&history, at(160));

        assert!(!state.is_seated);
        assert_eq!(state.seated_minutes, 0);
        assert_eq!(state.level, PostureLevel::Normal);
        assert_eq!(state.label, PostureLabel::Unoccupied);
        assert_eq!(state.detected_at, Some(at(150)));
    }

    #[test]
    fn unseated_presence_splits_sessions() {
        let history = vec![seated(0), presence(30, false), seated(60), seated(120)];
        let state = state_at(&history, at(130));

        assert!(state.is_seated);
        assert_eq!(state.seated_minutes, 1);
    }

    #[test]
    fn zero_minutes_right_after_leaving() {
        let history = vec![seated(0), seated(600), empty_seat(660)];
        let state = state_at(&history, at(700));
        assert!(!state.is_seated);
        assert_eq!(state.seated_minutes, 0);
        assert_eq!(state.level, PostureLevel::Normal);
        assert_eq!(state.label, PostureLabel::Unoccupied);
    }

    #[test]
    fn short_session_keeps_posture_verdict() {
        let history = vec![seated(0), seated(30)];
        let state = state_at(&history, at(90));
        assert_eq!(state.seated_minutes, 1);
        assert_eq!(state.label, PostureLabel::GoodPosture);
        assert_eq!(state.level, PostureLevel::Normal);
    }

    #[test]
    fn prolonged_sitting_keeps_specific_bad_label() {
        let crossed = PostureVerdict {
            is_seated: true,
            level: PostureLevel::Warn,
            label: PostureLabel::LeftLegCrossed,
            metrics: Default::default(),
        };
        let escalated = escalate(crossed, 5, &SessionConfig::default());
        assert_eq!(escalated.level, PostureLevel::Danger);
        assert_eq!(escalated.label, PostureLabel::LeftLegCrossed);
    }

    #[test]
    fn optional_warn_threshold_raises_normal_only() {
        let config = SessionConfig {
            prolonged_minutes: 60,
            warn_minutes: Some(30),
        };
        let good = PostureVerdict {
            is_seated: true,
            level: PostureLevel::Normal,
            label: PostureLabel::GoodPosture,
            metrics: Default::default(),
        };

        assert_eq!(escalate(good, 29, &config).level, PostureLevel::Normal);
        let warned = escalate(good, 30, &config);
        assert_eq!(warned.level, PostureLevel::Warn);
        assert_eq!(warned.label, PostureLabel::GoodPosture);
        assert_eq!(escalate(good, 60, &config).label, PostureLabel::ProlongedSitting);
    }

    #[test]
    fn clock_skew_never_yields_negative_minutes() {
        assert_eq!(seated_minutes(at(120), at(0)), 0);
    }
}
