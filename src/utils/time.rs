use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Renders `at` as a two-digit `HH:MM` wall clock in the given UTC offset.
///
/// Offsets outside chrono's accepted range fall back to UTC.
pub fn format_clock(at: DateTime<Utc>, utc_offset_minutes: i32) -> String {
    let offset = utc_offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix());
    at.with_timezone(&offset).format("%H:%M").to_string()
}
