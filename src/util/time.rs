//! Time helpers. All persisted timestamps are epoch milliseconds.

use chrono::{DateTime, Utc};

pub const MS_PER_DAY: i64 = 86_400_000;

/// Current time in epoch milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Render an epoch-ms timestamp for human output (UTC, minute precision).
#[must_use]
pub fn format_ms(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts)
        .map_or_else(|| ts.to_string(), |dt| dt.format("%Y-%m-%d %H:%M").to_string())
}

/// The cutoff timestamp for "older than N days".
#[must_use]
pub fn days_ago_ms(now: i64, days: i64) -> i64 {
    now - days.saturating_mul(MS_PER_DAY)
}
