use chrono::{DateTime, Utc};

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;
const WEEK_MS: i64 = 7 * DAY_MS;

/// Label an epoch-millisecond timestamp for display, relative to now.
pub fn format_timestamp(millis: i64) -> String {
    label_at(millis, Utc::now().timestamp_millis())
}

/// `just now`, then whole minutes, hours and days; a calendar date once the
/// timestamp is a week old. Timestamps chrono cannot represent come back raw.
fn label_at(millis: i64, now: i64) -> String {
    let Some(at) = DateTime::from_timestamp_millis(millis) else {
        return millis.to_string();
    };

    let age = now.saturating_sub(millis);
    match age {
        a if a < MINUTE_MS => "just now".to_string(),
        a if a < HOUR_MS => format!("{}m ago", a / MINUTE_MS),
        a if a < DAY_MS => format!("{}h ago", a / HOUR_MS),
        a if a < WEEK_MS => format!("{}d ago", a / DAY_MS),
        _ => at.format("%b %-d, %Y").to_string(),
    }
}
