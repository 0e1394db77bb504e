use chrono::{DateTime, Duration, Utc};

/// Returns the absolute staleness cutoff for a lookback window of `days`.
///
/// The cutoff is snapshotted once per run; callers compare channel activity
/// against it instead of re-reading the clock. A window reaching past the
/// representable range clamps to the earliest representable instant, so no
/// activity can predate it.
pub fn lookback_cutoff(days: u32) -> DateTime<Utc> {
    Utc::now()
        .checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Parses a workspace message timestamp (`"1712345678.000100"`) into UTC time.
///
/// The fractional part is a per-second sequence number, not sub-second
/// precision worth keeping; it is dropped. Anything unparseable yields `None`
/// so a malformed message never aborts a discovery run.
pub fn parse_message_ts(raw: &str) -> Option<DateTime<Utc>> {
    let seconds = raw.trim().parse::<f64>().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    DateTime::from_timestamp(seconds as i64, 0)
}

/// Renders how far `then` lies behind `now` as a compact age label.
pub fn humanize_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);
    if elapsed.num_days() > 0 {
        return format!("{}d ago", elapsed.num_days());
    }
    if elapsed.num_hours() > 0 {
        return format!("{}h ago", elapsed.num_hours());
    }
    if elapsed.num_minutes() > 0 {
        return format!("{}m ago", elapsed.num_minutes());
    }
    "just now".to_string()
}
