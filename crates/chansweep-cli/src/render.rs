use chansweep_core::humanize_age;
use chansweep_engine::{ActionOutcome, ActionResult, ChannelInfo};
use chrono::{DateTime, Utc};

/// Orders a report oldest activity first; ties keep their discovery order.
pub fn sort_oldest_first(channels: &mut [ChannelInfo]) {
    channels.sort_by_key(|channel| channel.last_activity);
}

/// Plain-text table: channel name, visibility, and how long ago the newest
/// message landed.
pub fn render_table(channels: &[ChannelInfo], now: DateTime<Utc>) -> String {
    let name_width = channels
        .iter()
        .map(|channel| channel.name.len() + 1)
        .max()
        .unwrap_or(0)
        .max("NAME".len());
    let mut out = String::new();
    out.push_str(&format!("{:<name_width$}  {:<7}  {}\n", "NAME", "TYPE", "LAST ACTIVE"));
    for channel in channels {
        let name = format!("#{}", channel.name);
        let age = channel
            .last_activity
            .map(|ts| humanize_age(ts, now))
            .unwrap_or_else(|| "unknown".to_string());
        out.push_str(&format!("{name:<name_width$}  {:<7}  {age}\n", channel.visibility.label()));
    }
    out
}

pub fn render_json(channels: &[ChannelInfo]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(channels)
}

/// One line per processed channel, in execution order.
pub fn render_results(results: &[ActionResult]) -> String {
    let mut out = String::new();
    for result in results {
        match &result.outcome {
            ActionOutcome::Left => {
                out.push_str(&format!("left #{}\n", result.channel.name));
            }
            ActionOutcome::Failed(reason) => {
                out.push_str(&format!("failed to leave #{}: {}\n", result.channel.name, reason));
            }
        }
    }
    out
}
