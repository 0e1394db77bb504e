use chansweep_core::parse_message_ts;
use chrono::{DateTime, Utc};

use crate::client::WorkspaceClient;
use crate::rate_limit::RateLimiter;

/// Attempts per channel before the probe gives up.
const PROBE_ATTEMPTS: usize = 2;

/// Fetches the timestamp of a channel's most recent message.
///
/// Probe failures never abort a discovery run: rate limits are waited out
/// (consuming an attempt), and any other failure or an unparseable timestamp
/// degrades to `None`. A channel with zero history is likewise `None`;
/// absence of messages is not evidence of staleness.
pub async fn latest_activity(
    client: &WorkspaceClient,
    limiter: &RateLimiter,
    channel_id: &str,
) -> Option<DateTime<Utc>> {
    for attempt in 0..PROBE_ATTEMPTS {
        match client.latest_message_ts(channel_id, attempt).await {
            Ok(Some(ts)) => return parse_message_ts(&ts),
            Ok(None) => return None,
            Err(error) => {
                if limiter.back_off(&error).await {
                    continue;
                }
                tracing::debug!(channel_id, error = %error, "history probe failed");
                return None;
            }
        }
    }
    None
}
