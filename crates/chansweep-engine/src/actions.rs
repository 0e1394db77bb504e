use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::client::{WorkspaceClient, WorkspaceError};
use crate::rate_limit::RateLimiter;
use crate::types::ChannelInfo;

/// Pause after each successful leave.
pub const DEFAULT_LEAVE_PACING: Duration = Duration::from_secs(1);

/// Per-channel outcome of a bulk leave run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionOutcome {
    Left,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    pub channel: ChannelInfo,
    pub outcome: ActionOutcome,
}

/// A non-retryable failure that stopped the sequence.
///
/// `results` preserves execution order: every success before the failure,
/// then the failing channel itself marked [`ActionOutcome::Failed`].
/// Channels after the failure were never attempted.
#[derive(Debug, Error)]
#[error("failed to leave #{channel}: {source}")]
pub struct BulkLeaveError {
    pub channel: String,
    pub results: Vec<ActionResult>,
    #[source]
    pub source: WorkspaceError,
}

/// Leaves channels strictly one at a time, waiting out rate limits on the
/// current channel and pacing after each success.
pub struct ActionExecutor {
    client: Arc<WorkspaceClient>,
    limiter: Arc<RateLimiter>,
    pacing: Duration,
    verbose: bool,
}

impl ActionExecutor {
    pub fn new(
        client: Arc<WorkspaceClient>,
        limiter: Arc<RateLimiter>,
        pacing: Duration,
        verbose: bool,
    ) -> Self {
        Self {
            client,
            limiter,
            pacing,
            verbose,
        }
    }

    /// Leaves every channel in order. The first non-retryable failure aborts
    /// the sequence; everything processed so far is preserved in the error.
    pub async fn leave_all(
        &self,
        channels: &[ChannelInfo],
    ) -> Result<Vec<ActionResult>, BulkLeaveError> {
        let total = channels.len();
        let mut results = Vec::with_capacity(total);
        for (index, channel) in channels.iter().enumerate() {
            if self.verbose {
                eprintln!("[{}/{}] leaving #{} ({})", index + 1, total, channel.name, channel.id);
            }
            if let Err(error) = self.leave_one(channel).await {
                results.push(ActionResult {
                    channel: channel.clone(),
                    outcome: ActionOutcome::Failed(error.to_string()),
                });
                return Err(BulkLeaveError {
                    channel: channel.name.clone(),
                    results,
                    source: error,
                });
            }
            results.push(ActionResult {
                channel: channel.clone(),
                outcome: ActionOutcome::Left,
            });
            if self.verbose {
                eprintln!("left #{}", channel.name);
            }
            tokio::time::sleep(self.pacing).await;
        }
        Ok(results)
    }

    async fn leave_one(&self, channel: &ChannelInfo) -> Result<(), WorkspaceError> {
        let mut attempt = 0_usize;
        loop {
            match self.client.leave_channel(&channel.id, attempt).await {
                Ok(()) => return Ok(()),
                Err(error) => {
                    if self.limiter.back_off(&error).await {
                        attempt = attempt.saturating_add(1);
                        continue;
                    }
                    return Err(error);
                }
            }
        }
    }
}
