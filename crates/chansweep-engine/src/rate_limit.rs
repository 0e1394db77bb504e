use std::time::Duration;

use crate::client::WorkspaceError;

/// Wait applied when a rate-limit response carries no usable retry hint.
pub const RATE_LIMIT_FALLBACK_WAIT: Duration = Duration::from_secs(30);
/// Floor applied to server-provided retry hints.
pub const MIN_RATE_LIMIT_WAIT: Duration = Duration::from_secs(1);

/// Outcome of classifying a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub retryable: bool,
    pub wait: Duration,
}

impl RateDecision {
    fn no_retry() -> Self {
        Self {
            retryable: false,
            wait: Duration::ZERO,
        }
    }
}

/// Classifies remote-call failures and pauses the caller through transient
/// rate-limit conditions. Every other failure propagates unchanged.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_wait: Duration,
    fallback_wait: Duration,
    verbose: bool,
}

impl RateLimiter {
    pub fn new(verbose: bool) -> Self {
        Self {
            min_wait: MIN_RATE_LIMIT_WAIT,
            fallback_wait: RATE_LIMIT_FALLBACK_WAIT,
            verbose,
        }
    }

    /// Same limiter with custom waits; tuning hook for callers with their
    /// own pacing budget and for tests.
    pub fn with_waits(min_wait: Duration, fallback_wait: Duration, verbose: bool) -> Self {
        Self {
            min_wait,
            fallback_wait,
            verbose,
        }
    }

    /// Pure classification: whether this failure warrants a retry, and how
    /// long to hold off first.
    ///
    /// An explicit 429 uses the server's retry hint clamped to the floor, or
    /// the fallback wait when no hint was given. An `ok: false` envelope
    /// whose reason mentions `rate_limited` gets the fallback wait; the
    /// platform sends no hint on that path.
    pub fn classify(&self, error: &WorkspaceError) -> RateDecision {
        match error {
            WorkspaceError::RateLimited { retry_after } => RateDecision {
                retryable: true,
                wait: retry_after
                    .map(Duration::from_secs)
                    .map(|hint| hint.max(self.min_wait))
                    .unwrap_or(self.fallback_wait),
            },
            WorkspaceError::Platform { reason, .. } if reason.contains("rate_limited") => {
                RateDecision {
                    retryable: true,
                    wait: self.fallback_wait,
                }
            }
            _ => RateDecision::no_retry(),
        }
    }

    /// Classifies `error`; when retryable, emits the verbose notice, sleeps
    /// the computed wait, and returns `true` so the caller reissues the same
    /// request. Returns `false` without sleeping otherwise.
    pub async fn back_off(&self, error: &WorkspaceError) -> bool {
        let decision = self.classify(error);
        if !decision.retryable {
            return false;
        }
        if self.verbose {
            eprintln!("rate limited, waiting {}s before retrying", decision.wait.as_secs());
        }
        tokio::time::sleep(decision.wait).await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_limiter() -> RateLimiter {
        RateLimiter::with_waits(Duration::from_millis(1), Duration::from_millis(5), false)
    }

    #[test]
    fn unit_classify_uses_server_hint_when_present() {
        let limiter = RateLimiter::new(false);
        let decision = limiter.classify(&WorkspaceError::RateLimited { retry_after: Some(12) });
        assert!(decision.retryable);
        assert_eq!(decision.wait, Duration::from_secs(12));
    }

    #[test]
    fn unit_classify_clamps_hint_to_minimum_wait() {
        let limiter =
            RateLimiter::with_waits(Duration::from_secs(5), Duration::from_secs(30), false);
        let decision = limiter.classify(&WorkspaceError::RateLimited { retry_after: Some(2) });
        assert_eq!(decision.wait, Duration::from_secs(5));
    }

    #[test]
    fn unit_classify_falls_back_when_hint_is_absent() {
        let limiter = RateLimiter::new(false);
        let decision = limiter.classify(&WorkspaceError::RateLimited { retry_after: None });
        assert!(decision.retryable);
        assert_eq!(decision.wait, RATE_LIMIT_FALLBACK_WAIT);
    }

    #[test]
    fn unit_classify_treats_rate_limited_envelope_as_retryable() {
        let limiter = RateLimiter::new(false);
        let decision = limiter.classify(&WorkspaceError::Platform {
            operation: "conversations.history",
            reason: "rate_limited".to_string(),
        });
        assert!(decision.retryable);
        assert_eq!(decision.wait, RATE_LIMIT_FALLBACK_WAIT);
    }

    #[test]
    fn unit_classify_rejects_other_failures() {
        let limiter = RateLimiter::new(false);
        let api = WorkspaceError::Api {
            operation: "conversations.list",
            status: 500,
            body: "boom".to_string(),
        };
        let platform = WorkspaceError::Platform {
            operation: "conversations.leave",
            reason: "channel_not_found".to_string(),
        };
        assert!(!limiter.classify(&api).retryable);
        assert!(!limiter.classify(&platform).retryable);
        assert!(!limiter.classify(&WorkspaceError::MissingToken).retryable);
    }

    #[tokio::test]
    async fn functional_back_off_sleeps_then_signals_retry() {
        let limiter = quiet_limiter();
        let retried = limiter.back_off(&WorkspaceError::RateLimited { retry_after: None }).await;
        assert!(retried);
    }

    #[tokio::test]
    async fn functional_back_off_declines_non_retryable_errors() {
        let limiter = quiet_limiter();
        let retried = limiter
            .back_off(&WorkspaceError::Api {
                operation: "conversations.list",
                status: 403,
                body: "forbidden".to_string(),
            })
            .await;
        assert!(!retried);
    }
}
