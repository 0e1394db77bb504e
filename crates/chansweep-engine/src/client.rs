use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::types::{ChannelRecord, ChannelVisibility};

const CLIENT_USER_AGENT: &str = "chansweep";
const ERROR_BODY_MAX_CHARS: usize = 320;
/// Zero-based attempt number stamped on each request so a retry is
/// distinguishable from a first try.
const RETRY_ATTEMPT_HEADER: &str = "x-chansweep-retry-attempt";

/// Failure surface of the workspace conversations API.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// HTTP 429. `retry_after` holds the Retry-After header in seconds;
    /// zero or unparseable values are dropped.
    #[error("workspace rate limit hit{}", retry_after_suffix(.retry_after))]
    RateLimited { retry_after: Option<u64> },
    #[error("workspace request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success HTTP status other than 429.
    #[error("workspace api {operation} returned status {status}: {body}")]
    Api {
        operation: &'static str,
        status: u16,
        body: String,
    },
    /// HTTP succeeded but the response envelope carried `ok: false`.
    #[error("workspace api {operation} failed: {reason}")]
    Platform {
        operation: &'static str,
        reason: String,
    },
    #[error("workspace token is missing or empty")]
    MissingToken,
}

fn retry_after_suffix(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(seconds) => format!(" (retry after {seconds}s)"),
        None => String::new(),
    }
}

/// One page of channel records plus the cursor leading to the next page.
/// `next_cursor` is `None` once the listing is exhausted.
#[derive(Debug, Clone)]
pub struct ChannelPage {
    pub records: Vec<ChannelRecord>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ListedChannel {
    id: String,
    name: String,
    #[serde(default)]
    is_private: bool,
    #[serde(default)]
    is_member: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct ListChannelsResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channels: Vec<ListedChannel>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Deserialize)]
struct HistoryMessage {
    #[serde(default)]
    ts: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: Vec<HistoryMessage>,
}

#[derive(Debug, Deserialize)]
struct LeaveResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Thin HTTP client for the workspace conversations API.
///
/// Each method issues exactly one request and classifies the outcome; retry
/// and pacing policy live with the callers.
#[derive(Clone)]
pub struct WorkspaceClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl WorkspaceClient {
    pub fn new(
        api_base: &str,
        token: &str,
        request_timeout_ms: u64,
    ) -> Result<Self, WorkspaceError> {
        if token.trim().is_empty() {
            return Err(WorkspaceError::MissingToken);
        }
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.trim().to_string(),
        })
    }

    /// Fetches one page of non-archived channels of the requested types.
    /// `attempt` counts retries of this exact page, starting at zero.
    pub async fn list_channels(
        &self,
        cursor: Option<&str>,
        page_limit: usize,
        types_param: &str,
        attempt: usize,
    ) -> Result<ChannelPage, WorkspaceError> {
        let mut request = self
            .http
            .get(format!("{}/conversations.list", self.api_base))
            .bearer_auth(&self.token)
            .query(&[
                ("limit", page_limit.to_string().as_str()),
                ("exclude_archived", "true"),
                ("types", types_param),
            ]);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }
        let response: ListChannelsResponse = self
            .request_json("conversations.list", request, attempt)
            .await?;
        if !response.ok {
            return Err(WorkspaceError::Platform {
                operation: "conversations.list",
                reason: response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        let records = response
            .channels
            .into_iter()
            .map(|channel| ChannelRecord {
                id: channel.id,
                name: channel.name,
                visibility: if channel.is_private {
                    ChannelVisibility::Private
                } else {
                    ChannelVisibility::Public
                },
                is_member: channel.is_member,
            })
            .collect();
        let next_cursor =
            Some(response.response_metadata.next_cursor).filter(|cursor| !cursor.is_empty());
        Ok(ChannelPage { records, next_cursor })
    }

    /// Returns the raw timestamp of the newest message in a channel, or
    /// `None` when the channel has no history at all.
    pub async fn latest_message_ts(
        &self,
        channel_id: &str,
        attempt: usize,
    ) -> Result<Option<String>, WorkspaceError> {
        let request = self
            .http
            .get(format!("{}/conversations.history", self.api_base))
            .bearer_auth(&self.token)
            .query(&[("channel", channel_id), ("limit", "1")]);
        let response: HistoryResponse = self
            .request_json("conversations.history", request, attempt)
            .await?;
        if !response.ok {
            return Err(WorkspaceError::Platform {
                operation: "conversations.history",
                reason: response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(response
            .messages
            .into_iter()
            .next()
            .map(|message| message.ts)
            .filter(|ts| !ts.is_empty()))
    }

    /// Removes the authed account from a channel.
    pub async fn leave_channel(
        &self,
        channel_id: &str,
        attempt: usize,
    ) -> Result<(), WorkspaceError> {
        let request = self
            .http
            .post(format!("{}/conversations.leave", self.api_base))
            .bearer_auth(&self.token)
            .json(&json!({ "channel": channel_id }));
        let response: LeaveResponse = self
            .request_json("conversations.leave", request, attempt)
            .await?;
        if !response.ok {
            return Err(WorkspaceError::Platform {
                operation: "conversations.leave",
                reason: response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(())
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
        attempt: usize,
    ) -> Result<T, WorkspaceError> {
        let response = request
            .header(RETRY_ATTEMPT_HEADER, attempt.to_string())
            .send()
            .await?;
        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after = parse_retry_after(response.headers());
            return Err(WorkspaceError::RateLimited { retry_after });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WorkspaceError::Api {
                operation,
                status: status.as_u16(),
                body: truncate_for_error(&body, ERROR_BODY_MAX_CHARS),
            });
        }
        Ok(response.json::<T>().await?)
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|seconds| *seconds > 0)
}

fn truncate_for_error(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated: String = value.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_retry_after(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn unit_parse_retry_after_reads_positive_seconds() {
        assert_eq!(parse_retry_after(&headers_with_retry_after("12")), Some(12));
        assert_eq!(parse_retry_after(&headers_with_retry_after(" 3 ")), Some(3));
    }

    #[test]
    fn unit_parse_retry_after_drops_zero_and_garbage() {
        assert_eq!(parse_retry_after(&headers_with_retry_after("0")), None);
        assert_eq!(parse_retry_after(&headers_with_retry_after("soon")), None);
        assert_eq!(parse_retry_after(&HeaderMap::new()), None);
    }

    #[test]
    fn unit_truncate_for_error_appends_ellipsis_past_limit() {
        assert_eq!(truncate_for_error("short", 10), "short");
        assert_eq!(truncate_for_error("abcdefghij", 4), "abcd...");
    }

    #[test]
    fn unit_client_rejects_empty_token() {
        let built = WorkspaceClient::new("https://example.test/api", "  ", 5_000);
        assert!(matches!(built, Err(WorkspaceError::MissingToken)));
    }

    #[test]
    fn unit_client_trims_trailing_slash_from_api_base() {
        let client =
            WorkspaceClient::new("https://example.test/api/", "xoxp-token", 5_000).unwrap();
        assert_eq!(client.api_base, "https://example.test/api");
    }
}
