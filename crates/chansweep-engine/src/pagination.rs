use crate::client::{ChannelPage, WorkspaceClient, WorkspaceError};
use crate::rate_limit::RateLimiter;
use crate::types::ChannelRecord;

/// Cursor-driven walker over the channel-listing endpoint.
///
/// One `next_page` call yields one page of records. A rate-limited request
/// is reissued with the cursor unchanged after backing off, so a retry never
/// skips or duplicates a page.
pub struct ChannelPager<'a> {
    client: &'a WorkspaceClient,
    limiter: &'a RateLimiter,
    page_limit: usize,
    types_param: String,
    cursor: Option<String>,
    exhausted: bool,
}

impl<'a> ChannelPager<'a> {
    pub fn new(
        client: &'a WorkspaceClient,
        limiter: &'a RateLimiter,
        page_limit: usize,
        types_param: String,
    ) -> Self {
        Self {
            client,
            limiter,
            page_limit: page_limit.max(1),
            types_param,
            cursor: None,
            exhausted: false,
        }
    }

    /// Fetches the next page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<ChannelRecord>>, WorkspaceError> {
        if self.exhausted {
            return Ok(None);
        }
        let mut attempt = 0_usize;
        loop {
            let fetched = self
                .client
                .list_channels(self.cursor.as_deref(), self.page_limit, &self.types_param, attempt)
                .await;
            match fetched {
                Ok(ChannelPage { records, next_cursor }) => {
                    tracing::debug!(
                        count = records.len(),
                        more = next_cursor.is_some(),
                        "fetched channel listing page"
                    );
                    match next_cursor {
                        Some(cursor) => self.cursor = Some(cursor),
                        None => self.exhausted = true,
                    }
                    return Ok(Some(records));
                }
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
