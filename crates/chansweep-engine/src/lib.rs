//! Discovery and bulk-leave engine for stale workspace channels.
//!
//! The engine walks the workspace channel listing one page at a time, probes
//! each member channel's most recent message under a bounded worker pool,
//! and reports the channels whose newest activity predates a caller-chosen
//! cutoff. A separate executor then leaves selected channels strictly one at
//! a time. Both halves treat rate limits as a pacing signal rather than an
//! error: they wait and reissue the same request, so a throttled run is slow
//! but never wrong.
//!
//! A channel with no observable activity is never reported as stale;
//! absence of history is not evidence of abandonment.

mod actions;
mod client;
mod discovery;
mod filter;
mod pagination;
mod probe;
mod rate_limit;
mod types;

pub use actions::{
    ActionExecutor, ActionOutcome, ActionResult, BulkLeaveError, DEFAULT_LEAVE_PACING,
};
pub use client::{ChannelPage, WorkspaceClient, WorkspaceError};
pub use discovery::{
    DiscoveryEngine, DiscoveryError, DiscoveryTuning, DEFAULT_PROBE_CONCURRENCY,
    DEFAULT_PROBE_COOLDOWN,
};
pub use filter::{is_stale, passes_all, passes_prefilters, FilterCriteria};
pub use pagination::ChannelPager;
pub use probe::latest_activity;
pub use rate_limit::{RateDecision, RateLimiter, MIN_RATE_LIMIT_WAIT, RATE_LIMIT_FALLBACK_WAIT};
pub use types::{types_query_param, ChannelInfo, ChannelRecord, ChannelVisibility};
