use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{watch, Semaphore};

use crate::client::{WorkspaceClient, WorkspaceError};
use crate::filter::{is_stale, passes_prefilters, FilterCriteria};
use crate::pagination::ChannelPager;
use crate::probe::latest_activity;
use crate::rate_limit::RateLimiter;
use crate::types::{types_query_param, ChannelInfo, ChannelRecord};

/// Concurrent activity probes allowed per listing page.
pub const DEFAULT_PROBE_CONCURRENCY: usize = 5;
/// In-worker pause after each accepted channel, held under the worker's
/// permit so the pool stays inside the platform's request-rate budget.
pub const DEFAULT_PROBE_COOLDOWN: Duration = Duration::from_secs(1);

/// Fatal discovery failure. Rate limits never surface here; they are waited
/// out inside the page walker and the probes.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("discovery cancelled")]
    Cancelled,
    #[error("failed to list channels: {0}")]
    List(#[source] WorkspaceError),
}

/// Pacing knobs for a discovery run; defaults match the production budget.
#[derive(Debug, Clone)]
pub struct DiscoveryTuning {
    pub page_limit: usize,
    pub probe_concurrency: usize,
    pub probe_cooldown: Duration,
}

impl Default for DiscoveryTuning {
    fn default() -> Self {
        Self {
            page_limit: 30,
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            probe_cooldown: DEFAULT_PROBE_COOLDOWN,
        }
    }
}

/// Walks the channel listing and reports member channels whose newest
/// activity predates the staleness cutoff.
///
/// Each page is fully probed and drained before the next page is requested,
/// so at most one listing request is in flight at a time and probe load is
/// bounded by `probe_concurrency` regardless of workspace size.
pub struct DiscoveryEngine {
    client: Arc<WorkspaceClient>,
    limiter: Arc<RateLimiter>,
    criteria: FilterCriteria,
    tuning: DiscoveryTuning,
}

impl DiscoveryEngine {
    pub fn new(
        client: Arc<WorkspaceClient>,
        limiter: Arc<RateLimiter>,
        criteria: FilterCriteria,
        tuning: DiscoveryTuning,
    ) -> Self {
        Self {
            client,
            limiter,
            criteria,
            tuning,
        }
    }

    /// Runs a full discovery with no external cancellation.
    pub async fn discover(&self) -> Result<Vec<ChannelInfo>, DiscoveryError> {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        self.discover_until(cancel_rx).await
    }

    /// Runs discovery until the listing is exhausted or `cancel` flips to
    /// `true`. Cancellation stops after the in-flight page: no new listing
    /// request or probe is started, workers parked on a probe abandon it,
    /// and the run ends with [`DiscoveryError::Cancelled`].
    pub async fn discover_until(
        &self,
        cancel: watch::Receiver<bool>,
    ) -> Result<Vec<ChannelInfo>, DiscoveryError> {
        let results: Arc<Mutex<Vec<ChannelInfo>>> = Arc::new(Mutex::new(Vec::new()));
        let types_param = types_query_param(&self.criteria.type_mask);
        let mut pager = ChannelPager::new(
            &self.client,
            &self.limiter,
            self.tuning.page_limit,
            types_param,
        );

        let worker = {
            let client = Arc::clone(&self.client);
            let limiter = Arc::clone(&self.limiter);
            let cutoff = self.criteria.stale_cutoff;
            move |record: ChannelRecord, mut cancel: watch::Receiver<bool>| {
                let client = Arc::clone(&client);
                let limiter = Arc::clone(&limiter);
                async move {
                    let activity = tokio::select! {
                        _ = cancelled(&mut cancel) => return None,
                        activity = latest_activity(&client, &limiter, &record.id) => activity,
                    };
                    if !is_stale(activity, cutoff) {
                        return None;
                    }
                    Some(ChannelInfo {
                        id: record.id,
                        name: record.name,
                        visibility: record.visibility,
                        last_activity: activity,
                    })
                }
            }
        };

        loop {
            if *cancel.borrow() {
                return Err(DiscoveryError::Cancelled);
            }
            let Some(records) = pager.next_page().await.map_err(DiscoveryError::List)? else {
                break;
            };
            let eligible: Vec<ChannelRecord> = records
                .into_iter()
                .filter(|record| passes_prefilters(record, &self.criteria))
                .collect();
            run_bounded(
                eligible,
                self.tuning.probe_concurrency,
                self.tuning.probe_cooldown,
                Arc::clone(&results),
                cancel.clone(),
                worker.clone(),
            )
            .await;
        }
        if *cancel.borrow() {
            return Err(DiscoveryError::Cancelled);
        }

        let mut guard = results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let collected = std::mem::take(&mut *guard);
        tracing::debug!(stale = collected.len(), "discovery run finished");
        Ok(collected)
    }
}

/// Dispatches one worker task per item through a fixed pool of permits and
/// drains every task before returning.
///
/// Each `Some` outcome is appended to `results` under its lock, and the
/// worker's permit is held through the post-append cooldown so a fresh probe
/// cannot start in the freed slot during the pause.
pub(crate) async fn run_bounded<T, R, F, Fut>(
    items: Vec<T>,
    concurrency: usize,
    cooldown: Duration,
    results: Arc<Mutex<Vec<R>>>,
    cancel: watch::Receiver<bool>,
    worker: F,
) where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T, watch::Receiver<bool>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Option<R>> + Send + 'static,
{
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = Vec::with_capacity(items.len());
    for item in items {
        let permits = Arc::clone(&permits);
        let results = Arc::clone(&results);
        let cancel = cancel.clone();
        let worker = worker.clone();
        tasks.push(tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            if *cancel.borrow() {
                return;
            }
            let Some(produced) = worker(item, cancel).await else {
                return;
            };
            results
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(produced);
            tokio::time::sleep(cooldown).await;
        }));
    }
    for task in tasks {
        let _ = task.await;
    }
}

/// Resolves once the cancel flag flips to `true`. A dropped sender means
/// cancellation can no longer arrive, so the future never resolves.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if *cancel.borrow() {
        return;
    }
    loop {
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        if *cancel.borrow() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn unit_run_bounded_never_exceeds_the_permit_ceiling() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let results: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        let worker = {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            move |item: usize, _cancel: watch::Receiver<bool>| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Some(item)
                }
            }
        };

        run_bounded(
            (0..20).collect(),
            5,
            Duration::ZERO,
            Arc::clone(&results),
            cancel_rx,
            worker,
        )
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 5, "pool ceiling was breached");
        assert_eq!(results.lock().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn unit_run_bounded_collects_only_some_outcomes() {
        let results: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        run_bounded(
            (0..10).collect(),
            3,
            Duration::ZERO,
            Arc::clone(&results),
            cancel_rx,
            |item: usize, _cancel| async move { (item % 2 == 0).then_some(item) },
        )
        .await;

        let mut collected = results.lock().unwrap().clone();
        collected.sort_unstable();
        assert_eq!(collected, vec![0, 2, 4, 6, 8]);
    }

    #[tokio::test]
    async fn functional_cancel_flag_stops_pending_workers() {
        let started = Arc::new(AtomicUsize::new(0));
        let results: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let worker = {
            let started = Arc::clone(&started);
            move |item: usize, mut cancel: watch::Receiver<bool>| {
                let started = Arc::clone(&started);
                async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    tokio::select! {
                        _ = cancelled(&mut cancel) => None,
                        _ = tokio::time::sleep(Duration::from_secs(30)) => Some(item),
                    }
                }
            }
        };

        let pool = tokio::spawn(run_bounded(
            (0..8).collect(),
            2,
            Duration::ZERO,
            Arc::clone(&results),
            cancel_rx,
            worker,
        ));

        while started.load(Ordering::SeqCst) < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel_tx.send(true).expect("cancel receivers alive");
        pool.await.expect("pool task");

        assert!(results.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unit_cancelled_resolves_after_flag_flips() {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let waiter = tokio::spawn(async move {
            cancelled(&mut cancel_rx).await;
        });
        cancel_tx.send(true).expect("receiver alive");
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancelled() should resolve promptly")
            .expect("waiter task");
    }
}
