//! Retrying page fetcher
//!
//! Runs one page request through the shared [`RequestPool`] and retries
//! failures with exponential backoff. The per-page retry bookkeeping lives in
//! the [`FetchJob`] state machine; this module only drives it.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::descriptor::RootDescriptor;
use crate::fetcher::retry_formatter::RetryContext;
use crate::fetcher::{FetcherError, ListingClient, PageRequest};
use crate::metrics;
use crate::shutdown::SharedShutdown;
use crate::traversal::job::{FetchJob, JobState};
use crate::traversal::rate_limit::{RateLimitError, RequestPool};

/// Result of fetching one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page was retrieved and its records appended to the job
    Fetched {
        /// Records on this page
        records: usize,
        /// Whether the server has further pages
        has_more: bool,
        /// Attempts it took
        attempts: u32,
    },
    /// Every attempt failed
    Abandoned {
        /// Attempts made
        attempts: u32,
        /// Error of the final attempt
        last_error: FetcherError,
    },
    /// Cancellation was requested before the page could be retrieved
    Cancelled,
}

/// Fetches single pages with throttling and retries
pub struct RetryingPageFetcher {
    client: Arc<dyn ListingClient>,
    pool: Arc<RequestPool>,
    max_retries: u32,
    shutdown: Option<SharedShutdown>,
}

impl RetryingPageFetcher {
    /// Create a fetcher
    ///
    /// `max_retries` is the total attempt budget per page.
    pub fn new(client: Arc<dyn ListingClient>, pool: Arc<RequestPool>, max_retries: u32) -> Self {
        Self {
            client,
            pool,
            max_retries: max_retries.max(1),
            shutdown: None,
        }
    }

    /// Stop retrying once `shutdown` is requested
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Attempt budget per page
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Fetch the job's current page
    ///
    /// Each attempt holds one pool ticket for exactly the duration of the
    /// request. Records of a fetched page are appended to `job`.
    ///
    /// # Errors
    /// Returns `RateLimitError` if the pool was closed
    pub async fn fetch(
        &self,
        root: &RootDescriptor,
        job: &mut FetchJob,
        page_size: u32,
    ) -> Result<PageOutcome, RateLimitError> {
        let mut last_error: Option<FetcherError> = None;

        loop {
            if self.cancelled() {
                return Ok(PageOutcome::Cancelled);
            }

            let attempt = job.begin_attempt();
            let request = PageRequest::new(root, job.node_id(), job.page(), page_size);

            // Queued waiters leave the pool as soon as cancellation is requested.
            let ticket = match &self.shutdown {
                Some(shutdown) => tokio::select! {
                    biased;
                    _ = shutdown.wait_for_shutdown() => return Ok(PageOutcome::Cancelled),
                    ticket = self.pool.acquire() => ticket?,
                },
                None => self.pool.acquire().await?,
            };
            if self.cancelled() {
                return Ok(PageOutcome::Cancelled);
            }
            debug!(
                node = %job.node_name(),
                page = job.page(),
                attempt,
                "Requesting listing page"
            );
            let result = self.client.fetch_page(&request).await;
            ticket.release();

            let error = match result {
                Ok(page) => {
                    if let Some(previous) = &last_error {
                        let ctx = self.context(job, attempt, previous, Duration::ZERO);
                        info!("{}", ctx.format_success());
                    }
                    let records = page.records.len();
                    job.record_success(page.records);
                    return Ok(PageOutcome::Fetched {
                        records,
                        has_more: page.has_more,
                        attempts: attempt,
                    });
                }
                Err(e) => e,
            };

            match job.record_failure(self.max_retries) {
                JobState::Retrying { attempt, delay } => {
                    let ctx = self.context(job, attempt, &error, delay);
                    warn!(
                        node = %job.node_name(),
                        page = job.page(),
                        attempt,
                        error = %error,
                        "{}",
                        ctx.format_retry()
                    );
                    metrics::record_retry_backoff(delay, attempt);

                    if !pause(delay, self.shutdown.as_ref()).await {
                        return Ok(PageOutcome::Cancelled);
                    }
                    last_error = Some(error);
                }
                _ => {
                    let attempts = job.retry_count();
                    let ctx = self.context(job, attempts, &error, Duration::ZERO);
                    warn!("{}", ctx.format_failure());
                    metrics::record_page_abandoned(attempts);
                    return Ok(PageOutcome::Abandoned {
                        attempts,
                        last_error: error,
                    });
                }
            }
        }
    }

    fn context(
        &self,
        job: &FetchJob,
        attempt: u32,
        error: &FetcherError,
        delay: Duration,
    ) -> RetryContext {
        RetryContext::new(
            attempt,
            self.max_retries,
            error,
            delay,
            job.node_name(),
            job.page(),
            self.client.endpoint(),
        )
    }

    fn cancelled(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|s| s.is_shutdown_requested())
    }
}

/// Sleep for `delay` unless cancellation is requested first.
///
/// Returns `false` when the pause was cut short by cancellation.
pub(crate) async fn pause(delay: Duration, shutdown: Option<&SharedShutdown>) -> bool {
    match shutdown {
        Some(shutdown) => {
            tokio::select! {
                _ = sleep(delay) => true,
                _ = shutdown.wait_for_shutdown() => false,
            }
        }
        None => {
            sleep(delay).await;
            true
        }
    }
}
