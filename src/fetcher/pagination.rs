//! Pagination driver
//!
//! Walks every page of one node's children through the
//! [`RetryingPageFetcher`], strictly in increasing page order, pausing a
//! settle delay between successful pages.
//!
//! Includes safety mechanisms:
//! - Maximum page limit to prevent infinite loops
//! - Empty page detection (a page with no records ends the listing even if
//!   the server claims more)
//! - Cancellation checks between pages

use std::time::Duration;
use tracing::{debug, warn};

use crate::descriptor::RootDescriptor;
use crate::fetcher::retry::{pause, PageOutcome, RetryingPageFetcher};
use crate::fetcher::FetcherError;
use crate::shutdown::SharedShutdown;
use crate::traversal::config::MAX_PAGES;
use crate::traversal::job::FetchJob;
use crate::{Record, TraversalMode};

/// Why a listing stopped before the server said it was done
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingGap {
    /// A page exhausted its attempt budget
    PageAbandoned {
        /// The page that was given up
        page: u32,
        /// Attempts made on it
        attempts: u32,
        /// Error of the final attempt
        error: FetcherError,
    },
    /// The page limit was reached while the server still reported more
    PageLimit {
        /// Pages fetched
        pages: u32,
    },
}

impl std::fmt::Display for ListingGap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingGap::PageAbandoned {
                page,
                attempts,
                error,
            } => write!(f, "page {page} abandoned after {attempts} attempts: {error}"),
            ListingGap::PageLimit { pages } => {
                write!(f, "stopped after {pages} pages (page limit)")
            }
        }
    }
}

/// Children of one node as gathered by the driver
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildListing {
    /// Kept records in request order
    pub records: Vec<Record>,
    /// Records removed by the traversal mode filter
    pub filtered_out: usize,
    /// Pages retrieved successfully
    pub pages_fetched: u32,
    /// Set when the listing stopped early because of a failure
    pub gap: Option<ListingGap>,
    /// Set when cancellation stopped the listing
    pub cancelled: bool,
}

impl ChildListing {
    /// Whether every page the server offered was retrieved
    pub fn is_complete(&self) -> bool {
        self.gap.is_none() && !self.cancelled
    }
}

/// Lists every child of a node
pub struct PaginationDriver {
    fetcher: RetryingPageFetcher,
    page_size: u32,
    settle_delay: Duration,
    mode: TraversalMode,
    shutdown: Option<SharedShutdown>,
}

impl PaginationDriver {
    /// Create a driver
    pub fn new(
        fetcher: RetryingPageFetcher,
        page_size: u32,
        settle_delay: Duration,
        mode: TraversalMode,
    ) -> Self {
        Self {
            fetcher,
            page_size,
            settle_delay,
            mode,
            shutdown: None,
        }
    }

    /// Stop between pages once `shutdown` is requested
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Traversal-wide record filter
    pub fn mode(&self) -> TraversalMode {
        self.mode
    }

    /// Gather the children of `node_id`
    ///
    /// Pages already retrieved are kept when a later page is abandoned or the
    /// traversal is cancelled. The mode filter is applied to the accumulated
    /// records at the end.
    pub async fn list_children(
        &self,
        root: &RootDescriptor,
        node_id: &str,
        node_name: &str,
    ) -> ChildListing {
        let mut job = FetchJob::new(node_id, node_name);
        let mut pages_fetched = 0;
        let mut gap = None;
        let mut cancelled = false;

        loop {
            if self.cancelled() {
                cancelled = true;
                break;
            }

            match self.fetcher.fetch(root, &mut job, self.page_size).await {
                Ok(PageOutcome::Fetched {
                    records, has_more, ..
                }) => {
                    pages_fetched += 1;
                    debug!(
                        node = %node_name,
                        page = job.page(),
                        records,
                        has_more,
                        "Received listing page"
                    );

                    if !has_more {
                        break;
                    }

                    if records == 0 {
                        debug!(
                            node = %node_name,
                            page = job.page(),
                            "Empty page still reports more pages, stopping"
                        );
                        break;
                    }

                    if pages_fetched >= MAX_PAGES {
                        warn!(
                            node = %node_name,
                            pages = pages_fetched,
                            "Max pages ({MAX_PAGES}) exceeded - possible infinite loop"
                        );
                        gap = Some(ListingGap::PageLimit {
                            pages: pages_fetched,
                        });
                        break;
                    }

                    if !pause(self.settle_delay, self.shutdown.as_ref()).await {
                        cancelled = true;
                        break;
                    }

                    job.advance_page();
                }
                Ok(PageOutcome::Abandoned {
                    attempts,
                    last_error,
                }) => {
                    gap = Some(ListingGap::PageAbandoned {
                        page: job.page(),
                        attempts,
                        error: last_error,
                    });
                    break;
                }
                Ok(PageOutcome::Cancelled) => {
                    cancelled = true;
                    break;
                }
                Err(e) => {
                    warn!(node = %node_name, error = %e, "Request pool unavailable, stopping listing");
                    cancelled = true;
                    break;
                }
            }
        }

        let all = job.into_records();
        let total = all.len();
        let records: Vec<Record> = all.into_iter().filter(|r| self.mode.keeps(r)).collect();
        let filtered_out = total - records.len();

        debug!(
            node = %node_name,
            pages = pages_fetched,
            kept = records.len(),
            filtered_out,
            "Listing finished"
        );

        ChildListing {
            records,
            filtered_out,
            pages_fetched,
            gap,
            cancelled,
        }
    }

    fn cancelled(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|s| s.is_shutdown_requested())
    }
}
