//! Recursive tree builder
//!
//! Lists a container, attaches every kept record as a child in discovery
//! order, then recurses into all eligible child containers concurrently and
//! waits for every branch to settle before returning.

use futures::future::{join_all, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::descriptor::RootDescriptor;
use crate::fetcher::pagination::{ChildListing, PaginationDriver};
use crate::fetcher::retry::RetryingPageFetcher;
use crate::fetcher::ListingClient;
use crate::metrics;
use crate::shutdown::SharedShutdown;
use crate::traversal::config::TraversalConfig;
use crate::traversal::progress::{ProgressCounters, ProgressSnapshot};
use crate::traversal::rate_limit::RequestPool;
use crate::traversal::TraversalError;
use crate::{ListingStatus, Node, TraversalMode};

/// A node whose listing stopped early
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbandonedNode {
    /// Identifier of the node
    pub external_id: String,
    /// Sanitized display name
    pub name: String,
    /// Depth of the node
    pub depth: u32,
    /// Children kept from the pages that did succeed
    pub records_kept: usize,
    /// Why the listing stopped
    pub reason: String,
}

/// Result of one traversal
#[derive(Debug, Clone)]
pub struct TraversalOutcome {
    /// Materialized tree
    pub root: Node,
    /// Filter the traversal ran with
    pub mode: TraversalMode,
    /// Depth limit the traversal ran with
    pub max_depth: u32,
    /// Nodes whose listing is incomplete, in tree order
    pub abandoned: Vec<AbandonedNode>,
    /// Whether cancellation, or a closed request pool, cut the traversal short
    pub cancelled: bool,
    /// Final counter values
    pub progress: ProgressSnapshot,
    /// Wall-clock time of the traversal
    pub elapsed: Duration,
}

impl TraversalOutcome {
    /// Whether the tree may be missing entries
    pub fn is_partial(&self) -> bool {
        self.cancelled || !self.abandoned.is_empty()
    }
}

/// Builds trees from a listing client
///
/// All traversals started from one builder share its request pool.
pub struct TreeBuilder {
    client: Arc<dyn ListingClient>,
    pool: Arc<RequestPool>,
    config: TraversalConfig,
    shutdown: Option<SharedShutdown>,
}

impl TreeBuilder {
    /// Create a builder
    pub fn new(client: Arc<dyn ListingClient>, config: TraversalConfig) -> Self {
        let pool = Arc::new(RequestPool::new(config.max_concurrent, config.min_interval));
        Self {
            client,
            pool,
            config,
            shutdown: None,
        }
    }

    /// Attach a cancellation handle
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &TraversalConfig {
        &self.config
    }

    /// Request pool shared by this builder's traversals
    pub fn pool(&self) -> &Arc<RequestPool> {
        &self.pool
    }

    /// Validate the inputs and set up a traversal without starting it
    ///
    /// The returned [`Traversal`] exposes its progress counters so an
    /// observer can poll them while [`Traversal::run`] is in flight.
    ///
    /// # Errors
    /// Returns `ConfigError` for `max_depth < 1`, an invalid configuration or
    /// an incomplete root descriptor. No request is made in that case.
    pub fn prepare(
        &self,
        root: &RootDescriptor,
        max_depth: u32,
        mode: TraversalMode,
    ) -> Result<Traversal, TraversalError> {
        if max_depth < 1 {
            return Err(TraversalError::ConfigError(format!(
                "max_depth must be at least 1, got {max_depth}"
            )));
        }
        self.config.validate()?;
        root.validate()
            .map_err(|e| TraversalError::ConfigError(e.to_string()))?;

        let mut fetcher =
            RetryingPageFetcher::new(self.client.clone(), self.pool.clone(), self.config.max_retries);
        let mut driver_shutdown = None;
        if let Some(shutdown) = &self.shutdown {
            fetcher = fetcher.with_shutdown(shutdown.clone());
            driver_shutdown = Some(shutdown.clone());
        }

        let mut driver = PaginationDriver::new(
            fetcher,
            self.config.page_size,
            self.config.page_settle_delay,
            mode,
        );
        if let Some(shutdown) = driver_shutdown {
            driver = driver.with_shutdown(shutdown);
        }

        Ok(Traversal {
            root: root.clone(),
            max_depth,
            mode,
            driver,
            progress: Arc::new(ProgressCounters::new()),
            shutdown: self.shutdown.clone(),
            interrupted: AtomicBool::new(false),
        })
    }

    /// Traverse `root` down to `max_depth`
    ///
    /// # Errors
    /// Only configuration errors; see [`TreeBuilder::prepare`]
    pub async fn traverse(
        &self,
        root: &RootDescriptor,
        max_depth: u32,
        mode: TraversalMode,
    ) -> Result<TraversalOutcome, TraversalError> {
        Ok(self.prepare(root, max_depth, mode)?.run().await)
    }
}

/// One prepared traversal
pub struct Traversal {
    root: RootDescriptor,
    max_depth: u32,
    mode: TraversalMode,
    driver: PaginationDriver,
    progress: Arc<ProgressCounters>,
    shutdown: Option<SharedShutdown>,
    /// Set when a listing stopped without finishing, including on a closed pool
    interrupted: AtomicBool,
}

impl Traversal {
    /// Counters of this traversal, readable while it runs
    pub fn progress(&self) -> Arc<ProgressCounters> {
        Arc::clone(&self.progress)
    }

    /// Run to completion
    ///
    /// Returns only after every branch has settled. Never fails: listings
    /// that give up are reported in [`TraversalOutcome::abandoned`].
    pub async fn run(self) -> TraversalOutcome {
        let started = Instant::now();
        self.progress.reset();

        info!(
            root = %self.root,
            max_depth = self.max_depth,
            mode = %self.mode,
            "Traversal started"
        );

        let mut root = Node::root(&self.root);
        let abandoned = self.build_subtree(&mut root).await;

        let outcome = TraversalOutcome {
            root,
            mode: self.mode,
            max_depth: self.max_depth,
            abandoned,
            cancelled: self.cancelled() || self.interrupted.load(Ordering::SeqCst),
            progress: self.progress.snapshot(),
            elapsed: started.elapsed(),
        };

        info!(
            entries = outcome.root.count() - 1,
            discovered = outcome.progress.discovered,
            processed = outcome.progress.processed,
            abandoned = outcome.abandoned.len(),
            cancelled = outcome.cancelled,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "Traversal finished"
        );

        outcome
    }

    /// List `node`, attach its children and recurse into eligible containers
    fn build_subtree<'a>(&'a self, node: &'a mut Node) -> BoxFuture<'a, Vec<AbandonedNode>> {
        async move {
            let listing = self
                .driver
                .list_children(&self.root, &node.external_id, &node.name)
                .await;

            let mut abandoned = Vec::new();
            if listing.cancelled {
                self.interrupted.store(true, Ordering::SeqCst);
            }
            node.listing = self.listing_status(&listing);
            if let Some(gap) = &listing.gap {
                warn!(node = %node.name, depth = node.depth, "Listing incomplete: {}", gap);
                abandoned.push(AbandonedNode {
                    external_id: node.external_id.clone(),
                    name: node.name.clone(),
                    depth: node.depth,
                    records_kept: listing.records.len(),
                    reason: gap.to_string(),
                });
            }

            let discovered = listing.records.len();
            self.progress.add_discovered(discovered as u64);
            metrics::record_discovered(discovered);

            let child_depth = node.depth + 1;
            node.children = listing
                .records
                .into_iter()
                .map(|record| Node::from_record(record, child_depth))
                .collect();

            debug!(
                node = %node.name,
                depth = node.depth,
                children = node.children.len(),
                "Attached children"
            );

            let recurse = child_depth < self.max_depth && !self.cancelled();
            let mut branches = Vec::new();
            for child in node.children.iter_mut() {
                if recurse && child.is_container {
                    branches.push(
                        async move {
                            let lost = self.build_subtree(child).await;
                            self.progress.add_processed(1);
                            lost
                        }
                        .boxed(),
                    );
                } else {
                    self.progress.add_processed(1);
                }
            }

            for lost in join_all(branches).await {
                abandoned.extend(lost);
            }

            abandoned
        }
        .boxed()
    }

    fn listing_status(&self, listing: &ChildListing) -> ListingStatus {
        if !listing.is_complete() {
            ListingStatus::Incomplete
        } else if self.mode == TraversalMode::ContainersOnly {
            ListingStatus::Filtered
        } else {
            ListingStatus::Complete
        }
    }

    fn cancelled(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|s| s.is_shutdown_requested())
    }
}
