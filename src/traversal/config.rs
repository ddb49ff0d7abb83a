//! Traversal configuration constants

use std::time::Duration;

use crate::traversal::TraversalError;

/// Upper bound on simultaneously active pool tickets.
pub const DEFAULT_MAX_CONCURRENT: usize = 2;

/// Minimum spacing between two request starts, in milliseconds.
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 3000;

/// Total attempts per page before it is abandoned.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Depth used when the caller does not pick one.
pub const DEFAULT_DEPTH: u32 = 1;

/// Records requested per page.
pub const PAGE_SIZE: u32 = 100;

/// Largest page size the endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Pause between two successful pages of the same node, in milliseconds.
pub const PAGE_SETTLE_DELAY_MS: u64 = 2000;

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Backoff cap in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 10_000;

/// Hard stop for one node's pagination loop.
pub const MAX_PAGES: u32 = 10_000;

/// Calculate exponential backoff delay
///
/// `retry_count` is the number of failed attempts so far for the page, so the
/// first retry waits 2 s, the second 4 s, capped at 10 s.
pub fn calculate_backoff(retry_count: u32) -> Duration {
    let delay_ms = 2u64
        .checked_pow(retry_count)
        .and_then(|factor| INITIAL_BACKOFF_MS.checked_mul(factor))
        .unwrap_or(MAX_BACKOFF_MS);
    Duration::from_millis(delay_ms.min(MAX_BACKOFF_MS))
}

/// Tunables of one traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalConfig {
    /// Upper bound on active pool tickets
    pub max_concurrent: usize,
    /// Minimum spacing between request starts
    pub min_interval: Duration,
    /// Total attempts per page
    pub max_retries: u32,
    /// Depth used when none is given
    pub default_depth: u32,
    /// Records per page
    pub page_size: u32,
    /// Pause between successful pages of one node
    pub page_settle_delay: Duration,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            min_interval: Duration::from_millis(DEFAULT_MIN_INTERVAL_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            default_depth: DEFAULT_DEPTH,
            page_size: PAGE_SIZE,
            page_settle_delay: Duration::from_millis(PAGE_SETTLE_DELAY_MS),
        }
    }
}

impl TraversalConfig {
    /// Set the pool's concurrency bound
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Set the minimum spacing between request starts
    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    /// Set the attempt budget per page
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the default depth
    pub fn with_default_depth(mut self, default_depth: u32) -> Self {
        self.default_depth = default_depth;
        self
    }

    /// Set the page size
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the pause between successful pages
    pub fn with_page_settle_delay(mut self, delay: Duration) -> Self {
        self.page_settle_delay = delay;
        self
    }

    /// Reject values the traversal cannot run with.
    pub fn validate(&self) -> Result<(), TraversalError> {
        if self.max_concurrent == 0 {
            return Err(TraversalError::ConfigError(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(TraversalError::ConfigError(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.default_depth == 0 {
            return Err(TraversalError::ConfigError(
                "default_depth must be at least 1".to_string(),
            ));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(TraversalError::ConfigError(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        Ok(())
    }
}
