//! Traversal orchestration
//!
//! This module drives the discovery of a remote tree: one listing per
//! container, under a request budget shared by every branch.
//!
//! # Overview
//!
//! 1. **Configuration**: tunables and defaults in [`config::TraversalConfig`]
//! 2. **Admission**: every request holds a ticket from [`rate_limit::RequestPool`]
//! 3. **Retries**: each page is tracked by a [`job::FetchJob`] state machine
//! 4. **Progress**: [`progress::ProgressCounters`] can be polled while a traversal runs
//! 5. **Execution**: [`executor::TreeBuilder`] lists, attaches and fans out
//!
//! # Error Handling
//!
//! Only configuration problems are errors, and they are reported before any
//! request is made. Listing failures are retried and, once the attempt budget
//! is spent, recorded as [`executor::AbandonedNode`]s in the outcome; they
//! never abort the traversal.
//!
//! # Related Modules
//!
//! - [`crate::fetcher`] - listing client, retries and pagination
//! - [`crate::output`] - reports of a finished traversal

pub mod config;
pub mod executor;
pub mod job;
pub mod progress;
pub mod rate_limit;

pub use config::TraversalConfig;
pub use executor::{AbandonedNode, Traversal, TraversalOutcome, TreeBuilder};
pub use job::{FetchJob, JobState};
pub use progress::{ProgressCounters, ProgressSnapshot};
pub use rate_limit::{PoolTicket, RateLimitError, RequestPool};

/// Traversal errors
#[derive(Debug, thiserror::Error)]
pub enum TraversalError {
    /// Invalid depth, concurrency or root parameters
    #[error("configuration error: {0}")]
    ConfigError(String),
}
