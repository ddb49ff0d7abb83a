//! Per-node fetch job and its retry state machine
//!
//! ```text
//! Pending -> Attempting -> Succeeded -> (next page) Pending
//!                |
//!                +-> Retrying -> Attempting
//!                +-> Abandoned
//! ```
//!
//! The job carries the target node, the current page, every record
//! accumulated so far and the failure count of the current page. It lives
//! only for one node's pagination loop.

use std::time::Duration;

use crate::traversal::config::calculate_backoff;
use crate::Record;

/// State of the page currently being fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    /// No attempt made yet for the current page
    #[default]
    Pending,
    /// An attempt is in flight
    Attempting {
        /// 1-based attempt number
        attempt: u32,
    },
    /// The last attempt failed; the next one starts after `delay`
    Retrying {
        /// Number of the attempt that failed
        attempt: u32,
        /// Backoff before the next attempt
        delay: Duration,
    },
    /// The current page was fetched
    Succeeded {
        /// Attempts it took
        attempts: u32,
    },
    /// The attempt budget was exhausted
    Abandoned {
        /// Attempts made
        attempts: u32,
    },
}

impl JobState {
    /// Whether no further attempt will be made for this page
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Abandoned { .. })
    }
}

/// Ephemeral descriptor of one node's outstanding page requests
#[derive(Debug, Clone)]
pub struct FetchJob {
    node_id: String,
    node_name: String,
    page: u32,
    records: Vec<Record>,
    retry_count: u32,
    state: JobState,
}

impl FetchJob {
    /// Job for page 1 of `node_id`'s children
    pub fn new(node_id: impl Into<String>, node_name: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            node_name: node_name.into(),
            page: 1,
            records: Vec::new(),
            retry_count: 0,
            state: JobState::Pending,
        }
    }

    /// Enter `Attempting` and return the attempt number
    pub fn begin_attempt(&mut self) -> u32 {
        debug_assert!(
            matches!(self.state, JobState::Pending | JobState::Retrying { .. }),
            "attempt started from {:?}",
            self.state
        );
        let attempt = self.retry_count + 1;
        self.state = JobState::Attempting { attempt };
        attempt
    }

    /// Record a failed attempt
    ///
    /// Moves to `Retrying` with the backoff for the failure count, or to
    /// `Abandoned` once `max_attempts` attempts have failed.
    pub fn record_failure(&mut self, max_attempts: u32) -> JobState {
        self.retry_count += 1;
        self.state = if self.retry_count >= max_attempts {
            JobState::Abandoned {
                attempts: self.retry_count,
            }
        } else {
            JobState::Retrying {
                attempt: self.retry_count,
                delay: calculate_backoff(self.retry_count),
            }
        };
        self.state
    }

    /// Record a fetched page and append its records
    pub fn record_success(&mut self, records: Vec<Record>) -> JobState {
        self.state = JobState::Succeeded {
            attempts: self.retry_count + 1,
        };
        self.records.extend(records);
        self.state
    }

    /// Move on to the next page with a fresh attempt budget
    pub fn advance_page(&mut self) {
        self.page += 1;
        self.retry_count = 0;
        self.state = JobState::Pending;
    }

    /// Node whose children are being listed
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Display name of the node
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Current 1-based page
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Failed attempts on the current page
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Current state
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Records accumulated so far
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Consume the job, yielding its records in request order
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}
