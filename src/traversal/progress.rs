//! Progress accounting for a traversal.
//!
//! `discovered` grows by the number of kept records each time a node's
//! listing completes; `processed` grows by one each time a child's subtree
//! settles. The denominator is therefore only known once the traversal ends:
//! the ratio is a running approximation and can jump backwards when a new
//! branch is discovered after other children were already processed.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Pair of additive counters shared by every branch of one traversal
#[derive(Debug, Default)]
pub struct ProgressCounters {
    discovered: AtomicU64,
    processed: AtomicU64,
}

impl ProgressCounters {
    /// Counters starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records seen in a completed listing
    pub fn add_discovered(&self, count: u64) {
        self.discovered.fetch_add(count, Ordering::Release);
    }

    /// Mark one more child as fully processed
    pub fn add_processed(&self, count: u64) {
        self.processed.fetch_add(count, Ordering::Release);
    }

    /// Records seen so far
    pub fn discovered(&self) -> u64 {
        self.discovered.load(Ordering::Acquire)
    }

    /// Records whose subtree has settled
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Acquire)
    }

    /// Reset both counters to zero
    pub fn reset(&self) {
        self.discovered.store(0, Ordering::Release);
        self.processed.store(0, Ordering::Release);
    }

    /// Point-in-time copy of both counters
    pub fn snapshot(&self) -> ProgressSnapshot {
        // Read processed before discovered. Every processed increment happens
        // after the matching discovered increment, so the acquire load of
        // processed makes that discovered value visible: processed <= discovered.
        let processed = self.processed();
        let discovered = self.discovered();
        ProgressSnapshot {
            discovered,
            processed,
        }
    }
}

/// Copy of the counters at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Records seen so far
    pub discovered: u64,
    /// Records whose subtree has settled
    pub processed: u64,
}

impl ProgressSnapshot {
    /// Completion percentage (0-100) against what is known so far
    pub fn percentage(&self) -> Option<f64> {
        if self.discovered == 0 {
            return None;
        }
        Some((self.processed as f64 / self.discovered as f64) * 100.0)
    }

    /// Human-readable progress string for logging.
    pub fn format_progress(&self, elapsed: Duration) -> String {
        let mut parts = vec![format!(
            "[PROGRESS] Processed {}/{} entries",
            self.processed, self.discovered
        )];

        if let Some(pct) = self.percentage() {
            parts.push(format!("- {pct:.1}% of discovered"));
        }

        parts.push(format!("- {} elapsed", format_duration(elapsed)));
        parts.join(" ")
    }
}

/// Compact duration for progress lines and reports ("45s", "3m", "1.5h").
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{:.1}h", secs as f64 / 3600.0)
    }
}
