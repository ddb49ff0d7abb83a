//! Rate-limited request pool
//!
//! Bounds the number of in-flight listing requests and spaces request starts
//! by a minimum interval, globally across every branch of a traversal.
//!
//! Waiters queue on a fair [`tokio::sync::Mutex`], so tickets are granted in
//! arrival order. The queue head holds the gate while it waits for a free
//! slot and then for the interval to elapse; everyone behind it waits on the
//! gate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep_until, Instant};
use tracing::trace;

use crate::metrics;

/// Admission control shared by all page fetches of a traversal
#[derive(Debug)]
pub struct RequestPool {
    last_grant: Mutex<Option<Instant>>,
    slots: Arc<Semaphore>,
    active: Arc<AtomicUsize>,
    max_concurrent: usize,
    min_interval: Duration,
}

impl RequestPool {
    /// Create a pool
    ///
    /// # Arguments
    /// * `max_concurrent` - Upper bound on active tickets (at least 1)
    /// * `min_interval` - Minimum spacing between two grants
    pub fn new(max_concurrent: usize, min_interval: Duration) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            last_grant: Mutex::new(None),
            slots: Arc::new(Semaphore::new(max_concurrent)),
            active: Arc::new(AtomicUsize::new(0)),
            max_concurrent,
            min_interval,
        }
    }

    /// Wait for a ticket
    ///
    /// Suspends until fewer than `max_concurrent` tickets are active and
    /// `min_interval` has passed since the previous grant.
    ///
    /// # Errors
    /// Returns `AcquireError` once the pool has been closed
    pub async fn acquire(&self) -> Result<PoolTicket, RateLimitError> {
        let requested_at = Instant::now();
        let mut last_grant = self.last_grant.lock().await;

        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| RateLimitError::AcquireError(e.to_string()))?;

        if let Some(previous) = *last_grant {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                sleep_until(ready_at).await;
            }
        }

        let granted_at = Instant::now();
        *last_grant = Some(granted_at);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        drop(last_grant);

        metrics::record_pool_wait(granted_at.duration_since(requested_at));
        metrics::set_pool_active(active);
        trace!(active, "Pool ticket granted");

        Ok(PoolTicket {
            _permit: permit,
            active: Arc::clone(&self.active),
            granted_at,
        })
    }

    /// Number of tickets currently held
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Configured concurrency bound
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Configured grant spacing
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Refuse all further grants. Current and queued waiters fail.
    pub fn close(&self) {
        self.slots.close();
    }
}

/// Right to execute exactly one request now
///
/// Released by [`PoolTicket::release`] or by dropping it, on every exit path.
#[derive(Debug)]
pub struct PoolTicket {
    _permit: OwnedSemaphorePermit,
    active: Arc<AtomicUsize>,
    granted_at: Instant,
}

impl PoolTicket {
    /// When the ticket was granted
    pub fn granted_at(&self) -> Instant {
        self.granted_at
    }

    /// Give the slot back to the pool.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for PoolTicket {
    fn drop(&mut self) {
        // Decrement before the permit field drops so `active` never overshoots.
        let active = self.active.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_pool_active(active);
    }
}

/// Rate limiter errors
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Failed to acquire a ticket
    #[error("failed to acquire request pool ticket: {0}")]
    AcquireError(String),
}
