//! Observability metrics for tree traversals
//!
//! Counters and histograms for listing requests, retries, abandoned pages
//! and request-pool pressure.
//!
//! ## Architecture
//!
//! - Uses `metrics` crate for low-overhead metric collection
//! - Optional Prometheus exporter for a scrape endpoint (`--metrics-addr`)
//! - Recording without an installed exporter is a no-op

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(false));

/// Correlation ID generator for request tracing
static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Errors raised while installing the exporter
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Prometheus exporter could not be installed (port in use, recorder already set)
    #[error("failed to install Prometheus exporter: {0}")]
    InstallFailed(String),
}

/// Initialize metrics system with Prometheus exporter
///
/// Idempotent: a second call is a no-op.
///
/// # Arguments
/// * `addr` - Socket address to bind the scrape endpoint (e.g., "127.0.0.1:9090")
pub async fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    let mut initialized = METRICS_INITIALIZED.lock().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::InstallFailed(e.to_string()))?;

    describe_counter!(
        "listing_requests_total",
        Unit::Count,
        "Listing requests issued, labelled by outcome"
    );

    describe_histogram!(
        "listing_request_duration_seconds",
        Unit::Seconds,
        "Listing request duration in seconds"
    );

    describe_counter!(
        "listing_retries_total",
        Unit::Count,
        "Listing page attempts that were retried after a failure"
    );

    describe_histogram!(
        "retry_backoff_duration_seconds",
        Unit::Seconds,
        "Backoff slept before a retried page attempt"
    );

    describe_counter!(
        "listing_pages_abandoned_total",
        Unit::Count,
        "Pages given up after exhausting the attempt budget"
    );

    describe_histogram!(
        "pool_wait_seconds",
        Unit::Seconds,
        "Time spent waiting for a request pool ticket"
    );

    describe_gauge!(
        "pool_active_tickets",
        Unit::Count,
        "Request pool tickets currently held"
    );

    describe_counter!(
        "traversal_records_discovered_total",
        Unit::Count,
        "Records discovered across all traversals"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Generate a new correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Timing and outcome of one listing request
pub struct ListingRequestMetrics {
    endpoint: String,
    start_time: Instant,
    correlation_id: String,
}

impl ListingRequestMetrics {
    /// Start recording a new listing request
    pub fn start(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            start_time: Instant::now(),
            correlation_id: generate_correlation_id(),
        }
    }

    /// Record a response with an HTTP status
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();
        let outcome = if (200..300).contains(&status_code) {
            "ok".to_string()
        } else {
            format!("http_{status_code}")
        };

        counter!(
            "listing_requests_total",
            "endpoint" => self.endpoint.clone(),
            "outcome" => outcome,
        )
        .increment(1);

        histogram!(
            "listing_request_duration_seconds",
            "endpoint" => self.endpoint.clone(),
        )
        .record(duration.as_secs_f64());

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            status = status_code,
            duration_ms = duration.as_millis(),
            "Listing request completed"
        );
    }

    /// Record a transport failure (no status code)
    pub fn record_network_error(&self) {
        let duration = self.start_time.elapsed();

        counter!(
            "listing_requests_total",
            "endpoint" => self.endpoint.clone(),
            "outcome" => "network_error",
        )
        .increment(1);

        histogram!(
            "listing_request_duration_seconds",
            "endpoint" => self.endpoint.clone(),
        )
        .record(duration.as_secs_f64());

        warn!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            duration_ms = duration.as_millis(),
            "Network error recorded"
        );
    }

    /// Get the correlation ID for this request
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record retry backoff duration
pub fn record_retry_backoff(duration: Duration, attempt: u32) {
    counter!(
        "listing_retries_total",
        "attempt" => attempt.to_string(),
    )
    .increment(1);

    histogram!(
        "retry_backoff_duration_seconds",
        "attempt" => attempt.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record a page given up after the attempt budget ran out
pub fn record_page_abandoned(attempts: u32) {
    counter!(
        "listing_pages_abandoned_total",
        "attempts" => attempts.to_string(),
    )
    .increment(1);
}

/// Record time spent queued for a pool ticket
pub fn record_pool_wait(wait: Duration) {
    histogram!("pool_wait_seconds").record(wait.as_secs_f64());

    if wait.as_millis() > 100 {
        debug!(wait_ms = wait.as_millis(), "Pool ticket granted after wait");
    }
}

/// Update the active tickets gauge
pub fn set_pool_active(active: usize) {
    gauge!("pool_active_tickets").set(active as f64);
}

/// Record records discovered under one node
pub fn record_discovered(count: usize) {
    counter!("traversal_records_discovered_total").increment(count as u64);
}

/// Check if metrics system is initialized
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.lock().await
}
