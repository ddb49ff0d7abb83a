//! Retry message formatting for listing requests.
//!
//! Classifies [`FetcherError`]s for user messaging and formats the retry,
//! recovery and abandonment log lines emitted by
//! [`crate::fetcher::retry::RetryingPageFetcher`].

use std::time::Duration;

use crate::fetcher::FetcherError;

/// Classification of retry errors for user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Request timed out
    NetworkTimeout,
    /// Connection refused, DNS failure, or other offline scenarios
    NetworkOffline,
    /// HTTP 429 rate limit exceeded
    RateLimit,
    /// HTTP 5xx server error
    ServerError(u16),
    /// Session rejected (401/403)
    AuthFailed(u16),
    /// Other client errors (4xx, except 429)
    ClientError(u16),
    /// Endpoint answered with a non-zero errno
    EndpointError(i64),
    /// Response body could not be decoded
    MalformedResponse,
    /// Generic fallback when no better classification fits
    NetworkGeneric,
}

impl RetryErrorType {
    /// Classify a fetcher error.
    pub fn from_error(err: &FetcherError) -> Self {
        match err {
            FetcherError::Timeout(_) => Self::NetworkTimeout,
            FetcherError::ConnectionFailed(_) => Self::NetworkOffline,
            FetcherError::HttpStatus { status } => match *status {
                429 => Self::RateLimit,
                401 | 403 => Self::AuthFailed(*status),
                s if s >= 500 => Self::ServerError(s),
                s => Self::ClientError(s),
            },
            FetcherError::ProtocolError { errno } => Self::EndpointError(*errno),
            FetcherError::ParseError(_) => Self::MalformedResponse,
            FetcherError::NetworkError(_) => Self::NetworkGeneric,
        }
    }

    /// User-friendly description string used inside retry log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network timeout",
            Self::NetworkOffline => "connection failed",
            Self::RateLimit => "rate limit exceeded",
            Self::ServerError(code) => match code {
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::AuthFailed(_) => "session rejected",
            Self::ClientError(404) => "listing endpoint not found",
            Self::ClientError(_) => "client error",
            Self::EndpointError(_) => "listing endpoint reported an error",
            Self::MalformedResponse => "malformed listing response",
            Self::NetworkGeneric => "network error",
        }
    }

    /// Suggested remediation presented after a page is abandoned.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "Check your network connection and firewall settings",
            Self::NetworkOffline => "Verify internet connectivity and DNS resolution",
            Self::RateLimit | Self::EndpointError(_) => {
                "Raise --min-interval-ms or lower --max-concurrent and run again"
            }
            Self::ServerError(_) => "The share host may be having issues, try again later",
            Self::AuthFailed(_) => "Refresh the session cookie (--cookie / SHARE_TREE_COOKIE)",
            Self::ClientError(_) => "Check --base-url and the root descriptor identifiers",
            Self::MalformedResponse => "Check --base-url points at the share listing host",
            Self::NetworkGeneric => "Check network connectivity and try again",
        }
    }
}

/// Context for formatting retry messages.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Current attempt number (1-based)
    pub attempt: u32,
    /// Attempt budget per page
    pub max_attempts: u32,
    /// Type of error that triggered the retry
    pub error_type: RetryErrorType,
    /// Backoff until the next attempt
    pub backoff_duration: Duration,
    /// Display name of the node being listed
    pub node: String,
    /// Page being fetched
    pub page: u32,
    /// Original error message
    pub error_message: String,
    /// Endpoint that failed
    pub endpoint: String,
}

impl RetryContext {
    /// Build a context from a failed attempt.
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        error: &FetcherError,
        backoff_duration: Duration,
        node: impl Into<String>,
        page: u32,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type: RetryErrorType::from_error(error),
            backoff_duration,
            node: node.into(),
            page,
            error_message: error.to_string(),
            endpoint: endpoint.into(),
        }
    }

    /// Format standardized retry message with attempt counters and context.
    pub fn format_retry(&self) -> String {
        format!(
            "Retrying (attempt {}/{}) after {} - waiting {:.1} seconds... ({} page {})",
            self.attempt + 1,
            self.max_attempts,
            self.error_type.description(),
            self.backoff_duration.as_secs_f64(),
            self.node_display(),
            self.page
        )
    }

    /// Format retry success message when a later attempt works.
    pub fn format_success(&self) -> String {
        format!(
            "Retry attempt {}/{} succeeded - resuming listing ({} page {})",
            self.attempt,
            self.max_attempts,
            self.node_display(),
            self.page
        )
    }

    /// Format the abandonment summary with actionable suggestions.
    pub fn format_failure(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "[ABANDONED] Listing page {} gave up after {} attempts",
            self.page, self.attempt
        ));
        lines.push(format!("  Last error: {}", self.error_message));
        lines.push(format!("  Directory: {}", self.node_display()));
        lines.push(format!("  Endpoint: {}", self.endpoint));
        lines.push("  Suggestions:".to_string());

        for suggestion in self.format_suggestions() {
            lines.push(format!("    - {suggestion}"));
        }

        lines.join("\n")
    }

    /// Derive suggestions tailored to the current retry context.
    pub fn format_suggestions(&self) -> Vec<String> {
        vec![
            self.error_type.suggestion().to_string(),
            format!(
                "Try increasing --max-retries (current: {})",
                self.max_attempts
            ),
        ]
    }

    fn node_display(&self) -> &str {
        if self.node.is_empty() {
            "unknown"
        } else {
            &self.node
        }
    }
}
