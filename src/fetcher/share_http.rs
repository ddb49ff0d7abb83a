//! HTTP client for the share listing endpoint
//!
//! Performs exactly one GET per call and classifies the outcome into
//! [`FetcherError`] variants. Throttling and retries live in
//! [`crate::fetcher::retry`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, COOKIE, PRAGMA};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::fetcher::share_parser::ShareParser;
use crate::fetcher::{
    FetcherError, FetcherResult, ListingClient, ListingPage, PageRequest, SortOrder,
};
use crate::metrics::ListingRequestMetrics;

/// Default host of the listing endpoint
pub const DEFAULT_BASE_URL: &str = "https://pan.baidu.com";

/// Path of the listing endpoint
pub const LISTING_PATH: &str = "/mbox/msg/shareinfo";

/// Application id the web client sends
const WEB_APP_ID: &str = "250528";

/// HTTP connect timeout (seconds)
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
/// HTTP request timeout (seconds)
const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Listing client talking to the real endpoint
pub struct ShareListingClient {
    client: Client,
    base_url: String,
    endpoint: String,
}

impl ShareListingClient {
    /// Create a client without session cookie
    ///
    /// # Errors
    /// Returns `NetworkError` if the underlying HTTP client cannot be built
    pub fn new(base_url: impl Into<String>) -> FetcherResult<Self> {
        Self::build(base_url.into(), None)
    }

    /// Create a client that sends `cookie` with every request
    ///
    /// The session is supplied externally and assumed valid for the whole
    /// traversal.
    pub fn with_cookie(base_url: impl Into<String>, cookie: &str) -> FetcherResult<Self> {
        Self::build(base_url.into(), Some(cookie))
    }

    fn build(base_url: String, cookie: Option<&str>) -> FetcherResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        if let Some(cookie) = cookie {
            let mut value = HeaderValue::from_str(cookie).map_err(|_| {
                FetcherError::NetworkError("Cookie contains invalid header characters".to_string())
            })?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()
            .map_err(|e| FetcherError::NetworkError(format!("Failed to build HTTP client: {e}")))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        let endpoint = format!("{base_url}{LISTING_PATH}");

        Ok(Self {
            client,
            base_url,
            endpoint,
        })
    }

    /// Base URL this client was configured with
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query parameters for one page, in the order the web client sends them
    pub fn query_params(request: &PageRequest) -> Vec<(&'static str, String)> {
        let desc = match request.sort_order {
            SortOrder::Descending => "1",
            SortOrder::Ascending => "0",
        };

        vec![
            ("from_uk", request.owner_id.clone()),
            ("msg_id", request.parent_collection_id.clone()),
            ("type", "2".to_string()),
            ("num", request.page_size.to_string()),
            ("page", request.page.to_string()),
            ("fs_id", request.external_id.clone()),
            ("gid", request.conversation_id.clone()),
            ("limit", request.page_size.to_string()),
            ("desc", desc.to_string()),
            ("clienttype", "0".to_string()),
            ("app_id", WEB_APP_ID.to_string()),
            ("web", "1".to_string()),
        ]
    }
}

/// Map a reqwest transport error onto the fetcher taxonomy
fn classify_transport_error(err: &reqwest::Error) -> FetcherError {
    if err.is_timeout() {
        FetcherError::Timeout(err.to_string())
    } else if err.is_connect() {
        FetcherError::ConnectionFailed(err.to_string())
    } else {
        FetcherError::NetworkError(err.to_string())
    }
}

#[async_trait]
impl ListingClient for ShareListingClient {
    async fn fetch_page(&self, request: &PageRequest) -> FetcherResult<ListingPage> {
        let params = Self::query_params(request);
        let metrics = ListingRequestMetrics::start(LISTING_PATH);

        debug!(
            correlation_id = %metrics.correlation_id(),
            fs_id = %request.external_id,
            page = request.page,
            "GET {}",
            self.endpoint
        );

        let response = match self.client.get(&self.endpoint).query(&params).send().await {
            Ok(response) => response,
            Err(e) => {
                metrics.record_network_error();
                return Err(classify_transport_error(&e));
            }
        };

        let status = response.status();
        metrics.record_complete(status.as_u16());

        if !status.is_success() {
            return Err(FetcherError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        ShareParser::parse_body(&body)
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
