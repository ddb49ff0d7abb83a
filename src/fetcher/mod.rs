//! Listing fetchers
//!
//! Three layers sit between the tree builder and the network:
//!
//! 1. [`ListingClient`] performs exactly one page request and classifies the
//!    result ([`share_http::ShareListingClient`] is the production client).
//! 2. [`retry::RetryingPageFetcher`] runs each request through the shared
//!    request pool and retries failures with exponential backoff.
//! 3. [`pagination::PaginationDriver`] walks every page of one node.

use crate::descriptor::RootDescriptor;
use crate::Record;
use async_trait::async_trait;

pub mod pagination;
pub mod retry;
pub mod retry_formatter;
pub mod share_http;
pub mod share_parser;

/// Fetcher errors
///
/// The first four variants are transport failures, the last two mean the
/// server answered but the answer was unusable. Both kinds are retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetcherError {
    /// Request timed out
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection could not be established
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Non-2xx HTTP status
    #[error("HTTP error: status {status}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
    },

    /// Other transport failure
    #[error("network error: {0}")]
    NetworkError(String),

    /// Listing endpoint reported a non-zero status code
    #[error("listing endpoint reported errno {errno}")]
    ProtocolError {
        /// Application-level status code from the envelope
        errno: i64,
    },

    /// Response body could not be decoded
    #[error("parse error: {0}")]
    ParseError(String),
}

impl FetcherError {
    /// Whether the server answered and the failure is application-level.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            FetcherError::ProtocolError { .. } | FetcherError::ParseError(_)
        )
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Sort order requested from the listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Newest / largest first (what the web client requests)
    #[default]
    Descending,
    /// Oldest / smallest first
    Ascending,
}

/// One fully formed page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Sharing user
    pub owner_id: String,
    /// Share message the tree belongs to
    pub parent_collection_id: String,
    /// Group conversation the share was posted in
    pub conversation_id: String,
    /// Node whose children are listed
    pub external_id: String,
    /// 1-based page number
    pub page: u32,
    /// Records per page
    pub page_size: u32,
    /// Requested sort order
    pub sort_order: SortOrder,
}

impl PageRequest {
    /// Request page `page` of `external_id`'s children within `root`'s share.
    pub fn new(root: &RootDescriptor, external_id: &str, page: u32, page_size: u32) -> Self {
        Self {
            owner_id: root.owner_id.clone(),
            parent_collection_id: root.parent_collection_id.clone(),
            conversation_id: root.conversation_id.clone(),
            external_id: external_id.to_string(),
            page,
            page_size,
            sort_order: SortOrder::default(),
        }
    }
}

/// One successfully decoded page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListingPage {
    /// Records in server order
    pub records: Vec<Record>,
    /// Whether the server has further pages for this node
    pub has_more: bool,
}

/// A single page request against the listing endpoint.
///
/// Implementations perform exactly one attempt; throttling and retries are
/// layered on top by [`retry::RetryingPageFetcher`].
#[async_trait]
pub trait ListingClient: Send + Sync {
    /// Fetch one page of a node's children.
    async fn fetch_page(&self, request: &PageRequest) -> FetcherResult<ListingPage>;

    /// Endpoint description used in log messages
    fn endpoint(&self) -> &str;
}
