//! CLI error types and conversions

use crate::descriptor::DescriptorError;
use crate::fetcher::FetcherError;
use crate::metrics::MetricsError;
use crate::output::OutputError;
use crate::traversal::TraversalError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Root descriptor error
    #[error("descriptor error: {0}")]
    DescriptorError(#[from] DescriptorError),

    /// Traversal setup error
    #[error("traversal error: {0}")]
    TraversalError(#[from] TraversalError),

    /// Listing client error
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// Metrics exporter error
    #[error("metrics error: {0}")]
    MetricsError(#[from] MetricsError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
