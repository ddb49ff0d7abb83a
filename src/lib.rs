//! # Share Tree Exporter Library
//!
//! Retrieves the directory tree of a remotely hosted shared file library and
//! materializes it as an in-memory [`Node`] tree for reporting.
//!
//! The remote side only exposes a paginated "list the children of this entry"
//! endpoint, so the tree has to be discovered one container at a time. The
//! library drives that discovery under a global request budget and tolerates
//! partial failure: a branch whose listing keeps failing is left incomplete
//! and reported, the rest of the traversal carries on.
//!
//! ## Quick Start
//!
//! ```no_run
//! use share_tree_exporter::descriptor::RootDescriptor;
//! use share_tree_exporter::fetcher::share_http::ShareListingClient;
//! use share_tree_exporter::traversal::{TraversalConfig, TreeBuilder};
//! use share_tree_exporter::TraversalMode;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let root = RootDescriptor::new("1234", "5678", "42", "9001", "Course material");
//! let client = Arc::new(ShareListingClient::new("https://pan.baidu.com")?);
//!
//! let builder = TreeBuilder::new(client, TraversalConfig::default());
//! let outcome = builder.traverse(&root, 2, TraversalMode::ContainersOnly).await?;
//!
//! println!("{} entries", outcome.root.count() - 1);
//! if outcome.is_partial() {
//!     println!("{} directories could not be listed", outcome.abandoned.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`traversal`] - request pool, progress counters and the recursive tree builder
//! - [`fetcher`] - listing client, retrying page fetcher and pagination driver
//! - [`descriptor`] - the root entry the traversal starts from
//! - [`output`] - TXT / CSV / JSON reports of a finished traversal
//! - [`shutdown`] - cooperative cancellation
//! - [`metrics`] - request and pool metrics
//!
//! ## Completeness
//!
//! The tree returned by a traversal is a best-effort snapshot. Listings that
//! exhaust their retries are abandoned rather than failing the whole run, so
//! the tree can be an under-approximation of the remote hierarchy. Always
//! check [`traversal::TraversalOutcome::is_partial`] before treating a tree as
//! complete.

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// CLI command implementations
pub mod cli;

/// Root entry descriptor
pub mod descriptor;

/// Listing fetchers
pub mod fetcher;

/// Observability metrics
pub mod metrics;

/// Report writers
pub mod output;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

/// Traversal orchestration
pub mod traversal;

pub use descriptor::RootDescriptor;
pub use traversal::{TraversalConfig, TraversalOutcome, TreeBuilder};

/// Which records a traversal keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraversalMode {
    /// Keep containers only (directory listing export)
    #[serde(rename = "dirs")]
    ContainersOnly,
    /// Keep every record (full export)
    #[serde(rename = "all")]
    All,
}

impl TraversalMode {
    /// Whether a record survives this mode's filter.
    pub fn keeps(&self, record: &Record) -> bool {
        match self {
            TraversalMode::ContainersOnly => record.is_container,
            TraversalMode::All => true,
        }
    }
}

impl std::fmt::Display for TraversalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TraversalMode::ContainersOnly => "dirs",
            TraversalMode::All => "all",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TraversalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dirs" | "directories" | "containers" => Ok(TraversalMode::ContainersOnly),
            "all" | "full" => Ok(TraversalMode::All),
            _ => Err(format!("Invalid traversal mode: {s}. Valid options: dirs, all")),
        }
    }
}

/// One entry returned by the listing endpoint for a node and page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque identifier used to list this entry's children
    pub external_id: String,
    /// Display name as sent by the server (unsanitized)
    pub display_name: String,
    /// Whether this entry may have children
    pub is_container: bool,
    /// Size in bytes (zero for containers)
    pub size_bytes: u64,
    /// Server-side path, if reported
    pub path: Option<String>,
}

/// How far a node's children were listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    /// Never listed: a leaf, or a container beyond the depth limit
    #[default]
    Unlisted,
    /// Every page was retrieved and every record kept
    Complete,
    /// Every page was retrieved but leaves were filtered out
    Filtered,
    /// A page was abandoned or the traversal was cancelled mid-listing
    Incomplete,
}

/// One entry of the materialized tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Display name, stripped of zero-width and bidi-control characters
    pub name: String,
    /// Opaque identifier used to list this node's children
    pub external_id: String,
    /// Whether this node may have children
    pub is_container: bool,
    /// Size in bytes, only defined for leaves
    pub size_bytes: Option<u64>,
    /// Distance from the traversal root (root = 0)
    pub depth: u32,
    /// Server-side path, if reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// How far this node's children were listed
    pub listing: ListingStatus,
    /// Children in discovery order
    pub children: Vec<Node>,
}

impl Node {
    /// Synthetic root container for a traversal.
    pub fn root(descriptor: &RootDescriptor) -> Self {
        Self {
            name: sanitize_name(&descriptor.display_name),
            external_id: descriptor.external_id.clone(),
            is_container: true,
            size_bytes: None,
            depth: 0,
            path: None,
            listing: ListingStatus::Unlisted,
            children: Vec::new(),
        }
    }

    /// Child node built from a listing record.
    pub fn from_record(record: Record, depth: u32) -> Self {
        let size_bytes = if record.is_container {
            None
        } else {
            Some(record.size_bytes)
        };

        Self {
            name: sanitize_name(&record.display_name),
            external_id: record.external_id,
            is_container: record.is_container,
            size_bytes,
            depth,
            path: record.path,
            listing: ListingStatus::Unlisted,
            children: Vec::new(),
        }
    }

    /// Total size of this subtree, when it is fully known.
    ///
    /// Leaves report their own size. A container only reports a size when it
    /// was listed completely and every child's size is known; filtered,
    /// depth-limited and incomplete containers report `None`.
    pub fn aggregate_size(&self) -> Option<u64> {
        if !self.is_container {
            return self.size_bytes;
        }

        if self.listing != ListingStatus::Complete {
            return None;
        }

        self.children
            .iter()
            .try_fold(0u64, |total, child| {
                child.aggregate_size().map(|size| total.saturating_add(size))
            })
    }

    /// Sort children recursively: containers first, then by name.
    pub fn sort_for_presentation(&mut self) {
        self.children.sort_by(|a, b| match (a.is_container, b.is_container) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        });

        for child in &mut self.children {
            child.sort_for_presentation();
        }
    }

    /// Deepest `depth` value in this subtree.
    pub fn max_depth(&self) -> u32 {
        self.children
            .iter()
            .map(Node::max_depth)
            .max()
            .unwrap_or(self.depth)
            .max(self.depth)
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }
}

/// Strip zero-width, byte-order-mark and bidi-control characters from a name.
///
/// Share listings regularly contain names padded with these characters; they
/// render as nothing but break alignment and string comparison downstream.
pub fn sanitize_name(name: &str) -> String {
    name.chars().filter(|c| !is_invisible_control(*c)).collect()
}

fn is_invisible_control(c: char) -> bool {
    matches!(
        c,
        '\u{200b}'..='\u{200f}' | '\u{202a}'..='\u{202e}' | '\u{2066}'..='\u{2069}' | '\u{feff}'
    )
}
