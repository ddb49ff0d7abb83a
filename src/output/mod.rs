//! Report writers for finished traversals
//!
//! - [`txt`] - box-drawing tree with a statistics footer
//! - [`csv`] - one row per entry
//! - [`json`] - the full outcome, machine readable
//! - [`path`] - default report file names

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::traversal::TraversalOutcome;
use crate::Node;

pub mod csv;
pub mod json;
pub mod path;
pub mod txt;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Writes one traversal outcome as a report
pub trait ReportWriter {
    /// Write the whole report
    fn write_outcome(&mut self, outcome: &TraversalOutcome) -> OutputResult<()>;

    /// Flush buffered data and finalize output
    fn close(self) -> OutputResult<()>;
}

/// Report file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Indented text tree
    Txt,
    /// Spreadsheet rows
    Csv,
    /// Structured document
    Json,
}

impl OutputFormat {
    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Txt => "txt",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "txt" | "text" => Ok(OutputFormat::Txt),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!(
                "Invalid output format: {s}. Valid options: txt, csv, json"
            )),
        }
    }
}

/// Write `outcome` to `path` in `format`, creating parent directories.
pub fn write_report<P: AsRef<Path>>(
    outcome: &TraversalOutcome,
    format: OutputFormat,
    path: P,
) -> OutputResult<()> {
    match format {
        OutputFormat::Txt => {
            let mut writer = txt::TxtReportWriter::create(path)?;
            writer.write_outcome(outcome)?;
            writer.close()
        }
        OutputFormat::Csv => {
            let mut writer = csv::CsvReportWriter::create(path)?;
            writer.write_outcome(outcome)?;
            writer.close()
        }
        OutputFormat::Json => {
            let mut writer = json::JsonReportWriter::create(path)?;
            writer.write_outcome(outcome)?;
            writer.close()
        }
    }
}

/// Create `path`'s parent directory if needed
pub(crate) fn ensure_parent_dir(path: &Path) -> OutputResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {e}")))?;
        }
    }
    Ok(())
}

/// Human-readable size in binary units ("0 B", "1.5 KB", "2 GB").
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

/// Entry counts of a tree, root excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TreeStats {
    /// Container entries
    pub containers: u64,
    /// Leaf entries
    pub leaves: u64,
    /// Sum of leaf sizes
    pub total_leaf_bytes: u64,
}

impl TreeStats {
    /// Count every descendant of `root`
    pub fn collect(root: &Node) -> Self {
        let mut stats = Self::default();
        stats.visit_children(root);
        stats
    }

    /// Containers plus leaves
    pub fn total_items(&self) -> u64 {
        self.containers + self.leaves
    }

    fn visit_children(&mut self, node: &Node) {
        for child in &node.children {
            if child.is_container {
                self.containers += 1;
            } else {
                self.leaves += 1;
                self.total_leaf_bytes = self
                    .total_leaf_bytes
                    .saturating_add(child.size_bytes.unwrap_or(0));
            }
            self.visit_children(child);
        }
    }
}
