//! Text tree report
//!
//! ```text
//! Directory listing
//! Exported: 2026-10-19 14:03:11
//! Root: Course
//! ==================================================
//!
//! Course
//! ├──Week 1
//! └──Week 2
//!
//! ==================================================
//! Statistics:
//! Directories: 2
//! Fetch time: 12.34 s
//! ```

use chrono::{DateTime, Local};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use super::{ensure_parent_dir, format_size, OutputError, OutputResult, ReportWriter, TreeStats};
use crate::traversal::TraversalOutcome;
use crate::{Node, TraversalMode};

const RULE_WIDTH: usize = 50;
const TEE: &str = "├──";
const LAST: &str = "└──";
const BRANCH: &str = "│   ";
const SPACE: &str = "    ";

/// Writes the indented tree report
pub struct TxtReportWriter<W: Write> {
    writer: W,
    exported_at: DateTime<Local>,
}

impl TxtReportWriter<BufWriter<File>> {
    /// Create a writer for `path`, creating parent directories
    pub fn create<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating TXT report: path={}", path.display());
        ensure_parent_dir(path)?;

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {e}")))?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }
}

impl<W: Write> TxtReportWriter<W> {
    /// Wrap any writer
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer,
            exported_at: Local::now(),
        }
    }

    /// Override the export timestamp shown in the header
    pub fn with_exported_at(mut self, exported_at: DateTime<Local>) -> Self {
        self.exported_at = exported_at;
        self
    }

    /// Unwrap the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn render(&self, outcome: &TraversalOutcome) -> String {
        let full = outcome.mode == TraversalMode::All;
        let mut out = String::new();

        out.push_str(if full {
            "Full listing\n"
        } else {
            "Directory listing\n"
        });
        out.push_str(&format!(
            "Exported: {}\n",
            self.exported_at.format("%Y-%m-%d %H:%M:%S")
        ));
        out.push_str(&format!("Root: {}\n", outcome.root.name));
        out.push_str(&"=".repeat(RULE_WIDTH));
        out.push_str("\n\n");

        out.push_str(&outcome.root.name);
        if full {
            out.push('/');
        }
        out.push('\n');
        render_children(&outcome.root, "", full, &mut out);

        let stats = TreeStats::collect(&outcome.root);
        out.push('\n');
        out.push_str(&"=".repeat(RULE_WIDTH));
        out.push_str("\nStatistics:\n");
        out.push_str(&format!("Directories: {}\n", stats.containers));
        if full {
            out.push_str(&format!("Files: {}\n", stats.leaves));
            out.push_str(&format!(
                "Total size: {}\n",
                format_size(stats.total_leaf_bytes)
            ));
            out.push_str(&format!("Total items: {}\n", stats.total_items()));
        }
        out.push_str(&format!(
            "Fetch time: {:.2} s\n",
            outcome.elapsed.as_secs_f64()
        ));

        if outcome.is_partial() {
            out.push_str("\nIncomplete listing:\n");
            if outcome.cancelled {
                out.push_str("  - traversal was cancelled before completion\n");
            }
            for node in &outcome.abandoned {
                out.push_str(&format!(
                    "  - {} (depth {}): {}\n",
                    node.name, node.depth, node.reason
                ));
            }
        }

        out
    }
}

fn render_children(node: &Node, prefix: &str, full: bool, out: &mut String) {
    let count = node.children.len();
    for (index, child) in node.children.iter().enumerate() {
        let is_last = index + 1 == count;
        out.push_str(prefix);
        out.push_str(if is_last { LAST } else { TEE });
        out.push_str(&child.name);
        if full {
            if child.is_container {
                out.push('/');
            } else {
                out.push_str(&format!(" ({})", format_size(child.size_bytes.unwrap_or(0))));
            }
        }
        out.push('\n');

        let next_prefix = format!("{prefix}{}", if is_last { SPACE } else { BRANCH });
        render_children(child, &next_prefix, full, out);
    }
}

impl<W: Write> ReportWriter for TxtReportWriter<W> {
    fn write_outcome(&mut self, outcome: &TraversalOutcome) -> OutputResult<()> {
        let report = self.render(outcome);
        self.writer
            .write_all(report.as_bytes())
            .map_err(|e| OutputError::IoError(format!("Failed to write report: {e}")))
    }

    fn close(mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(e.to_string()))
    }
}
