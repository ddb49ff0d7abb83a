//! JSON report writer

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use super::{ensure_parent_dir, OutputError, OutputResult, ReportWriter, TreeStats};
use crate::traversal::{AbandonedNode, ProgressSnapshot, TraversalOutcome};
use crate::{Node, TraversalMode};

#[derive(Serialize)]
struct JsonReport<'a> {
    exported_at: String,
    mode: TraversalMode,
    max_depth: u32,
    partial: bool,
    cancelled: bool,
    elapsed_ms: u64,
    progress: ProgressSnapshot,
    stats: TreeStats,
    abandoned: &'a [AbandonedNode],
    root: &'a Node,
}

/// Serializes the whole outcome as a pretty-printed document
pub struct JsonReportWriter<W: Write> {
    writer: W,
}

impl JsonReportWriter<BufWriter<File>> {
    /// Create a writer for `path`, creating parent directories
    pub fn create<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating JSON report: path={}", path.display());
        ensure_parent_dir(path)?;

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {e}")))?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }
}

impl<W: Write> JsonReportWriter<W> {
    /// Wrap any writer
    pub fn from_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Unwrap the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportWriter for JsonReportWriter<W> {
    fn write_outcome(&mut self, outcome: &TraversalOutcome) -> OutputResult<()> {
        let report = JsonReport {
            exported_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            mode: outcome.mode,
            max_depth: outcome.max_depth,
            partial: outcome.is_partial(),
            cancelled: outcome.cancelled,
            elapsed_ms: outcome.elapsed.as_millis() as u64,
            progress: outcome.progress,
            stats: TreeStats::collect(&outcome.root),
            abandoned: &outcome.abandoned,
            root: &outcome.root,
        };

        serde_json::to_writer_pretty(&mut self.writer, &report)
            .map_err(|e| OutputError::SerializationError(e.to_string()))?;
        self.writer
            .write_all(b"\n")
            .map_err(|e| OutputError::IoError(e.to_string()))
    }

    fn close(mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(e.to_string()))
    }
}
