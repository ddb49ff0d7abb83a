//! CSV report writer

use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use super::{ensure_parent_dir, format_size, OutputError, OutputResult, ReportWriter};
use crate::traversal::TraversalOutcome;
use crate::Node;

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// CSV row for one entry
#[derive(Debug, Serialize)]
struct EntryRecord<'a> {
    depth: u32,
    path: &'a str,
    name: &'a str,
    kind: &'static str,
    size_bytes: Option<u64>,
    size: Option<String>,
}

/// One row per non-root entry, in tree order
pub struct CsvReportWriter<W: Write> {
    writer: Writer<W>,
    rows_written: u64,
}

impl CsvReportWriter<BufWriter<File>> {
    /// Create a writer for `path`, creating parent directories
    pub fn create<P: AsRef<Path>>(path: P) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating CSV writer: path={}", path.display());
        ensure_parent_dir(path)?;

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {e}")))?;
        Ok(Self::from_writer(BufWriter::with_capacity(
            DEFAULT_BUFFER_SIZE,
            file,
        )))
    }
}

impl<W: Write> CsvReportWriter<W> {
    /// Wrap any writer
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: Writer::from_writer(writer),
            rows_written: 0,
        }
    }

    /// Rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush and unwrap the inner writer
    pub fn into_inner(self) -> OutputResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| OutputError::FlushError(e.to_string()))
    }

    fn write_children(&mut self, node: &Node, parent_path: &str) -> OutputResult<()> {
        for child in &node.children {
            let path = if parent_path.is_empty() {
                child.name.clone()
            } else {
                format!("{parent_path}/{}", child.name)
            };

            let record = EntryRecord {
                depth: child.depth,
                path: &path,
                name: &child.name,
                kind: if child.is_container { "dir" } else { "file" },
                size_bytes: child.size_bytes,
                size: child.size_bytes.map(format_size),
            };

            self.writer
                .serialize(&record)
                .map_err(|e| OutputError::CsvError(format!("Failed to write entry: {e}")))?;
            self.rows_written += 1;

            self.write_children(child, &path)?;
        }
        Ok(())
    }
}

impl<W: Write> ReportWriter for CsvReportWriter<W> {
    fn write_outcome(&mut self, outcome: &TraversalOutcome) -> OutputResult<()> {
        if outcome.root.children.is_empty() {
            // serialize() only emits headers alongside the first row
            self.writer
                .write_record(["depth", "path", "name", "kind", "size_bytes", "size"])
                .map_err(|e| OutputError::CsvError(e.to_string()))?;
        }
        self.write_children(&outcome.root, "")?;
        debug!(rows = self.rows_written, "CSV report written");
        Ok(())
    }

    fn close(mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(e.to_string()))
    }
}
