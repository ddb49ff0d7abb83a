//! Default report file names
//!
//! `<root name>.<ext>` for directory listings and `<root name>_full.<ext>`
//! for full listings, with characters that are unsafe in file names
//! replaced by `_`.

use std::path::PathBuf;

use super::OutputFormat;
use crate::TraversalMode;

/// Name used when nothing printable is left of the root name
const FALLBACK_STEM: &str = "share";

/// Report path in the current directory for a root name
pub fn default_output_path(root_name: &str, mode: TraversalMode, format: OutputFormat) -> PathBuf {
    let mut stem = sanitize_file_stem(root_name);
    if mode == TraversalMode::All {
        stem.push_str("_full");
    }
    PathBuf::from(format!("{stem}.{}", format.extension()))
}

/// Replace path separators, reserved and control characters
pub fn sanitize_file_stem(name: &str) -> String {
    let replaced: String = crate::sanitize_name(name)
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim().trim_matches('.');
    if trimmed.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        trimmed.to_string()
    }
}
