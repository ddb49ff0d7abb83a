use share_tree_exporter::output::path::{default_output_path, sanitize_file_stem};
use share_tree_exporter::output::OutputFormat;
use share_tree_exporter::TraversalMode;
use std::path::PathBuf;

#[test]
fn test_directory_listing_file_name() {
    let path = default_output_path("Course", TraversalMode::ContainersOnly, OutputFormat::Txt);
    assert_eq!(path, PathBuf::from("Course.txt"));
}

#[test]
fn test_full_listing_file_name() {
    let path = default_output_path("Course", TraversalMode::All, OutputFormat::Csv);
    assert_eq!(path, PathBuf::from("Course_full.csv"));
}

#[test]
fn test_unsafe_characters_replaced() {
    assert_eq!(sanitize_file_stem("2024/25: Maths?"), "2024_25_ Maths_");
    let path = default_output_path("a\\b|c", TraversalMode::ContainersOnly, OutputFormat::Json);
    assert_eq!(path, PathBuf::from("a_b_c.json"));
}

#[test]
fn test_empty_name_falls_back() {
    assert_eq!(sanitize_file_stem("\u{200b}\u{feff}"), "share");
}
