//! Command-line parsing and the offline validate command

use assert_cmd::Command;
use clap::Parser;
use share_tree_exporter::cli::{Cli, Commands};
use share_tree_exporter::TraversalMode;
use std::io::Write;
use tempfile::NamedTempFile;

fn descriptor_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn test_export_arguments() {
    let cli = Cli::try_parse_from([
        "share-tree-exporter",
        "--max-concurrent",
        "4",
        "export",
        "--fs-id",
        "11",
        "--msg-id",
        "22",
        "--uk",
        "33",
        "--gid",
        "44",
        "--name",
        "Course",
        "--depth",
        "3",
        "--mode",
        "all",
    ])
    .unwrap();

    assert_eq!(cli.max_concurrent, 4);
    let Commands::Export(args) = &cli.command else {
        panic!("expected export");
    };
    assert_eq!(args.depth, Some(3));
    assert_eq!(args.mode, TraversalMode::All);

    let root = args.resolve_root().unwrap();
    assert_eq!(root.external_id, "11");
    assert_eq!(root.display_name, "Course");

    let config = cli.traversal_config();
    assert_eq!(config.max_concurrent, 4);
    assert!(config.validate().is_ok());
}

#[test]
fn test_export_requires_a_root() {
    let cli = Cli::try_parse_from(["share-tree-exporter", "export", "--fs-id", "11"]).unwrap();
    let Commands::Export(args) = &cli.command else {
        panic!("expected export");
    };
    assert!(args.resolve_root().is_err());
}

#[test]
fn test_out_of_range_arguments_rejected() {
    assert!(Cli::try_parse_from(["share-tree-exporter", "--max-concurrent", "0", "validate", "config"]).is_err());
    assert!(Cli::try_parse_from(["share-tree-exporter", "--max-concurrent", "17", "validate", "config"]).is_err());
    assert!(Cli::try_parse_from(["share-tree-exporter", "--max-retries", "0", "validate", "config"]).is_err());
    assert!(Cli::try_parse_from(["share-tree-exporter", "export", "--depth", "0"]).is_err());
}

#[tokio::test]
async fn test_validate_descriptor_in_process() {
    let file = descriptor_file(r#"{"fs_id": 11, "msg_id": 22, "uk": 33, "gid": 44, "server_filename": "Course"}"#);
    let path = file.path().to_string_lossy().to_string();
    let cli = Cli::try_parse_from(["share-tree-exporter", "validate", "descriptor", &path]).unwrap();

    let Commands::Validate(cmd) = &cli.command else {
        panic!("expected validate");
    };
    assert!(cmd.execute(&cli).await.is_ok());
}

#[test]
fn test_validate_descriptor_binary() {
    let file = descriptor_file(r#"{"externalId": "11", "parentCollectionId": "22", "ownerId": "33", "conversationId": "44", "displayName": "Course"}"#);

    let output = Command::cargo_bin("share-tree-exporter")
        .unwrap()
        .args(["validate", "descriptor"])
        .arg(file.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Valid descriptor"));
    assert!(stdout.contains("Name: Course"));
}

#[test]
fn test_validate_incomplete_descriptor_fails() {
    let file = descriptor_file(r#"{"fs_id": 11, "msg_id": 22}"#);

    let output = Command::cargo_bin("share-tree-exporter")
        .unwrap()
        .args(["validate", "descriptor"])
        .arg(file.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_validate_config_binary() {
    let output = Command::cargo_bin("share-tree-exporter")
        .unwrap()
        .args(["--page-size", "250", "validate", "config"])
        .env_remove("SHARE_TREE_COOKIE")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Page size: 250"));
    assert!(stdout.contains("Session cookie: not set"));
}
