//! Listing envelope decoding against captured response shapes

use share_tree_exporter::fetcher::share_parser::ShareParser;
use share_tree_exporter::fetcher::FetcherError;
use share_tree_exporter::Node;

const CAPTURED_PAGE: &str = r#"{
    "errno": 0,
    "request_id": 8412367712,
    "has_more": 1,
    "records": [
        {
            "fs_id": 584712233908761,
            "server_filename": "\u200b01 Introduction",
            "isdir": 1,
            "size": 0,
            "path": "/Course/\u200b01 Introduction",
            "category": 6
        },
        {
            "fs_id": "30985521004417",
            "server_filename": "lecture-notes.pdf",
            "isdir": "0",
            "size": "1048576",
            "md5": "6f1ed002ab5595859014ebf0951522d9"
        }
    ]
}"#;

#[test]
fn test_captured_page() {
    let page = ShareParser::parse_body(CAPTURED_PAGE).unwrap();

    assert!(page.has_more);
    assert_eq!(page.records.len(), 2);

    let folder = &page.records[0];
    assert_eq!(folder.external_id, "584712233908761");
    assert!(folder.is_container);
    assert_eq!(folder.size_bytes, 0);
    assert_eq!(folder.path.as_deref(), Some("/Course/\u{200b}01 Introduction"));

    let pdf = &page.records[1];
    assert_eq!(pdf.external_id, "30985521004417");
    assert!(!pdf.is_container);
    assert_eq!(pdf.size_bytes, 1_048_576);
    assert_eq!(pdf.path, None);
}

#[test]
fn test_invisible_characters_removed_from_node_names() {
    let page = ShareParser::parse_body(CAPTURED_PAGE).unwrap();
    let node = Node::from_record(page.records[0].clone(), 1);

    // the raw record keeps the server's name; the tree shows the clean one
    assert_eq!(page.records[0].display_name, "\u{200b}01 Introduction");
    assert_eq!(node.name, "01 Introduction");
    assert_eq!(node.size_bytes, None);
}

#[test]
fn test_last_page_without_records() {
    let page = ShareParser::parse_body(r#"{"errno": 0, "has_more": 0, "records": []}"#).unwrap();
    assert!(!page.has_more);
    assert!(page.records.is_empty());
}

#[test]
fn test_access_denied_envelope() {
    let err = ShareParser::parse_body(r#"{"errno": -6, "request_id": 1}"#).unwrap_err();
    assert_eq!(err, FetcherError::ProtocolError { errno: -6 });
}

#[test]
fn test_html_error_page() {
    let err = ShareParser::parse_body("<html><body>502 Bad Gateway</body></html>").unwrap_err();
    assert!(matches!(err, FetcherError::ParseError(_)));
}
