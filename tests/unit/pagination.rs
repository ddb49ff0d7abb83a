//! Multi-page listings through the pagination driver

use crate::support::mock_listing::{dir, file, files, root, MockListing};
use share_tree_exporter::fetcher::pagination::{ListingGap, PaginationDriver};
use share_tree_exporter::fetcher::retry::RetryingPageFetcher;
use share_tree_exporter::fetcher::{FetcherError, ListingClient};
use share_tree_exporter::traversal::RequestPool;
use share_tree_exporter::TraversalMode;
use std::sync::Arc;
use std::time::Duration;

fn driver(mock: &Arc<MockListing>, settle_ms: u64, mode: TraversalMode) -> PaginationDriver {
    let client: Arc<dyn ListingClient> = mock.clone();
    let pool = Arc::new(RequestPool::new(2, Duration::ZERO));
    let fetcher = RetryingPageFetcher::new(client, pool, 3);
    PaginationDriver::new(fetcher, 100, Duration::from_millis(settle_ms), mode)
}

#[tokio::test(start_paused = true)]
async fn test_three_pages_concatenated_in_order() {
    let pages = vec![files("p1", 100), files("p2", 100), files("p3", 40)];
    let expected: Vec<String> = pages
        .iter()
        .flatten()
        .map(|r| r.external_id.clone())
        .collect();
    let mock = Arc::new(MockListing::new().with_pages("node", pages));
    let driver = driver(&mock, 2000, TraversalMode::All);

    let listing = driver.list_children(&root(), "node", "Node").await;

    assert!(listing.is_complete());
    assert_eq!(listing.pages_fetched, 3);
    assert_eq!(listing.records.len(), 240);
    let ids: Vec<String> = listing.records.iter().map(|r| r.external_id.clone()).collect();
    assert_eq!(ids, expected);

    let calls = mock.calls_for("node");
    let pages: Vec<u32> = calls.iter().map(|c| c.page).collect();
    assert_eq!(pages, vec![1, 2, 3]);
    for pair in calls.windows(2) {
        assert!(pair[1].at.duration_since(pair[0].at) >= Duration::from_millis(2000));
    }
}

#[tokio::test(start_paused = true)]
async fn test_single_page_has_no_settle_delay() {
    let mock = Arc::new(MockListing::new().with_children("node", files("a", 7)));
    let driver = driver(&mock, 2000, TraversalMode::All);

    let start = tokio::time::Instant::now();
    let listing = driver.list_children(&root(), "node", "Node").await;

    assert_eq!(listing.records.len(), 7);
    assert_eq!(tokio::time::Instant::now(), start);
}

#[tokio::test(start_paused = true)]
async fn test_later_page_abandoned_keeps_earlier_pages() {
    let mock = Arc::new(
        MockListing::new()
            .with_pages("node", vec![files("p1", 100), files("p2", 100)])
            .failing("node", 2, 10, FetcherError::HttpStatus { status: 503 }),
    );
    let driver = driver(&mock, 0, TraversalMode::All);

    let listing = driver.list_children(&root(), "node", "Node").await;

    assert!(!listing.is_complete());
    assert_eq!(listing.pages_fetched, 1);
    assert_eq!(listing.records.len(), 100);
    assert_eq!(
        listing.gap,
        Some(ListingGap::PageAbandoned {
            page: 2,
            attempts: 3,
            error: FetcherError::HttpStatus { status: 503 }
        })
    );
    assert_eq!(mock.calls_for("node").len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_empty_page_ends_listing() {
    let mock = Arc::new(
        MockListing::new().with_pages("node", vec![files("p1", 3), Vec::new(), files("p3", 3)]),
    );
    let driver = driver(&mock, 0, TraversalMode::All);

    let listing = driver.list_children(&root(), "node", "Node").await;

    assert!(listing.is_complete());
    assert_eq!(listing.records.len(), 3);
    assert_eq!(mock.calls_for("node").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_containers_only_filters_after_collection() {
    let mock = Arc::new(MockListing::new().with_children(
        "node",
        vec![
            dir("d1", "Week 1"),
            file("f1", "syllabus.pdf", 2048),
            dir("d2", "Week 2"),
        ],
    ));
    let driver = driver(&mock, 0, TraversalMode::ContainersOnly);

    let listing = driver.list_children(&root(), "node", "Node").await;

    assert_eq!(listing.filtered_out, 1);
    let names: Vec<&str> = listing.records.iter().map(|r| r.display_name.as_str()).collect();
    assert_eq!(names, vec!["Week 1", "Week 2"]);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_node_lists_nothing() {
    let mock = Arc::new(MockListing::new());
    let driver = driver(&mock, 0, TraversalMode::All);

    let listing = driver.list_children(&root(), "missing", "Missing").await;

    assert!(listing.is_complete());
    assert!(listing.records.is_empty());
    assert_eq!(listing.pages_fetched, 1);
}
