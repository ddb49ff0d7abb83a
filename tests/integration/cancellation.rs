//! Cooperative cancellation of running traversals

use crate::support::mock_listing::{dir, files, root, MockListing};
use share_tree_exporter::fetcher::ListingClient;
use share_tree_exporter::shutdown::ShutdownCoordinator;
use share_tree_exporter::{ListingStatus, TraversalConfig, TraversalMode, TreeBuilder};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn wide_share(width: usize) -> MockListing {
    let dirs: Vec<_> = (0..width)
        .map(|i| dir(&format!("d{i}"), &format!("dir {i}")))
        .collect();
    let mut mock = MockListing::new().with_children("root", dirs);
    for i in 0..width {
        mock = mock.with_children(&format!("d{i}"), files(&format!("f{i}"), 2));
    }
    mock
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_start_makes_no_requests() {
    let mock = Arc::new(wide_share(3));
    let client: Arc<dyn ListingClient> = mock.clone();
    let shutdown = ShutdownCoordinator::shared();
    shutdown.request_shutdown();
    let builder = TreeBuilder::new(client, TraversalConfig::default()).with_shutdown(shutdown);

    let outcome = builder
        .traverse(&root(), 3, TraversalMode::All)
        .await
        .unwrap();

    assert!(outcome.cancelled);
    assert!(outcome.is_partial());
    assert!(outcome.root.children.is_empty());
    assert_eq!(outcome.root.listing, ListingStatus::Incomplete);
    assert!(mock.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_traversal_stops_new_listings() {
    let mock = Arc::new(wide_share(8));
    let client: Arc<dyn ListingClient> = mock.clone();
    let shutdown = ShutdownCoordinator::shared();
    let builder = TreeBuilder::new(client, TraversalConfig::default().with_max_concurrent(1))
        .with_shutdown(shutdown.clone());

    let handle = tokio::spawn(async move { builder.traverse(&root(), 2, TraversalMode::All).await });

    // root at 0 s, first children at 3 s and 6 s
    tokio::time::sleep(Duration::from_millis(7000)).await;
    shutdown.request_shutdown();
    let cancelled_at = Instant::now();

    let outcome = handle.await.unwrap().unwrap();

    assert!(outcome.cancelled);
    assert_eq!(outcome.root.children.len(), 8);
    assert!(mock.calls().iter().all(|c| c.at <= cancelled_at));
    assert!(mock.calls().len() < 9);

    // branches that never got a listing are marked, not dropped
    let incomplete = outcome
        .root
        .children
        .iter()
        .filter(|c| c.listing == ListingStatus::Incomplete)
        .count();
    assert!(incomplete > 0);
    assert!(outcome.abandoned.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_backoff_returns_promptly() {
    let mock = Arc::new(MockListing::new().always_failing("root"));
    let client: Arc<dyn ListingClient> = mock.clone();
    let shutdown = ShutdownCoordinator::shared();
    let builder = TreeBuilder::new(client, TraversalConfig::default())
        .with_shutdown(shutdown.clone());

    let started = Instant::now();
    let handle = tokio::spawn(async move { builder.traverse(&root(), 1, TraversalMode::All).await });

    // first failure at 0 s, backoff until 2 s
    tokio::time::sleep(Duration::from_millis(500)).await;
    shutdown.request_shutdown();

    let outcome = handle.await.unwrap().unwrap();

    assert!(outcome.cancelled);
    assert_eq!(mock.calls().len(), 1);
    assert!(started.elapsed() < Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_unwinds_queued_branches_promptly() {
    let mock = Arc::new(wide_share(20));
    let client: Arc<dyn ListingClient> = mock.clone();
    let shutdown = ShutdownCoordinator::shared();
    let builder =
        TreeBuilder::new(client, TraversalConfig::default()).with_shutdown(shutdown.clone());

    let handle = tokio::spawn(async move { builder.traverse(&root(), 2, TraversalMode::All).await });

    // root at 0 s, first child at 3 s; eighteen branches still queued
    tokio::time::sleep(Duration::from_millis(4000)).await;
    shutdown.request_shutdown();
    let cancelled_at = Instant::now();

    let outcome = handle.await.unwrap().unwrap();

    assert!(outcome.cancelled);
    assert!(cancelled_at.elapsed() < Duration::from_millis(3000));
    assert!(mock.calls().iter().all(|c| c.at <= cancelled_at));
    assert_eq!(outcome.root.children.len(), 20);
}

#[tokio::test(start_paused = true)]
async fn test_closed_pool_marks_outcome_partial() {
    let mock = Arc::new(wide_share(3));
    let client: Arc<dyn ListingClient> = mock.clone();
    let builder = TreeBuilder::new(client, TraversalConfig::default());
    builder.pool().close();

    let outcome = builder
        .traverse(&root(), 2, TraversalMode::All)
        .await
        .unwrap();

    assert!(mock.calls().is_empty());
    assert_eq!(outcome.root.listing, ListingStatus::Incomplete);
    assert!(outcome.cancelled);
    assert!(outcome.is_partial());
}
