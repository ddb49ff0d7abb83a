//! End-to-end traversals against a scripted share

use crate::support::mock_listing::{dir, file, files, root, MockListing};
use share_tree_exporter::fetcher::ListingClient;
use share_tree_exporter::traversal::TraversalError;
use share_tree_exporter::{ListingStatus, TraversalConfig, TraversalMode, TreeBuilder};
use std::sync::Arc;
use std::time::Duration;

fn builder(mock: &Arc<MockListing>, config: TraversalConfig) -> TreeBuilder {
    let client: Arc<dyn ListingClient> = mock.clone();
    TreeBuilder::new(client, config)
}

fn fast_config() -> TraversalConfig {
    TraversalConfig::default()
        .with_min_interval(Duration::ZERO)
        .with_page_settle_delay(Duration::ZERO)
}

/// root -> {A -> a.txt, B -> b.txt, notes.txt}
fn two_weeks() -> MockListing {
    MockListing::new()
        .with_children(
            "root",
            vec![dir("A", "A"), dir("B", "B"), file("n", "notes.txt", 10)],
        )
        .with_children("A", vec![file("a", "a.txt", 1)])
        .with_children("B", vec![file("b", "b.txt", 2)])
}

#[tokio::test(start_paused = true)]
async fn test_directories_two_levels() {
    let mock = Arc::new(two_weeks());
    let builder = builder(&mock, fast_config());

    let outcome = builder
        .traverse(&root(), 2, TraversalMode::ContainersOnly)
        .await
        .unwrap();

    let names: Vec<&str> = outcome.root.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);
    for child in &outcome.root.children {
        assert_eq!(child.depth, 1);
        assert!(child.children.is_empty());
        assert_eq!(child.listing, ListingStatus::Filtered);
    }
    assert_eq!(outcome.root.listing, ListingStatus::Filtered);

    assert_eq!(outcome.progress.discovered, 2);
    assert_eq!(outcome.progress.processed, 2);
    assert!(!outcome.is_partial());
    assert_eq!(mock.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_full_listing_attaches_leaves() {
    let mock = Arc::new(two_weeks());
    let builder = builder(&mock, fast_config());

    let outcome = builder
        .traverse(&root(), 2, TraversalMode::All)
        .await
        .unwrap();

    assert_eq!(outcome.root.count(), 6);
    assert_eq!(outcome.root.listing, ListingStatus::Complete);
    assert_eq!(outcome.root.aggregate_size(), Some(13));
    assert_eq!(outcome.progress.discovered, 5);
    assert_eq!(outcome.progress.processed, 5);
}

#[tokio::test(start_paused = true)]
async fn test_depth_one_lists_root_only() {
    let mock = Arc::new(two_weeks());
    let builder = builder(&mock, fast_config());

    let outcome = builder
        .traverse(&root(), 1, TraversalMode::All)
        .await
        .unwrap();

    assert_eq!(outcome.root.children.len(), 3);
    assert!(outcome.root.children.iter().all(|c| c.children.is_empty()));
    assert!(outcome
        .root
        .children
        .iter()
        .all(|c| c.listing == ListingStatus::Unlisted));
    assert_eq!(mock.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_depth_bound_never_exceeded() {
    let mock = Arc::new(
        MockListing::new()
            .with_children("root", vec![dir("d1", "level 1")])
            .with_children("d1", vec![dir("d2", "level 2")])
            .with_children("d2", vec![dir("d3", "level 3")])
            .with_children("d3", vec![dir("d4", "level 4")]),
    );
    let builder = builder(&mock, fast_config());

    let outcome = builder
        .traverse(&root(), 2, TraversalMode::All)
        .await
        .unwrap();

    assert_eq!(outcome.root.max_depth(), 2);
    assert!(mock.calls_for("d2").is_empty());
    let level2 = &outcome.root.children[0].children[0];
    assert_eq!(level2.name, "level 2");
    assert!(level2.children.is_empty());
    assert_eq!(level2.listing, ListingStatus::Unlisted);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_runs_build_same_tree() {
    let mock = Arc::new(
        two_weeks().with_children("A", vec![dir("A1", "A1"), file("a", "a.txt", 1)]),
    );
    let builder = builder(&mock, fast_config());

    let first = builder
        .traverse(&root(), 3, TraversalMode::All)
        .await
        .unwrap();
    let second = builder
        .traverse(&root(), 3, TraversalMode::All)
        .await
        .unwrap();

    assert_eq!(first.root, second.root);
    assert_eq!(first.progress, second.progress);
}

#[tokio::test(start_paused = true)]
async fn test_failed_branch_does_not_abort_siblings() {
    let mock = Arc::new(
        MockListing::new()
            .with_children(
                "root",
                vec![dir("A", "A"), dir("B", "Broken"), dir("C", "C")],
            )
            .with_children("A", files("a", 2))
            .with_children("C", files("c", 3))
            .always_failing("B"),
    );
    let builder = builder(&mock, fast_config());

    let outcome = builder
        .traverse(&root(), 2, TraversalMode::All)
        .await
        .unwrap();

    assert!(outcome.is_partial());
    assert!(!outcome.cancelled);
    assert_eq!(outcome.abandoned.len(), 1);
    let lost = &outcome.abandoned[0];
    assert_eq!(lost.external_id, "B");
    assert_eq!(lost.name, "Broken");
    assert_eq!(lost.depth, 1);
    assert_eq!(lost.records_kept, 0);
    assert!(lost.reason.contains("page 1 abandoned after 3 attempts"));

    let children = &outcome.root.children;
    assert_eq!(children[0].children.len(), 2);
    assert_eq!(children[1].listing, ListingStatus::Incomplete);
    assert!(children[1].children.is_empty());
    assert_eq!(children[2].children.len(), 3);
    assert_eq!(mock.calls_for("B").len(), 3);

    assert_eq!(outcome.progress.discovered, 8);
    assert_eq!(outcome.progress.processed, 8);
}

#[tokio::test(start_paused = true)]
async fn test_requests_respect_pool_limits() {
    let dirs: Vec<_> = (0..6).map(|i| dir(&format!("d{i}"), &format!("dir {i}"))).collect();
    let mut mock = MockListing::new()
        .with_children("root", dirs)
        .with_latency(Duration::from_millis(4000));
    for i in 0..6 {
        mock = mock.with_children(&format!("d{i}"), files(&format!("f{i}"), 2));
    }
    let mock = Arc::new(mock);
    let config = TraversalConfig::default().with_max_concurrent(2);
    let builder = builder(&mock, config);

    let outcome = builder
        .traverse(&root(), 2, TraversalMode::All)
        .await
        .unwrap();

    assert_eq!(outcome.root.count(), 1 + 6 + 12);
    assert!(mock.max_in_flight() <= 2);
    assert_eq!(mock.max_in_flight(), 2);

    let mut starts: Vec<_> = mock.calls().iter().map(|c| c.at).collect();
    starts.sort();
    for pair in starts.windows(2) {
        assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(3000));
    }
}

#[tokio::test(start_paused = true)]
async fn test_progress_observable_while_running() {
    let dirs: Vec<_> = (0..4).map(|i| dir(&format!("d{i}"), &format!("dir {i}"))).collect();
    let mut mock = MockListing::new().with_children("root", dirs);
    for i in 0..4 {
        mock = mock.with_children(&format!("d{i}"), files(&format!("f{i}"), 3));
    }
    let mock = Arc::new(mock);
    let builder = builder(&mock, TraversalConfig::default());

    let traversal = builder
        .prepare(&root(), 2, TraversalMode::All)
        .unwrap();
    let progress = traversal.progress();
    let handle = tokio::spawn(traversal.run());

    let mut samples = Vec::new();
    while !handle.is_finished() {
        tokio::time::sleep(Duration::from_millis(250)).await;
        samples.push(progress.snapshot());
    }
    let outcome = handle.await.unwrap();

    assert!(samples.len() > 1);
    for snapshot in &samples {
        assert!(snapshot.processed <= snapshot.discovered);
    }
    assert!(samples
        .iter()
        .any(|s| s.discovered > 0 && s.processed < s.discovered));
    assert_eq!(outcome.progress.discovered, 16);
    assert_eq!(outcome.progress.processed, 16);
    assert_eq!(outcome.progress.percentage(), Some(100.0));
}

#[tokio::test]
async fn test_zero_depth_rejected_before_any_request() {
    let mock = Arc::new(two_weeks());
    let builder = builder(&mock, fast_config());

    let result = builder.traverse(&root(), 0, TraversalMode::All).await;

    assert!(matches!(result, Err(TraversalError::ConfigError(_))));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_incomplete_root_rejected() {
    let mock = Arc::new(two_weeks());
    let builder = builder(&mock, fast_config());
    let mut incomplete = root();
    incomplete.owner_id.clear();

    let result = builder.traverse(&incomplete, 2, TraversalMode::All).await;

    assert!(matches!(result, Err(TraversalError::ConfigError(_))));
    assert!(mock.calls().is_empty());
}
