//! Request pool properties under concurrent load

use share_tree_exporter::traversal::RequestPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

#[tokio::test(start_paused = true)]
async fn test_never_exceeds_max_concurrent() {
    let pool = Arc::new(RequestPool::new(3, Duration::from_millis(10)));
    let holders = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let pool = pool.clone();
            let holders = holders.clone();
            let peak = peak.clone();
            tokio::spawn(async move {
                let ticket = pool.acquire().await.unwrap();
                let now = holders.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                assert!(pool.active() <= 3);
                sleep(Duration::from_millis(50 + (i % 4) * 25)).await;
                holders.fetch_sub(1, Ordering::SeqCst);
                ticket.release();
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(peak.load(Ordering::SeqCst), 3);
    assert_eq!(pool.active(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_grants_are_spaced_by_min_interval() {
    let pool = Arc::new(RequestPool::new(2, Duration::from_millis(3000)));
    let grants = Arc::new(Mutex::new(Vec::new()));

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let pool = pool.clone();
            let grants = grants.clone();
            tokio::spawn(async move {
                let ticket = pool.acquire().await.unwrap();
                grants.lock().unwrap().push(ticket.granted_at());
                sleep(Duration::from_millis(100)).await;
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    let mut grants = grants.lock().unwrap().clone();
    grants.sort();
    assert_eq!(grants.len(), 6);
    for pair in grants.windows(2) {
        assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(3000));
    }
}

#[tokio::test(start_paused = true)]
async fn test_waiters_served_in_arrival_order() {
    let pool = Arc::new(RequestPool::new(1, Duration::ZERO));
    let order = Arc::new(Mutex::new(Vec::new()));

    let first = pool.acquire().await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..5 {
        let pool = pool.clone();
        let order = order.clone();
        tasks.push(tokio::spawn(async move {
            let ticket = pool.acquire().await.unwrap();
            order.lock().unwrap().push(i);
            sleep(Duration::from_millis(10)).await;
            drop(ticket);
        }));
        // let each waiter enqueue before the next one arrives
        tokio::task::yield_now().await;
    }

    sleep(Duration::from_millis(5)).await;
    first.release();

    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test(start_paused = true)]
async fn test_release_on_error_path_frees_slot() {
    let pool = RequestPool::new(1, Duration::ZERO);

    let result: Result<(), &str> = async {
        let _ticket = pool.acquire().await.unwrap();
        Err("request failed")
    }
    .await;
    assert!(result.is_err());
    assert_eq!(pool.active(), 0);

    let start = Instant::now();
    let _ticket = pool.acquire().await.unwrap();
    assert_eq!(Instant::now(), start);
}
