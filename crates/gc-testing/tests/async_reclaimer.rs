//! Integration tests for the tokio evaluator and `#[async_test]`.

use std::cell::Cell;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use gc_testing::fixtures::generate_sequence_and_weak_references;
use gc_testing::host::{DeferredHeap, Managed};
use gc_testing::tokio::AsyncReclaimer;
use gc_testing::{Collector, ReclaimError, RefCounting, RetryPolicy};
use tokio_util::sync::CancellationToken;

fn quick() -> AsyncReclaimer {
    AsyncReclaimer::with_policy(
        RefCounting,
        RetryPolicy::new()
            .with_max_attempts(5)
            .with_pause(Duration::ZERO),
    )
}

fn fleeting() -> Weak<u32> {
    Arc::downgrade(&Arc::new(0))
}

/// Counts collection requests.
struct Counting(Cell<u32>);

impl Collector for Counting {
    fn request_collection(&self) {
        self.0.set(self.0.get() + 1);
    }
}

#[gc_testing::async_test]
async fn test_target_is_reclaimable() {
    assert!(quick().target_is_reclaimable(&fleeting()).await);
}

#[gc_testing::async_test]
async fn test_target_is_not_reclaimable() {
    let held = Arc::new(1_u32);
    assert!(!quick().target_is_reclaimable(&Arc::downgrade(&held)).await);
}

#[gc_testing::async_test]
async fn test_only_reclaimable_after_skips_block_when_already_gone() {
    let ran = Cell::new(false);
    let result = quick()
        .check_target_only_reclaimable_after(&fleeting(), || ran.set(true))
        .await;
    assert_eq!(result, Err(ReclaimError::ReclaimedEarly));
    assert!(!ran.get());
}

#[gc_testing::async_test]
async fn test_dismiss_next_reclaims_targets() {
    let (mut sequence, references) = generate_sequence_and_weak_references(3, |i| i);
    let reclaimer = quick();
    for reference in &references {
        reclaimer
            .assert_target_only_reclaimable_after(reference, || sequence.dismiss_next())
            .await;
    }
}

#[gc_testing::async_test]
async fn test_group_assertions() {
    let values: Vec<Arc<String>> = (0..3).map(|i| Arc::new(i.to_string())).collect();
    let refs: Vec<Weak<String>> = values.iter().map(Arc::downgrade).collect();
    let reclaimer = quick();

    assert!(!reclaimer.any_target_reclaimable(&refs).await);
    reclaimer
        .assert_targets_only_reclaimable_after(&refs, move || drop(values))
        .await;
    assert!(reclaimer.all_targets_reclaimable(&refs).await);

    let empty: Vec<Weak<String>> = Vec::new();
    reclaimer.assert_all_targets_reclaimable(&empty).await;
    reclaimer.assert_no_target_reclaimable(&empty).await;
}

#[gc_testing::async_test]
async fn test_mixed_group_fails() {
    let held = Arc::new(5_u32);
    let refs = vec![fleeting(), Arc::downgrade(&held)];

    assert_eq!(
        quick().check_all_targets_reclaimable(&refs).await,
        Err(ReclaimError::NotAllReclaimed {
            retained: vec![1],
            total: 2,
        })
    );
}

#[gc_testing::async_test]
async fn test_deferred_heap_with_every_nth_collector() {
    let heap = DeferredHeap::every_nth(3);
    let reclaimer = AsyncReclaimer::with_policy(
        &heap,
        RetryPolicy::new()
            .with_max_attempts(5)
            .with_pause(Duration::ZERO)
            .with_presence_attempts(0),
    );
    let value = heap.alloc(vec![1_u8, 2, 3]);
    let weak = Managed::downgrade(&value);

    reclaimer
        .assert_target_only_reclaimable_after(&weak, move || drop(value))
        .await;
    assert_eq!(heap.stats().requests, 3);
}

#[gc_testing::async_test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_heap_on_multi_thread_runtime() {
    let heap = DeferredHeap::concurrent(Duration::from_millis(1)).expect("spawn collector thread");
    let reclaimer = AsyncReclaimer::with_policy(
        &heap,
        RetryPolicy::new()
            .with_max_attempts(200)
            .with_pause(Duration::from_millis(2)),
    );
    let weak = Managed::downgrade(&heap.alloc(String::from("background")));

    reclaimer.assert_target_reclaimable(&weak).await;
}

#[gc_testing::async_test]
async fn test_cancelled_evaluation_stops_promptly() {
    let reclaimer = AsyncReclaimer::with_policy(
        RefCounting,
        RetryPolicy::new()
            .with_max_attempts(10_000)
            .with_pause(Duration::from_millis(10)),
    );
    let token = CancellationToken::new();
    let canceller = token.clone();
    gc_testing::__private::tokio::spawn(async move {
        gc_testing::__private::tokio::time::sleep(Duration::from_millis(30)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let outcome = reclaimer.try_to_achieve_cancellable(|| false, &token).await;
    assert_eq!(outcome, None);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[gc_testing::async_test]
async fn test_dropped_evaluation_stops_requesting_collections() {
    use gc_testing::__private::tokio::time::{sleep, timeout};

    let reclaimer = AsyncReclaimer::with_policy(
        Counting(Cell::new(0)),
        RetryPolicy::new()
            .with_max_attempts(100_000)
            .with_pause(Duration::from_millis(1)),
    );

    let outcome = timeout(Duration::from_millis(20), reclaimer.try_to_achieve(|| false)).await;
    assert!(outcome.is_err());

    let requested = reclaimer.blocking().collector().0.get();
    assert!(requested >= 1);
    assert!(requested < 100_000);

    sleep(Duration::from_millis(20)).await;
    assert_eq!(reclaimer.blocking().collector().0.get(), requested);
}

#[gc_testing::async_test]
async fn test_cancellable_evaluation_reports_outcome() {
    let token = CancellationToken::new();
    assert_eq!(quick().try_to_achieve_cancellable(|| true, &token).await, Some(true));
    assert_eq!(quick().try_to_achieve_cancellable(|| false, &token).await, Some(false));
}

#[gc_testing::async_test]
async fn test_yields_between_rounds() {
    let reclaimer = AsyncReclaimer::with_policy(
        Counting(Cell::new(0)),
        RetryPolicy::new()
            .with_max_attempts(4)
            .with_pause(Duration::ZERO),
    );
    assert!(!reclaimer.try_to_achieve(|| false).await);
    assert_eq!(reclaimer.blocking().collector().0.get(), 4);
}

#[gc_testing::async_test]
#[should_panic(expected = "expected target to be reclaimable")]
async fn test_assert_reclaimable_panics_when_held() {
    let held = Arc::new(0_u32);
    quick().assert_target_reclaimable(&Arc::downgrade(&held)).await;
}
