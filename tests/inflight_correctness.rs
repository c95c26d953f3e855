#![allow(clippy::unwrap_used, missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use docsort::cache::async_backed::InFlight;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_factory_run() {
    let inflight = Arc::new(InFlight::<u64, String>::default());
    let calls = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let inflight = Arc::clone(&inflight);
        let calls = Arc::clone(&calls);
        handles.push(tokio::spawn(async move {
            inflight
                .join_or_start(
                    1,
                    || None,
                    move || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async {
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            "value".to_owned()
                        }
                    },
                )
                .await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().as_deref(), Some("value"));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1, "factory should run once");
    assert!(inflight.is_empty(), "slot should be gone once settled");
}

#[tokio::test]
async fn nothing_is_memoized_after_settling() {
    let inflight = InFlight::<u64, u64>::default();
    let calls = AtomicUsize::new(0);

    for expected in 1..=3 {
        let v = inflight
            .join_or_start(
                7,
                || None,
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst) as u64 + 1;
                    async move { n }
                },
            )
            .await;
        assert_eq!(v, Some(expected));
    }
}

#[tokio::test]
async fn settled_value_short_circuits_the_factory() {
    let inflight = InFlight::<u64, &'static str>::default();

    let v = inflight
        .join_or_start(
            1,
            || Some("cached"),
            || async { panic!("factory should not run") },
        )
        .await;

    assert_eq!(v, Some("cached"));
    assert!(inflight.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn waiters_resume_after_the_slot_is_gone() {
    let inflight = Arc::new(InFlight::<u64, u64>::default());

    let leader = {
        let inflight = Arc::clone(&inflight);
        tokio::spawn(async move {
            inflight
                .join_or_start(
                    1,
                    || None,
                    || async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        1
                    },
                )
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(inflight.contains(&1).await, "leader should be in flight");

    let joined = inflight
        .join_or_start(1, || None, || async { panic!("should join the leader") })
        .await;
    assert_eq!(joined, Some(1));
    assert!(
        !inflight.contains(&1).await,
        "slot must be deregistered before waiters observe the result"
    );
    assert_eq!(leader.await.unwrap(), Some(1));
}

#[tokio::test]
async fn panic_in_factory_is_reported_and_recovered() {
    let inflight = InFlight::<u64, String>::default();

    let first = inflight
        .join_or_start(1, || None, || async { panic!("boom") })
        .await;
    assert_eq!(first, None, "a panicked factory yields None");
    assert!(inflight.is_empty(), "the poisoned slot should be removed");

    let second = inflight
        .join_or_start(1, || None, || async { "recovered".to_owned() })
        .await;
    assert_eq!(second.as_deref(), Some("recovered"));
}
