#![allow(clippy::unwrap_used, missing_docs)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockRemote, memory_resolver};
use docsort::cache::key::{CacheKey, RemoteId};
use docsort::resolve::ResolveError;

#[tokio::test]
async fn paths_without_segments_are_rejected_without_remote_calls() {
    let (resolver, remote, _store) = memory_resolver(MockRemote::new()).await;

    for raw in ["", "   ", "/", " // / "] {
        let err = resolver.resolve_path(raw).await.unwrap_err();
        assert_eq!(err, ResolveError::InvalidPath(raw.to_owned()));
    }
    assert_eq!(remote.total_calls(), 0);
}

#[tokio::test]
async fn each_segment_is_created_under_the_previous_one() {
    let (resolver, remote, store) = memory_resolver(MockRemote::new()).await;

    let leaf = resolver.resolve_path("A/B/C").await.unwrap();

    assert_eq!(remote.creates(), 3);
    let c = remote.node(&leaf).unwrap();
    assert_eq!(c.name, "C");
    let b = remote.node(c.parent.as_ref().unwrap()).unwrap();
    assert_eq!(b.name, "B");
    let a = remote.node(b.parent.as_ref().unwrap()).unwrap();
    assert_eq!(a.name, "A");
    assert_eq!(a.parent, Some(RemoteId::root()));

    let snapshot = store.snapshot();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot.get(&CacheKey::under_root("A")), Some(&a.id));
    assert_eq!(snapshot.get(&CacheKey::new(b.id.clone(), "C")), Some(&leaf));
}

#[tokio::test]
async fn second_resolution_is_served_from_the_cache() {
    let (resolver, remote, _store) = memory_resolver(MockRemote::new()).await;

    let first = resolver.resolve_path("A/B/C").await.unwrap();
    let finds = remote.finds();
    let second = resolver.resolve_path("A/B/C").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(remote.creates(), 3);
    assert_eq!(remote.finds(), finds, "no searches on a warm cache");
    assert_eq!(remote.probes(), 3, "one liveness probe per cached segment");
}

#[tokio::test]
async fn separators_and_whitespace_are_normalized() {
    let (resolver, remote, _store) = memory_resolver(MockRemote::new()).await;

    let tidy = resolver.resolve_path("A/B").await.unwrap();
    let messy = resolver.resolve_path(" /A// B / ").await.unwrap();

    assert_eq!(tidy, messy);
    assert_eq!(remote.creates(), 2);
}

#[tokio::test]
async fn segment_names_are_case_sensitive() {
    let (resolver, remote, _store) = memory_resolver(MockRemote::new()).await;

    let upper = resolver.resolve_path("ROOT/PDF").await.unwrap();
    let lower = resolver.resolve_path("ROOT/pdf").await.unwrap();

    assert_ne!(upper, lower);
    assert_eq!(remote.creates(), 3);
}

#[tokio::test]
async fn existing_prefix_is_reused() {
    let (resolver, remote, _store) = memory_resolver(MockRemote::new()).await;
    let docs = remote.insert_folder(&RemoteId::root(), "DOCS");
    let year = remote.insert_folder(&docs, "2025");

    let leaf = resolver.resolve_path("DOCS/2025/PDF").await.unwrap();

    assert_eq!(remote.creates(), 1);
    assert_eq!(remote.node(&leaf).unwrap().parent, Some(year));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_paths_share_their_common_prefix() {
    let (resolver, remote, _store) =
        memory_resolver(MockRemote::new().with_create_delay(Duration::from_millis(20))).await;

    let mut handles = Vec::new();
    for path in [
        "IZVODI/2025/DINARSKI/PDF",
        "IZVODI/2025/DINARSKI/XML",
        "IZVODI/2025/DEVIZNI/PDF",
        "IZVODI/2025/DINARSKI/PDF",
    ] {
        let resolver = Arc::clone(&resolver);
        handles.push(tokio::spawn(
            async move { resolver.resolve_path(path).await },
        ));
    }
    let ids: Vec<RemoteId> = {
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }
        ids
    };

    assert_eq!(ids[0], ids[3], "identical paths resolve to one folder");
    // IZVODI, 2025, DINARSKI, DEVIZNI, DINARSKI/PDF, DINARSKI/XML, DEVIZNI/PDF
    assert_eq!(remote.creates(), 7);
    assert_eq!(remote.children_named(&RemoteId::root(), "IZVODI").len(), 1);
}
