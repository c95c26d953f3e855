#![allow(clippy::unwrap_used, missing_docs)]

use std::sync::Arc;

use docsort::cache::key::{CacheKey, RemoteId};
use docsort::cache::overlay::CacheOverlay;
use docsort::cache::store::JsonFileStore;
use docsort::cache::traits::PersistentStore as _;

#[tokio::test]
async fn missing_file_starts_cold_and_first_save_creates_it() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("nested").join("dir").join("cache.json");
    let store = Arc::new(JsonFileStore::new(&path));

    let overlay = CacheOverlay::load(Arc::clone(&store)).await;
    assert!(overlay.is_empty());
    assert!(!path.exists(), "loading must not create the file");

    overlay
        .put(CacheKey::under_root("DOCS"), RemoteId::from("1"))
        .await
        .unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn corrupt_file_loads_empty_and_is_rewritten_on_next_mutation() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("cache.json");
    std::fs::write(&path, b"{ not json").unwrap();
    let store = Arc::new(JsonFileStore::new(&path));

    let overlay = CacheOverlay::load(Arc::clone(&store)).await;
    assert!(overlay.is_empty());

    overlay
        .put(CacheKey::under_root("DOCS"), RemoteId::from("1"))
        .await
        .unwrap();

    let reloaded = store.load().await;
    assert_eq!(
        reloaded.get(&CacheKey::under_root("DOCS")),
        Some(&RemoteId::from("1"))
    );
}

#[tokio::test]
async fn non_object_document_is_treated_as_corrupt() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("cache.json");
    std::fs::write(&path, b"[\"root:DOCS\", \"1\"]").unwrap();

    assert!(JsonFileStore::new(&path).load().await.is_empty());
}

#[tokio::test]
async fn entries_survive_a_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("cache.json");

    {
        let overlay = CacheOverlay::load(Arc::new(JsonFileStore::new(&path))).await;
        overlay
            .put(CacheKey::under_root("DOCS"), RemoteId::from("1"))
            .await
            .unwrap();
        overlay
            .put(CacheKey::new(RemoteId::from("1"), "2025"), RemoteId::from("2"))
            .await
            .unwrap();
        overlay.remove(&CacheKey::under_root("DOCS")).await.unwrap();
    }

    let overlay = CacheOverlay::load(Arc::new(JsonFileStore::new(&path))).await;
    assert_eq!(overlay.len(), 1);
    assert_eq!(
        overlay.get(&CacheKey::new(RemoteId::from("1"), "2025")),
        Some(RemoteId::from("2"))
    );
}

#[tokio::test]
async fn store_file_uses_the_parent_name_key_format() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("cache.json");
    let overlay = CacheOverlay::load(Arc::new(JsonFileStore::new(&path))).await;

    overlay
        .put(CacheKey::new(RemoteId::from("abc"), "a:b"), RemoteId::from("9"))
        .await
        .unwrap();

    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw, serde_json::json!({ "abc:a:b": "9" }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_puts_are_all_persisted() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("cache.json");
    let overlay = Arc::new(CacheOverlay::load(Arc::new(JsonFileStore::new(&path))).await);

    let mut handles = Vec::new();
    for i in 0..32 {
        let overlay = Arc::clone(&overlay);
        handles.push(tokio::spawn(async move {
            overlay
                .put(
                    CacheKey::under_root(format!("F{i}")),
                    RemoteId::from(format!("id-{i}")),
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let reloaded = JsonFileStore::new(&path).load().await;
    assert_eq!(reloaded.len(), 32, "the last save must include every put");
}
