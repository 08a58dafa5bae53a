// Tests for the OpenDAL-backed store using the in-memory service

use std::sync::Arc;

use bucketsync::fs::{ObjectStore, OpendalStore, StoreError};
use bucketsync::sync::{SyncDecision, SyncEngine};

use crate::common::config;

async fn seeded() -> OpendalStore {
    let store = OpendalStore::memory().unwrap();
    let op = store.operator();
    op.write("data/a.txt", b"hello".to_vec()).await.unwrap();
    op.write("data/nested/b.bin", vec![0u8; 300]).await.unwrap();
    op.write("other/c.txt", b"elsewhere".to_vec()).await.unwrap();
    store
}

#[tokio::test]
async fn test_list_prefix_recursively() {
    let store = seeded().await;

    let objects = store.list("data/").await.unwrap();
    let keys: Vec<_> = objects.iter().map(|o| o.key.as_str()).collect();

    assert_eq!(keys, vec!["data/a.txt", "data/nested/b.bin"]);
    assert_eq!(objects[0].size, 5);
    assert_eq!(objects[1].size, 300);
}

#[tokio::test]
async fn test_stat_missing_is_not_found() {
    let store = seeded().await;

    let err = store.stat("data/missing.txt").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));

    let found = store.stat("data/a.txt").await.unwrap();
    assert_eq!(found.size, 5);
    assert_eq!(found.key, "data/a.txt");
}

#[tokio::test]
async fn test_sync_between_memory_stores() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(seeded().await);
    let dest = Arc::new(OpendalStore::memory().unwrap());

    let mut cfg = config(dir.path());
    cfg.prefix = "data/".to_string();

    let engine = SyncEngine::new(source.clone(), dest.clone(), cfg);
    let report = engine.run().await.unwrap();

    assert_eq!(report.stats.transferred, 2);
    assert_eq!(report.stats.bytes_transferred, 305);
    assert_eq!(
        dest.operator().read("data/a.txt").await.unwrap().to_vec(),
        b"hello".to_vec()
    );
    assert!(dest.stat("other/c.txt").await.is_err());

    let again = engine.run().await.unwrap();
    assert!(again.entries.iter().all(|e| match e.action {
        bucketsync::sync::SyncAction::Decided(d) => d.is_skip(),
        _ => false,
    }));
    assert_ne!(again.decision_for("data/a.txt"), Some(SyncDecision::Transfer));
    assert_eq!(again.stats.bytes_transferred, 0);
}
