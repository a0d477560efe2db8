/*!
 * Tests for the persisted memoization store
 */

use std::fs;
use std::sync::Arc;

use bookwai::errors::StoreError;
use bookwai::translation::MemoizationStore;

use crate::common::create_temp_dir;

#[test]
fn test_store_get_withMissingKey_shouldReturnNone() {
    let dir = create_temp_dir().unwrap();
    let store = MemoizationStore::load(dir.path().join("book_process.json")).unwrap();
    assert!(store.get("nonexistent").is_none());
}

#[test]
fn test_store_load_withExistingFile_shouldRestoreEntries() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("book_process.json");
    fs::write(&path, r#"{"Hello.": "你好。", "World.": "世界。"}"#).unwrap();

    let store = MemoizationStore::load(&path).unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.get("World."), Some("世界。".to_string()));
}

#[test]
fn test_store_load_withEmptyFile_shouldBeEmpty() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("book_process.json");
    fs::write(&path, "").unwrap();
    assert!(MemoizationStore::load(&path).unwrap().is_empty());
}

#[test]
fn test_store_load_withNonObjectJson_shouldReturnParseError() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("book_process.json");
    fs::write(&path, "[1, 2]").unwrap();
    assert!(matches!(MemoizationStore::load(&path), Err(StoreError::Parse { .. })));
}

#[tokio::test]
async fn test_store_keys_shouldBeExactMatch() {
    let dir = create_temp_dir().unwrap();
    let store = MemoizationStore::load(dir.path().join("c.json")).unwrap();
    store.put_and_flush("Hello.", "Hola.").await.unwrap();

    assert!(store.get("hello.").is_none());
    assert!(store.get("Hello. ").is_none());
    assert_eq!(store.get("Hello."), Some("Hola.".to_string()));
}

#[tokio::test]
async fn test_store_putAndFlush_withUnwritableLocation_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let parent = dir.path().join("cache");
    let store = MemoizationStore::load(parent.join("c.json")).unwrap();
    // A regular file where the parent directory should be
    fs::write(&parent, "x").unwrap();

    assert!(matches!(store.put_and_flush("a", "b").await, Err(StoreError::Write { .. })));
    // A failed flush leaves no phantom entry behind
    assert!(store.get("a").is_none());
}

#[tokio::test]
async fn test_store_concurrentWriters_shouldNotLoseUpdates() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("c.json");
    let store = Arc::new(MemoizationStore::load(&path).unwrap());

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.put_and_flush(&format!("source {}", i), &format!("target {}", i)).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let reloaded = MemoizationStore::load(&path).unwrap();
    assert_eq!(reloaded.len(), 16);
}
