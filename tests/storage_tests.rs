use blog_api::storage::{DiskUploadStore, MockUploadStore, UploadStore};
use std::path::PathBuf;
use uuid::Uuid;

/// Creates a unique scratch directory per test so runs never interfere.
fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("blog-api-storage-test-{}", Uuid::new_v4()))
}

#[tokio::test]
async fn save_writes_file_and_preserves_extension() {
    let dir = scratch_dir();
    let store = DiskUploadStore::new(&dir);
    store.ensure_dir().await.unwrap();

    let filename = store.save("holiday photo.JPG", b"fake image bytes").await.unwrap();

    assert!(filename.ends_with(".jpg"));
    let on_disk = tokio::fs::read(dir.join(&filename)).await.unwrap();
    assert_eq!(on_disk, b"fake image bytes");

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn save_generates_unique_names_for_identical_inputs() {
    let dir = scratch_dir();
    let store = DiskUploadStore::new(&dir);
    store.ensure_dir().await.unwrap();

    let first = store.save("same.png", b"one").await.unwrap();
    let second = store.save("same.png", b"two").await.unwrap();

    assert_ne!(first, second);

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn save_neutralizes_path_traversal_names() {
    let dir = scratch_dir();
    let store = DiskUploadStore::new(&dir);
    store.ensure_dir().await.unwrap();

    let filename = store.save("../../../etc/passwd.sh", b"#!/bin/sh").await.unwrap();

    // Only a sanitized extension survives; the stored name has no separators
    // and the file lands inside the uploads directory.
    assert!(!filename.contains('/'));
    assert!(!filename.contains(".."));
    assert!(filename.ends_with(".sh"));
    assert!(dir.join(&filename).exists());

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn save_falls_back_to_bin_without_extension() {
    let dir = scratch_dir();
    let store = DiskUploadStore::new(&dir);
    store.ensure_dir().await.unwrap();

    let filename = store.save("no_extension", b"data").await.unwrap();
    assert!(filename.ends_with(".bin"));

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn ensure_dir_is_idempotent() {
    let dir = scratch_dir();
    let store = DiskUploadStore::new(&dir);

    store.ensure_dir().await.unwrap();
    store.ensure_dir().await.unwrap();
    assert!(dir.exists());

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

// --- Mock Store ---

#[tokio::test]
async fn mock_store_returns_deterministic_name() {
    let store = MockUploadStore::new();

    let filename = store.save("photo.png", b"irrelevant").await.unwrap();
    assert_eq!(filename, "mock-upload.png");
}

#[tokio::test]
async fn failing_mock_store_surfaces_error() {
    let store = MockUploadStore::new_failing();

    let result = store.save("photo.png", b"irrelevant").await;
    assert!(result.is_err());
}
