use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

// 1. UploadStore Contract
/// UploadStore
///
/// Defines the abstract contract for persisting uploaded featured images.
/// The trait lets us swap the concrete implementation, from the real disk
/// store (DiskUploadStore) in production to the in-memory mock
/// (MockUploadStore) during testing, without affecting the calling handlers.
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Ensures the uploads directory exists. Called once at startup so the
    /// static file service and `save` have a directory to work with.
    async fn ensure_dir(&self) -> std::io::Result<()>;

    /// Persists one uploaded file and returns the generated filename it was
    /// stored under. Only the extension of `original_name` survives into the
    /// stored name; the rest is replaced by a fresh UUID.
    async fn save(&self, original_name: &str, bytes: &[u8]) -> std::io::Result<String>;
}

/// sanitize_extension
///
/// Derives a safe file extension from a client-provided filename. Strips
/// anything that is not ASCII alphanumeric so a crafted name (`../../x.sh`,
/// embedded separators, NUL bytes) can never influence the stored path
/// beyond its extension.
fn sanitize_extension(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .map(|ext| {
            ext.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .take(8)
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "bin".to_string())
}

// 2. The Real Implementation (Local Disk)
/// DiskUploadStore
///
/// Writes uploads under the configured uploads directory, from where
/// tower-http's ServeDir serves them back at `/uploads/<filename>`.
#[derive(Clone)]
pub struct DiskUploadStore {
    dir: PathBuf,
}

impl DiskUploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl UploadStore for DiskUploadStore {
    async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    async fn save(&self, original_name: &str, bytes: &[u8]) -> std::io::Result<String> {
        let extension = sanitize_extension(original_name);
        let filename = format!("{}.{}", Uuid::new_v4(), extension);

        tokio::fs::write(self.dir.join(&filename), bytes).await?;

        Ok(filename)
    }
}

// 3. The Mock Implementation (For Tests)
/// MockUploadStore
///
/// A mock implementation of `UploadStore` used exclusively for tests. Stores
/// nothing and returns a deterministic filename so handler assertions do not
/// depend on the filesystem.
#[derive(Clone)]
pub struct MockUploadStore {
    /// When true, `save` returns a simulated failure.
    pub should_fail: bool,
}

impl MockUploadStore {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

impl Default for MockUploadStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UploadStore for MockUploadStore {
    async fn ensure_dir(&self) -> std::io::Result<()> {
        Ok(())
    }

    async fn save(&self, original_name: &str, _bytes: &[u8]) -> std::io::Result<String> {
        if self.should_fail {
            return Err(std::io::Error::other("mock upload store failure"));
        }

        Ok(format!("mock-upload.{}", sanitize_extension(original_name)))
    }
}

/// UploadState
///
/// The concrete type used to share the upload store across the application
/// state.
pub type UploadState = Arc<dyn UploadStore>;
