use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;

/// Where uploaded files live. Handlers only ever see opaque references
/// (`/storage/...` paths) so the backing store can change without touching
/// the booking or property logic.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persists `bytes` under `subdir` and returns the public reference.
    async fn store(&self, subdir: &str, ext: &str, bytes: &[u8]) -> Result<String, AppError>;

    /// Best-effort removal of a previously stored reference.
    async fn delete(&self, reference: &str);
}

/// Local-disk storage rooted at `STORAGE_DIR`, served by the router under
/// `/storage`.
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, reference: &str) -> Option<PathBuf> {
        // References look like "/storage/id_cards/<uuid>.jpg"
        let rel = reference.strip_prefix("/storage/")?;
        if rel.contains("..") {
            return None;
        }
        Some(self.root.join(rel))
    }
}

#[async_trait]
impl FileStorage for DiskStorage {
    async fn store(&self, subdir: &str, ext: &str, bytes: &[u8]) -> Result<String, AppError> {
        let dir = self.root.join(subdir);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Internal(format!("create storage dir: {e}")))?;

        let filename = format!("{}.{}", Uuid::new_v4(), ext);
        tokio::fs::write(dir.join(&filename), bytes)
            .await
            .map_err(|e| AppError::Internal(format!("write upload: {e}")))?;

        Ok(format!("/storage/{}/{}", subdir, filename))
    }

    async fn delete(&self, reference: &str) {
        if let Some(path) = self.path_for(reference) {
            if let Err(err) = tokio::fs::remove_file(&path).await {
                tracing::warn!("failed to remove stored file {reference}: {err}");
            }
        }
    }
}

/// Maps an uploaded content type to the extension we store under.
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    match content_type {
        Some("image/png") => "png",
        Some("image/webp") => "webp",
        _ => "jpg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_paths_resolve_under_root() {
        let storage = DiskStorage::new("/tmp/rental-storage");
        let path = storage.path_for("/storage/id_cards/abc.jpg").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/rental-storage/id_cards/abc.jpg"));
    }

    #[test]
    fn traversal_references_are_rejected() {
        let storage = DiskStorage::new("/tmp/rental-storage");
        assert!(storage.path_for("/storage/../etc/passwd").is_none());
        assert!(storage.path_for("/elsewhere/abc.jpg").is_none());
    }

    #[test]
    fn extension_follows_content_type() {
        assert_eq!(extension_for(Some("image/png")), "png");
        assert_eq!(extension_for(Some("image/jpeg")), "jpg");
        assert_eq!(extension_for(None), "jpg");
    }

    #[tokio::test]
    async fn store_then_delete_round_trip() {
        let root = std::env::temp_dir().join(format!("rental-test-{}", Uuid::new_v4()));
        let storage = DiskStorage::new(&root);

        let reference = storage.store("properties", "jpg", b"fake-image").await.unwrap();
        assert!(reference.starts_with("/storage/properties/"));

        let on_disk = storage.path_for(&reference).unwrap();
        assert_eq!(tokio::fs::read(&on_disk).await.unwrap(), b"fake-image");

        storage.delete(&reference).await;
        assert!(!on_disk.exists());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
