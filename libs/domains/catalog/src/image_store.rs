use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::models::ImageInfo;
use crate::repository::ImageStore;

/// Writes images to `{image_dir}/{id}{image_type}` and keeps their metadata in memory.
///
/// The file write happens outside the index lock; only the index insert is
/// serialised. A failed write leaves no index entry, though a partial file
/// may remain on disk.
#[derive(Debug, Clone)]
pub struct DiskImageStore {
    image_dir: PathBuf,
    images: Arc<RwLock<HashMap<String, ImageInfo>>>,
}

impl DiskImageStore {
    pub fn new(image_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: image_dir.into(),
            images: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Like [`new`](Self::new) but creates the directory first.
    pub async fn create(image_dir: impl Into<PathBuf>) -> CatalogResult<Self> {
        let store = Self::new(image_dir);
        tokio::fs::create_dir_all(&store.image_dir).await?;
        Ok(store)
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }
}

/// Image types are file extensions such as `.jpg`; anything that could
/// escape the image directory is refused.
fn validate_image_type(image_type: &str) -> CatalogResult<()> {
    let valid = image_type
        .strip_prefix('.')
        .is_some_and(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    if image_type.is_empty() || valid {
        Ok(())
    } else {
        Err(CatalogError::invalid(format!(
            "invalid image type {:?}",
            image_type
        )))
    }
}

#[async_trait]
impl ImageStore for DiskImageStore {
    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn save(&self, laptop_id: &str, image_type: &str, data: &[u8]) -> CatalogResult<String> {
        validate_image_type(image_type)?;

        let image_id = Uuid::new_v4().to_string();
        let path = self.image_dir.join(format!("{}{}", image_id, image_type));

        tokio::fs::write(&path, data).await?;

        let info = ImageInfo {
            id: image_id.clone(),
            laptop_id: laptop_id.to_string(),
            image_type: image_type.to_string(),
            path,
        };
        self.images.write().await.insert(image_id.clone(), info);

        info!(image_id = %image_id, "Saved image");
        Ok(image_id)
    }

    async fn find(&self, image_id: &str) -> CatalogResult<Option<ImageInfo>> {
        Ok(self.images.read().await.get(image_id).cloned())
    }

    async fn len(&self) -> CatalogResult<usize> {
        Ok(self.images.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_writes_file_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskImageStore::new(dir.path());
        let data = vec![7u8; 3000];

        let id = store.save("laptop-1", ".jpg", &data).await.unwrap();
        let info = store.find(&id).await.unwrap().unwrap();

        assert_eq!(info.laptop_id, "laptop-1");
        assert_eq!(info.image_type, ".jpg");
        assert_eq!(info.path, dir.path().join(format!("{}.jpg", id)));
        assert_eq!(tokio::fs::read(&info.path).await.unwrap(), data);
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskImageStore::new(dir.path().join("missing"));

        let result = store.save("laptop-1", ".png", b"data").await;
        assert!(matches!(result, Err(CatalogError::Io(_))));
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_makes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("img").join("laptops");

        let store = DiskImageStore::create(&nested).await.unwrap();
        store.save("laptop-1", "", b"raw").await.unwrap();
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn test_rejects_path_like_image_type() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskImageStore::new(dir.path());

        for image_type in ["/../../etc", "jpg", ".", ".j/g"] {
            let result = store.save("laptop-1", image_type, b"x").await;
            assert!(matches!(result, Err(CatalogError::InvalidArgument(_))), "{image_type}");
        }
        assert_eq!(store.len().await.unwrap(), 0);
    }
}
