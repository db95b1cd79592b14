use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

use super::{validate_asset_name, AssetStorage, StorageError, LOCAL_ASSETS_ROUTE};

/// Stores assets in a directory on the local filesystem
pub struct LocalAssetStorage {
    root: PathBuf,
}

impl LocalAssetStorage {
    /// Create the storage, creating `root` if it does not exist yet
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        info!("Local asset storage ready at {}", root.display());
        Ok(Self { root })
    }

    #[cfg(test)]
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

#[async_trait]
impl AssetStorage for LocalAssetStorage {
    async fn put(
        &self,
        name: &str,
        data: Vec<u8>,
        _content_type: &str,
        origin: &str,
    ) -> Result<String, StorageError> {
        validate_asset_name(name)?;

        let path = self.root.join(name);
        tokio::fs::write(&path, &data).await?;
        debug!("Wrote {} bytes to {}", data.len(), path.display());

        Ok(format!(
            "{}{}/{}",
            origin.trim_end_matches('/'),
            LOCAL_ASSETS_ROUTE,
            name
        ))
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        validate_asset_name(name)?;

        match tokio::fs::remove_file(self.root.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
