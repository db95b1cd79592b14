//! Storage module for model assets
//!
//! Uploaded model files and rendered QR images are written through the
//! [`AssetStorage`] trait. Two backends exist: a local directory served by
//! the API itself under `/uploads`, and a MinIO/S3-compatible bucket.

mod local;
mod minio_client;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::error::AppError;

pub use local::LocalAssetStorage;
pub use minio_client::MinIOAssetStorage;

/// URL path under which the local backend's directory is served
pub const LOCAL_ASSETS_ROUTE: &str = "/uploads";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid asset name: {0}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        AppError::Internal(format!("Asset storage failed: {}", e))
    }
}

/// Persistent home for uploaded assets
#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// Stores `data` under `name` and returns the public URL of the asset.
    ///
    /// `origin` is the public `scheme://host` of this service; backends that
    /// serve assets through the API build their URLs from it.
    async fn put(
        &self,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
        origin: &str,
    ) -> Result<String, StorageError>;

    /// Removes the asset stored under `name`
    async fn delete(&self, name: &str) -> Result<(), StorageError>;
}

/// Asset names are flat file names generated by the service.
pub(crate) fn validate_asset_name(name: &str) -> Result<(), StorageError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_asset_name() {
        assert!(validate_asset_name("0b6f9c1e-model.glb").is_ok());
        assert!(validate_asset_name("abc-qr.png").is_ok());

        assert!(validate_asset_name("").is_err());
        assert!(validate_asset_name("../etc/passwd").is_err());
        assert!(validate_asset_name(".hidden").is_err());
        assert!(validate_asset_name("dir/file.glb").is_err());
        assert!(validate_asset_name("with space.glb").is_err());
    }
}
