//! MinIO/S3-compatible asset storage
//!
//! Uses rust-s3 crate for lightweight S3 operations. Assets are written
//! under the configured public prefix; read access for that prefix is
//! expected to be granted by the bucket policy.

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use tracing::{debug, info};

use super::{validate_asset_name, AssetStorage, StorageError};
use crate::core::config::MinIOConfig;

pub struct MinIOAssetStorage {
    bucket: Box<Bucket>,
    public_endpoint: String,
    public_prefix: String,
}

impl MinIOAssetStorage {
    pub fn new(config: MinIOConfig) -> Result<Self, StorageError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("Failed to create MinIO credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StorageError::Backend(format!("Failed to create MinIO bucket: {}", e)))?;

        // Use path-style URLs for MinIO (http://endpoint/bucket instead of http://bucket.endpoint)
        bucket.set_path_style();

        info!(
            "MinIO asset storage initialized for endpoint: {}, bucket: {}, prefix: {}",
            config.endpoint,
            bucket.name(),
            config.public_prefix
        );

        Ok(Self {
            bucket,
            public_endpoint: config.public_endpoint.trim_end_matches('/').to_string(),
            public_prefix: config.public_prefix.trim_matches('/').to_string(),
        })
    }

    fn object_key(&self, name: &str) -> String {
        format!("{}/{}", self.public_prefix, name)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_endpoint, self.bucket.name(), key)
    }
}

#[async_trait]
impl AssetStorage for MinIOAssetStorage {
    async fn put(
        &self,
        name: &str,
        data: Vec<u8>,
        content_type: &str,
        _origin: &str,
    ) -> Result<String, StorageError> {
        validate_asset_name(name)?;
        let key = self.object_key(name);

        let response = self
            .bucket
            .put_object_with_content_type(&key, &data, content_type)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to upload '{}': {}", key, e)))?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(StorageError::Backend(format!(
                "Upload of '{}' returned status {}",
                key, status
            )));
        }

        debug!("Uploaded '{}' to bucket '{}'", key, self.bucket.name());
        Ok(self.public_url(&key))
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        validate_asset_name(name)?;
        let key = self.object_key(name);

        self.bucket
            .delete_object(&key)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to delete '{}': {}", key, e)))?;

        debug!("Deleted '{}' from bucket '{}'", key, self.bucket.name());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MinIOConfig {
        MinIOConfig {
            endpoint: "http://minio:9000".to_string(),
            public_endpoint: "https://cdn.example.com/".to_string(),
            access_key: "key".to_string(),
            secret_key: "secret".to_string(),
            bucket: "ar-models".to_string(),
            region: "us-east-1".to_string(),
            public_prefix: "/public/".to_string(),
        }
    }

    #[test]
    fn test_public_url_uses_public_endpoint_and_prefix() {
        let storage = MinIOAssetStorage::new(config()).unwrap();
        let key = storage.object_key("chair.glb");

        assert_eq!(key, "public/chair.glb");
        assert_eq!(
            storage.public_url(&key),
            "https://cdn.example.com/ar-models/public/chair.glb"
        );
    }
}
