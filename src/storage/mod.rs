mod s3;

pub use s3::S3Storage;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur talking to object storage
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object s3://{bucket}/{key} does not exist")]
    NotFound { bucket: String, key: String },

    #[error("S3 request failed: {0}")]
    Request(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Object storage used by the pipeline. Implemented by [`S3Storage`] and by
/// in-memory fakes in tests.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Write `body` to the object, replacing any existing content
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), StorageError>;

    /// Download an object into a local file
    async fn download_to(&self, bucket: &str, key: &str, path: &Path) -> Result<(), StorageError> {
        let body = self.get_object(bucket, key).await?;
        tokio::fs::write(path, body).await?;
        Ok(())
    }

    /// Upload a local file, replacing any existing content
    async fn upload_from(&self, path: &Path, bucket: &str, key: &str) -> Result<(), StorageError> {
        let body = tokio::fs::read(path).await?;
        self.put_object(bucket, key, body).await
    }
}
