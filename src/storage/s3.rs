use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use tracing::{debug, error};

use super::{StorageError, StorageGateway};

const CONTENT_TYPE_JSON: &str = "application/json";

/// [`StorageGateway`] backed by Amazon S3
#[derive(Clone, Debug)]
pub struct S3Storage {
    client: S3Client,
}

impl S3Storage {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    async fn get_output(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<aws_sdk_s3::operation::get_object::GetObjectOutput, StorageError> {
        debug!(bucket = %bucket, key = %key, "Loading object from S3");

        self.client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    let err_msg = DisplayErrorContext(&e).to_string();
                    error!(bucket = %bucket, key = %key, error = %err_msg, "Failed to get S3 object");
                    StorageError::Request(format!("Failed to get S3 object: {}", err_msg))
                }
            })
    }

    async fn put(&self, bucket: &str, key: &str, body: ByteStream) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(CONTENT_TYPE_JSON)
            .send()
            .await
            .map_err(|e| {
                let err_msg = DisplayErrorContext(&e).to_string();
                error!(bucket = %bucket, key = %key, error = %err_msg, "Failed to put S3 object");
                StorageError::Request(format!("Failed to put S3 object: {}", err_msg))
            })?;

        debug!(bucket = %bucket, key = %key, "Successfully wrote object to S3");
        Ok(())
    }
}

#[async_trait]
impl StorageGateway for S3Storage {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let output = self.get_output(bucket, key).await?;

        let body_bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Request(format!("Failed to read S3 object body: {}", e)))?
            .into_bytes()
            .to_vec();

        debug!(
            bucket = %bucket,
            key = %key,
            size = body_bytes.len(),
            "Successfully loaded object from S3"
        );

        Ok(body_bytes)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), StorageError> {
        self.put(bucket, key, ByteStream::from(body)).await
    }

    async fn download_to(&self, bucket: &str, key: &str, path: &Path) -> Result<(), StorageError> {
        let output = self.get_output(bucket, key).await?;

        let mut body = output.body.into_async_read();
        let mut file = tokio::fs::File::create(path).await?;
        let size = tokio::io::copy(&mut body, &mut file).await?;

        debug!(
            bucket = %bucket,
            key = %key,
            path = %path.display(),
            size,
            "Downloaded S3 object to local file"
        );

        Ok(())
    }

    async fn upload_from(&self, path: &Path, bucket: &str, key: &str) -> Result<(), StorageError> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::Request(format!("Failed to open {}: {}", path.display(), e)))?;

        self.put(bucket, key, body).await
    }
}
