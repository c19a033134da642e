use async_trait::async_trait;
use aws_sdk_s3::{
    config::{BehaviorVersion, Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    Client,
};

use crate::config::ObjectStoreConfig;

#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("failed to prepare bucket '{bucket}': {message}")]
    Bucket { bucket: String, message: String },
    #[error("failed to upload '{key}': {message}")]
    Upload { key: String, message: String },
}

/// Byte sink addressed by key. Writing an existing key replaces it.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;
}

/// S3-compatible bucket (AWS or MinIO)
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(config: &ObjectStoreConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "marketplace-pipeline",
        );
        let s3_cfg = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .force_path_style(true)
            .endpoint_url(config.endpoint.clone())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .build();

        Self {
            client: Client::from_conf(s3_cfg),
            bucket: config.bucket.clone(),
        }
    }

    /// Create the bucket unless it already exists
    pub async fn ensure_bucket(&self) -> Result<(), ObjectStoreError> {
        if self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
        {
            tracing::info!("Bucket '{}' already exists", self.bucket);
            return Ok(());
        }

        self.client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Bucket {
                bucket: self.bucket.clone(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        tracing::info!("Bucket '{}' created", self.bucket);
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        tracing::info!("Uploading '{}' to bucket '{}'", key, self.bucket);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| ObjectStoreError::Upload {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        tracing::info!("Uploaded '{}' to bucket '{}'", key, self.bucket);
        Ok(())
    }
}
