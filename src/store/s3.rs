//! S3-backed blob store.
//!
//! Stores tile artifacts and metadata records as objects in an S3 bucket,
//! optionally under a key prefix. Works with S3-compatible services
//! (MinIO, etc.) via a custom endpoint with path-style addressing.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::error::StoreError;

use super::BlobStore;

/// S3 implementation of [`BlobStore`].
///
/// The blob path is used as the object key, prefixed if a prefix was
/// configured.
///
/// # Example
///
/// ```ignore
/// use astrotile::store::{create_s3_client, S3BlobStore};
///
/// let client = create_s3_client(None, "us-east-1").await;
/// let store = S3BlobStore::new(client, "sky-tiles".to_string(), None);
/// let tile = store.get("andromeda/4/0/0.png").await?;
/// ```
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl S3BlobStore {
    /// Create a new store for the given bucket and optional key prefix.
    pub fn new(client: Client, bucket: String, prefix: Option<String>) -> Self {
        Self {
            client,
            bucket,
            prefix,
        }
    }

    /// Get the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_key(&self, path: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), path),
            None => path.to_string(),
        }
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        let key = self.object_key(path);
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let is_not_found = e
                    .as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false);
                if is_not_found {
                    return Ok(false);
                }

                // Some S3-compatible services report a bare 404 instead of
                // a modeled NotFound error
                let status_is_404 = e
                    .raw_response()
                    .map(|r| r.status().as_u16() == 404)
                    .unwrap_or(false);
                if status_is_404 {
                    return Ok(false);
                }

                Err(StoreError::Unavailable(e.to_string()))
            }
        }
    }

    async fn get(&self, path: &str) -> Result<Bytes, StoreError> {
        let key = self.object_key(path);
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                let is_no_such_key = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);

                let status_is_404 = e
                    .raw_response()
                    .map(|r| r.status().as_u16() == 404)
                    .unwrap_or(false);

                if is_no_such_key || status_is_404 {
                    StoreError::NotFound(self.location(&key))
                } else {
                    StoreError::Unavailable(e.to_string())
                }
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .into_bytes();

        Ok(data)
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<(), StoreError> {
        let key = self.object_key(path);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

/// Create an S3 client with optional custom endpoint and region.
///
/// Use a custom endpoint for S3-compatible services like MinIO:
/// ```ignore
/// let client = create_s3_client(Some("http://localhost:9000"), "us-east-1").await;
/// ```
///
/// For AWS S3, pass `None` to use the default endpoint.
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    // S3-compatible services usually need path-style addressing
    let s3_config = if endpoint_url.is_some() {
        aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build()
    } else {
        aws_sdk_s3::config::Builder::from(&sdk_config).build()
    };

    Client::from_conf(s3_config)
}
