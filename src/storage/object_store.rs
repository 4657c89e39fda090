//! Object storage client for phonetic assets
//!
//! Talks to a Supabase-style storage REST API:
//! ```text
//! POST {base}/object/{bucket}/{key}          # upload (upsert)
//! GET  {base}/object/public/{bucket}/{key}   # public read URL
//! ```

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};

use super::key::StorageKey;

/// Characters left untouched in a key path segment
const KEY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Upload rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Upload failed: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Transport(err.to_string())
    }
}

/// Result of an upload operation
#[derive(Debug, Clone)]
pub struct UploadResult {
    pub key: StorageKey,
    /// Size in bytes
    pub size: u64,
    /// `bucket/key` path echoed by the storage service
    pub object_path: Option<String>,
    pub public_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "Key")]
    key: Option<String>,
}

/// Client bound to one bucket
#[derive(Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    bucket: String,
}

impl StorageClient {
    pub fn new(
        base_url: &str,
        token: &str,
        bucket: &str,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            bucket: bucket.to_string(),
        })
    }

    /// Get the bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn encoded(key: &StorageKey) -> String {
        utf8_percent_encode(key.as_str(), KEY_SEGMENT).to_string()
    }

    /// Endpoint that accepts uploads for `key`
    pub fn object_url(&self, key: &StorageKey) -> String {
        format!("{}/object/{}/{}", self.base_url, self.bucket, Self::encoded(key))
    }

    /// Deterministic public URL for `key`
    pub fn public_url(&self, key: &StorageKey) -> String {
        format!("{}/object/public/{}/{}", self.base_url, self.bucket, Self::encoded(key))
    }

    /// Upload bytes, replacing any object already stored under `key`
    #[instrument(skip(self, key, data), fields(bucket = %self.bucket, key = %key, size = data.len()))]
    pub async fn upload(
        &self,
        key: &StorageKey,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<UploadResult, StorageError> {
        let size = data.len() as u64;

        debug!("Uploading {} bytes to storage: {}", size, key);

        let response = self.http
            .post(self.object_url(key))
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(data)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status != reqwest::StatusCode::OK && status != reqwest::StatusCode::CREATED {
            return Err(StorageError::Rejected { status: status.as_u16(), body });
        }

        let object_path = serde_json::from_str::<UploadResponse>(&body)
            .ok()
            .and_then(|r| r.key);

        info!("Uploaded to storage: {} ({} bytes)", key, size);

        Ok(UploadResult {
            key: key.clone(),
            size,
            object_path,
            public_url: self.public_url(key),
        })
    }

    /// Upload a file from disk
    pub async fn upload_file(
        &self,
        key: &StorageKey,
        file_path: &Path,
        content_type: &str,
    ) -> Result<UploadResult, StorageError> {
        let data = tokio::fs::read(file_path).await?;
        self.upload(key, data, content_type).await
    }
}
