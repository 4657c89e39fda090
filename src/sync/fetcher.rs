//! Source asset download
//!
//! A download only counts when the host answers 200 with a body larger than
//! the configured threshold; anything smaller is almost always an HTML error
//! page or a redirect stub. The destination file is only touched on success.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors that can occur while fetching a source asset
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("Body too small ({len} bytes, need more than {min})")]
    TooSmall { len: usize, min: usize },

    #[error("HTTP error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

/// Downloads a URL to a local path, returning the number of bytes written
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}

/// Fetcher backed by a reqwest client
pub struct HttpFetcher {
    http: reqwest::Client,
    min_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        min_body_bytes: usize,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { http, min_body_bytes })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self, dest), fields(dest = %dest.display()))]
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let response = self.http.get(url).send().await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let data = response.bytes().await?;
        if data.len() <= self.min_body_bytes {
            return Err(FetchError::TooSmall { len: data.len(), min: self.min_body_bytes });
        }

        write_replacing(dest, &data).await?;
        debug!("Fetched {} bytes from {}", data.len(), url);

        Ok(data.len() as u64)
    }
}

/// Write through a sibling `.part` file so a failed write never leaves a
/// truncated file at `dest`
pub async fn write_replacing(dest: &Path, data: &[u8]) -> std::io::Result<()> {
    let partial = partial_path(dest);

    if let Err(e) = tokio::fs::write(&partial, data).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }

    if let Err(e) = tokio::fs::rename(&partial, dest).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }

    Ok(())
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
