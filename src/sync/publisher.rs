//! Publishing staged files to object storage

use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

use crate::storage::{StorageClient, StorageError, StorageKey};

/// Uploads a local file under `key`, returning its public URL
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        local_path: &Path,
        key: &StorageKey,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

#[async_trait]
impl Publisher for StorageClient {
    async fn publish(
        &self,
        local_path: &Path,
        key: &StorageKey,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let result = self.upload_file(key, local_path, content_type).await?;
        debug!(
            key = %result.key,
            size = result.size,
            object_path = ?result.object_path,
            "Storage acknowledged upload"
        );
        Ok(result.public_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubResponse, StubServer};
    use std::time::Duration;

    #[tokio::test]
    async fn test_publish_reads_file_and_returns_public_url() {
        let server = StubServer::start(vec![StubResponse::new(200, "{}")]);
        let client = StorageClient::new(
            &server.base_url,
            "token",
            "phonetics-images",
            Duration::from_secs(5),
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("mouth_e.png");
        std::fs::write(&local, vec![3u8; 64]).unwrap();

        let key = StorageKey::basename(&local).unwrap();
        let url = client.publish(&local, &key, "image/png").await.unwrap();

        assert_eq!(
            url,
            format!("{}/object/public/phonetics-images/mouth_e.png", server.base_url)
        );
        let request = server.next_request().unwrap();
        assert_eq!(request.body, vec![3u8; 64]);
        assert_eq!(request.header("content-type"), Some("image/png"));

        // Publishing never removes the source
        assert!(local.exists());
    }

    #[tokio::test]
    async fn test_republish_same_key_yields_same_url() {
        let server = StubServer::start(vec![
            StubResponse::new(200, "{}"),
            StubResponse::new(200, "{}"),
        ]);
        let client = StorageClient::new(
            &server.base_url,
            "token",
            "phonetics-audio",
            Duration::from_secs(5),
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("clip.ogg");
        std::fs::write(&local, vec![1u8; 1200]).unwrap();
        let key = StorageKey::derived("Voiceless_bilabial_plosive.ogg", "/p/", "ogg");

        let first = client.publish(&local, &key, "audio/ogg").await.unwrap();
        let second = client.publish(&local, &key, "audio/ogg").await.unwrap();
        assert_eq!(first, second);

        for _ in 0..2 {
            let request = server.next_request().unwrap();
            assert_eq!(request.header("x-upsert"), Some("true"));
        }
    }
}
