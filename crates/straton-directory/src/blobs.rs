//! Blob store for encrypted attachments
//!
//! Paths are chosen by the caller; bytes are opaque. Encryption happens
//! before upload and after download, never here.

use opendal::Operator;
use straton_core::{StratonError, StratonResult};

#[derive(Clone)]
pub struct BlobStore {
    op: Operator,
}

impl BlobStore {
    pub fn new(op: Operator) -> Self {
        Self { op }
    }

    pub async fn upload(&self, path: &str, bytes: Vec<u8>) -> StratonResult<()> {
        self.op
            .write(path, bytes)
            .await
            .map_err(|e| StratonError::Storage(format!("uploading {path}: {e}")))?;
        Ok(())
    }

    pub async fn download(&self, path: &str) -> StratonResult<Vec<u8>> {
        let data = self
            .op
            .read(path)
            .await
            .map_err(|e| StratonError::Storage(format!("downloading {path}: {e}")))?;
        Ok(data.to_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::memory_operator;

    #[tokio::test]
    async fn test_upload_download_roundtrip() {
        let blobs = BlobStore::new(memory_operator());
        let data = vec![1u8, 2, 3, 4, 5];

        blobs.upload("attachments/a/b/123-x", data.clone()).await.unwrap();
        assert_eq!(blobs.download("attachments/a/b/123-x").await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_download_missing_is_error() {
        let blobs = BlobStore::new(memory_operator());
        assert!(blobs.download("attachments/missing").await.is_err());
    }
}
