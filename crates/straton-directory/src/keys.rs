//! Key directory: one JSON object per user at `keys/{user_id}.json`
//!
//! The public key has overwrite semantics (last writer wins, no versioning).
//! Recovery backup fields are written once, together with the flag, and
//! preserved by later public-key upserts.

use opendal::Operator;
use straton_core::types::KeyRecord;
use straton_core::{StratonError, StratonResult};
use tracing::debug;

const KEYS_PREFIX: &str = "keys";

/// Serialized backup fields as handed to [`KeyDirectory::update_recovery_backup`].
/// All segments are already base64-encoded by the caller.
#[derive(Debug, Clone)]
pub struct BackupFields {
    pub encrypted_secret_key: String,
    pub kdf_salt: String,
    pub wrap_iv: String,
    pub kdf_iterations: u32,
}

#[derive(Clone)]
pub struct KeyDirectory {
    op: Operator,
}

impl KeyDirectory {
    pub fn new(op: Operator) -> Self {
        Self { op }
    }

    fn record_path(user_id: &str) -> String {
        format!("{KEYS_PREFIX}/{user_id}.json")
    }

    /// Fetch a user's key record. `None` means the user has never
    /// initialized encryption.
    pub async fn get_key_record(&self, user_id: &str) -> StratonResult<Option<KeyRecord>> {
        let path = Self::record_path(user_id);
        match self.op.read(&path).await {
            Ok(data) => {
                let record = serde_json::from_slice(&data.to_bytes())
                    .map_err(|e| StratonError::Directory(format!("parsing {path}: {e}")))?;
                Ok(Some(record))
            }
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StratonError::Directory(format!("reading {path}: {e}"))),
        }
    }

    /// Publish (or overwrite) a user's public key, preserving any existing
    /// backup fields on the record.
    pub async fn upsert_public_key(&self, user_id: &str, public_key: &str) -> StratonResult<()> {
        let mut record = self
            .get_key_record(user_id)
            .await?
            .unwrap_or_else(|| KeyRecord {
                user_id: user_id.to_string(),
                ..Default::default()
            });
        record.public_key = public_key.to_string();
        self.write_record(&record).await?;
        debug!(user_id, "published public key");
        Ok(())
    }

    /// Attach a recovery backup to a user's record. Sets the data and the
    /// `has_recovery_backup` flag in a single object write.
    pub async fn update_recovery_backup(
        &self,
        user_id: &str,
        backup: BackupFields,
    ) -> StratonResult<()> {
        let mut record = self
            .get_key_record(user_id)
            .await?
            .unwrap_or_else(|| KeyRecord {
                user_id: user_id.to_string(),
                ..Default::default()
            });
        record.encrypted_secret_key = Some(backup.encrypted_secret_key);
        record.kdf_salt = Some(backup.kdf_salt);
        record.wrap_iv = Some(backup.wrap_iv);
        record.kdf_iterations = Some(backup.kdf_iterations);
        record.has_recovery_backup = true;
        self.write_record(&record).await?;
        debug!(user_id, "stored recovery backup");
        Ok(())
    }

    async fn write_record(&self, record: &KeyRecord) -> StratonResult<()> {
        let path = Self::record_path(&record.user_id);
        let json = serde_json::to_vec(record)
            .map_err(|e| StratonError::Directory(format!("serializing {path}: {e}")))?;
        self.op
            .write(&path, json)
            .await
            .map_err(|e| StratonError::Directory(format!("writing {path}: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::memory_operator;

    #[tokio::test]
    async fn test_get_missing_record_is_none() {
        let dir = KeyDirectory::new(memory_operator());
        assert!(dir.get_key_record("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_then_get() {
        let dir = KeyDirectory::new(memory_operator());
        dir.upsert_public_key("alice", "cHViLWtleQ==").await.unwrap();

        let record = dir.get_key_record("alice").await.unwrap().unwrap();
        assert_eq!(record.user_id, "alice");
        assert_eq!(record.public_key, "cHViLWtleQ==");
        assert!(!record.has_recovery_backup);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_public_key() {
        let dir = KeyDirectory::new(memory_operator());
        dir.upsert_public_key("alice", "b2xk").await.unwrap();
        dir.upsert_public_key("alice", "bmV3").await.unwrap();

        let record = dir.get_key_record("alice").await.unwrap().unwrap();
        assert_eq!(record.public_key, "bmV3", "last writer wins");
    }

    #[tokio::test]
    async fn test_backup_fields_survive_public_key_upsert() {
        let dir = KeyDirectory::new(memory_operator());
        dir.upsert_public_key("alice", "b2xk").await.unwrap();
        dir.update_recovery_backup(
            "alice",
            BackupFields {
                encrypted_secret_key: "Y2lwaGVy".into(),
                kdf_salt: "c2FsdA==".into(),
                wrap_iv: "aXY=".into(),
                kdf_iterations: 310_000,
            },
        )
        .await
        .unwrap();

        // Re-publishing the public key must not drop the backup.
        dir.upsert_public_key("alice", "bmV3").await.unwrap();

        let record = dir.get_key_record("alice").await.unwrap().unwrap();
        assert!(record.has_recovery_backup);
        assert_eq!(record.encrypted_secret_key.as_deref(), Some("Y2lwaGVy"));
        assert_eq!(record.kdf_iterations, Some(310_000));
        assert_eq!(record.public_key, "bmV3");
    }

    #[tokio::test]
    async fn test_backup_on_fresh_record() {
        let dir = KeyDirectory::new(memory_operator());
        dir.update_recovery_backup(
            "bob",
            BackupFields {
                encrypted_secret_key: "Y3Q=".into(),
                kdf_salt: "cw==".into(),
                wrap_iv: "aXY=".into(),
                kdf_iterations: 310_000,
            },
        )
        .await
        .unwrap();

        let record = dir.get_key_record("bob").await.unwrap().unwrap();
        assert!(record.has_recovery_backup);
        assert!(record.public_key.is_empty());
    }
}
