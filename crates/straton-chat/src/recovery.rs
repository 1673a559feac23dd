//! Recovery backup flows: one-time setup and restore-on-new-device
//!
//! Both flows suspend on user interaction; a [`CancellationToken`] lets the
//! caller abandon them deliberately instead of awaiting forever.

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use straton_core::types::KeyRecord;
use straton_core::{StratonError, StratonResult};
use straton_crypto::{create_backup, generate_recovery_secret, open_backup, KeyPair, RecoveryBackup};
use straton_directory::keys::BackupFields;
use straton_directory::KeyDirectory;

use crate::prompt::RecoveryPrompt;
use crate::session::CryptoIdentitySession;

/// Make sure this identity has a recovery backup, running the one-time
/// interactive setup if it does not.
///
/// Returns `true` if a backup was created now, `false` if one already
/// existed. The flow is not retried within a session: on failure or cancel
/// the directory flag stays false and the next session start asks again.
pub async fn ensure_recovery_backup<P: RecoveryPrompt>(
    session: &CryptoIdentitySession,
    prompt: &P,
    cancel: &CancellationToken,
) -> StratonResult<bool> {
    let existing = session
        .directory()
        .get_key_record(session.user_id())
        .await?;
    if existing.is_some_and(|r| r.has_recovery_backup) {
        return Ok(false);
    }

    // The only copy of the secret that will ever exist. Shown once; the
    // confirmation below is a hard gate before anything is persisted.
    let secret = generate_recovery_secret();

    let confirmed = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(StratonError::RecoveryCancelled),
        confirmed = prompt.confirm_secret_saved(&secret) => confirmed?,
    };
    if !confirmed {
        return Err(StratonError::RecoveryCancelled);
    }

    let backup = create_backup(&secret, session.key_pair())
        .map_err(|e| StratonError::Crypto(format!("creating recovery backup: {e}")))?;

    session
        .directory()
        .update_recovery_backup(
            session.user_id(),
            BackupFields {
                encrypted_secret_key: B64.encode(&backup.ciphertext),
                kdf_salt: B64.encode(backup.salt),
                wrap_iv: B64.encode(backup.iv),
                kdf_iterations: backup.iterations,
            },
        )
        .await?;

    info!(user_id = session.user_id(), "recovery backup created");
    Ok(true)
}

/// Restore a key pair from a directory record carrying a backup.
///
/// `Ok(None)` means the user cancelled (or the caller's token fired) and
/// restoration was abandoned. A wrong secret or corrupt backup is
/// [`StratonError::RecoveryInvalid`]; the caller falls through to fresh
/// generation and warns that old history stays unreadable.
pub async fn restore_from_record<P: RecoveryPrompt>(
    record: &KeyRecord,
    prompt: &P,
    cancel: &CancellationToken,
) -> StratonResult<Option<KeyPair>> {
    let backup = backup_from_record(record)?;

    let secret = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!("recovery entry abandoned by caller");
            return Ok(None);
        }
        secret = prompt.request_secret() => match secret? {
            Some(secret) => secret,
            None => return Ok(None),
        },
    };

    match open_backup(&secret, &backup, &record.public_key) {
        Ok(pair) => Ok(Some(pair)),
        Err(e) => Err(StratonError::RecoveryInvalid(e.to_string())),
    }
}

fn backup_from_record(record: &KeyRecord) -> StratonResult<RecoveryBackup> {
    let (Some(ct_b64), Some(salt_b64), Some(iv_b64), Some(iterations)) = (
        record.encrypted_secret_key.as_deref(),
        record.kdf_salt.as_deref(),
        record.wrap_iv.as_deref(),
        record.kdf_iterations,
    ) else {
        return Err(StratonError::RecoveryInvalid(
            "backup record incomplete".into(),
        ));
    };

    let ciphertext = B64
        .decode(ct_b64)
        .map_err(|e| StratonError::RecoveryInvalid(format!("ciphertext: {e}")))?;
    let salt: [u8; straton_crypto::SALT_SIZE] = B64
        .decode(salt_b64)
        .map_err(|e| StratonError::RecoveryInvalid(format!("salt: {e}")))?
        .try_into()
        .map_err(|_| StratonError::RecoveryInvalid("salt has wrong length".into()))?;
    let iv: [u8; straton_crypto::IV_SIZE] = B64
        .decode(iv_b64)
        .map_err(|e| StratonError::RecoveryInvalid(format!("iv: {e}")))?
        .try_into()
        .map_err(|_| StratonError::RecoveryInvalid("iv has wrong length".into()))?;

    Ok(RecoveryBackup {
        ciphertext,
        salt,
        iv,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompt;

    #[tokio::test]
    async fn test_restore_incomplete_record_is_invalid() {
        let record = KeyRecord {
            user_id: "alice".into(),
            public_key: "cGs=".into(),
            has_recovery_backup: true,
            ..Default::default()
        };
        let prompt = ScriptedPrompt::replying_with("00".repeat(32).as_str());
        let result = restore_from_record(&record, &prompt, &CancellationToken::new()).await;

        assert!(matches!(result, Err(StratonError::RecoveryInvalid(_))));
    }

    #[tokio::test]
    async fn test_restore_cancelled_token_abandons() {
        let pair = KeyPair::generate();
        let secret = generate_recovery_secret();
        let backup = create_backup(&secret, &pair).unwrap();
        let record = KeyRecord {
            user_id: "alice".into(),
            public_key: pair.public_export(),
            encrypted_secret_key: Some(B64.encode(&backup.ciphertext)),
            kdf_salt: Some(B64.encode(backup.salt)),
            wrap_iv: Some(B64.encode(backup.iv)),
            kdf_iterations: Some(backup.iterations),
            has_recovery_backup: true,
        };

        let token = CancellationToken::new();
        token.cancel();
        let prompt = ScriptedPrompt::replying_with("irrelevant");
        let result = restore_from_record(&record, &prompt, &token).await.unwrap();

        assert!(result.is_none(), "cancelled token must abandon restore");
    }
}
