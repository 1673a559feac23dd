//! Identity session: key startup, publishing, and the per-peer cipher cache

use std::collections::HashMap;
use std::sync::RwLock;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use straton_core::{StratonError, StratonResult};
use straton_crypto::{
    decode_public_key, derive_pairwise, KeyPair, KeyPairExport, PairwiseCipher, PublicKey,
};
use straton_directory::local::KEY_PAIR_ITEM;
use straton_directory::{KeyDirectory, LocalStore};

use crate::prompt::RecoveryPrompt;
use crate::recovery::restore_from_record;

/// Where the session's key pair came from on this start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Deserialized from the local profile store (the normal fast path)
    Local,
    /// Restored from the recovery backup
    Restored,
    /// Freshly generated
    Generated,
}

/// The one crypto identity of a running client.
///
/// Constructed once at startup via [`init_crypto_identity`] and shared with
/// everything that encrypts or decrypts. The peer-key cache is append-only
/// and lives for the session: concurrent first fetches for the same peer at
/// worst duplicate a directory read, never corrupt state.
pub struct CryptoIdentitySession {
    user_id: String,
    key_pair: KeyPair,
    key_source: KeySource,
    directory: KeyDirectory,
    peer_keys: RwLock<HashMap<String, PublicKey>>,
}

/// Load the local key pair, or restore it from backup, or generate fresh,
/// in that priority order.
///
/// Local-store corruption is never fatal: it logs and falls through, so a
/// broken cache cannot lock the user out of a working identity.
pub async fn load_or_create_key_pair<P: RecoveryPrompt>(
    user_id: &str,
    local: &mut LocalStore,
    directory: &KeyDirectory,
    prompt: &P,
    cancel: &CancellationToken,
) -> StratonResult<(KeyPair, KeySource)> {
    // 1. Local fast path.
    if let Some(raw) = local.get_item(KEY_PAIR_ITEM) {
        match serde_json::from_str::<KeyPairExport>(raw) {
            Ok(export) => match export.import() {
                Ok(pair) => return Ok((pair, KeySource::Local)),
                Err(e) => warn!(error = %e, "stored key pair unusable, falling back"),
            },
            Err(e) => warn!(error = %e, "stored key pair unparseable, falling back"),
        }
    }

    // 2. Restore from backup, if one exists.
    let record = directory.get_key_record(user_id).await?;
    let had_backup = record.as_ref().is_some_and(|r| r.has_recovery_backup);
    if let Some(record) = record.filter(|r| r.has_recovery_backup) {
        match restore_from_record(&record, prompt, cancel).await {
            Ok(Some(pair)) => {
                persist_key_pair(local, &pair)?;
                info!(user_id, "key pair restored from recovery backup");
                return Ok((pair, KeySource::Restored));
            }
            Ok(None) => {
                warn!(user_id, "recovery declined; encrypted history will stay unreadable");
            }
            Err(e) => {
                warn!(user_id, error = %e, "recovery failed; encrypted history will stay unreadable");
            }
        }
    }

    // 3. Fresh identity.
    let pair = KeyPair::generate();
    persist_key_pair(local, &pair)?;
    if had_backup {
        // The existing backup wraps the old key and cannot be reissued
        // without the user recording a new secret.
        warn!(user_id, "generated a new key pair; the existing recovery backup is now stale");
    }
    info!(user_id, "generated fresh key pair");
    Ok((pair, KeySource::Generated))
}

fn persist_key_pair(local: &mut LocalStore, pair: &KeyPair) -> StratonResult<()> {
    let json = serde_json::to_string(&pair.export())
        .map_err(|e| StratonError::LocalStore(format!("serializing key pair: {e}")))?;
    local.set_item(KEY_PAIR_ITEM, json)
}

/// Run identity startup and publish the public key.
///
/// A failed publish is logged and non-fatal: this device can still encrypt
/// and decrypt with cached peers, and the publish is retried on the next
/// session start (not in-session).
pub async fn init_crypto_identity<P: RecoveryPrompt>(
    user_id: &str,
    local: &mut LocalStore,
    directory: KeyDirectory,
    prompt: &P,
    cancel: &CancellationToken,
) -> StratonResult<CryptoIdentitySession> {
    let (key_pair, key_source) =
        load_or_create_key_pair(user_id, local, &directory, prompt, cancel).await?;

    if let Err(e) = directory
        .upsert_public_key(user_id, &key_pair.public_export())
        .await
    {
        warn!(user_id, error = %e, "public key publish failed; peers cannot reach this identity until it succeeds");
    }

    Ok(CryptoIdentitySession {
        user_id: user_id.to_string(),
        key_pair,
        key_source,
        directory,
        peer_keys: RwLock::new(HashMap::new()),
    })
}

impl CryptoIdentitySession {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn key_source(&self) -> KeySource {
        self.key_source
    }

    pub fn public_export(&self) -> String {
        self.key_pair.public_export()
    }

    pub(crate) fn directory(&self) -> &KeyDirectory {
        &self.directory
    }

    /// Derive the shared cipher for a peer, fetching and caching their
    /// public key on first use.
    ///
    /// A peer without a published key is [`StratonError::PeerNotInitialized`],
    /// a user-explainable condition rather than a bug.
    pub async fn pairwise(&self, peer_id: &str) -> StratonResult<PairwiseCipher> {
        let cached = self.peer_keys.read().unwrap().get(peer_id).copied();
        let peer_public = match cached {
            Some(public) => public,
            None => {
                let record = self.directory.get_key_record(peer_id).await?;
                let export = record
                    .filter(|r| !r.public_key.is_empty())
                    .map(|r| r.public_key)
                    .ok_or_else(|| StratonError::PeerNotInitialized(peer_id.to_string()))?;
                let public = decode_public_key(&export)
                    .map_err(|e| StratonError::Crypto(format!("peer {peer_id}: {e}")))?;
                self.peer_keys
                    .write()
                    .unwrap()
                    .insert(peer_id.to_string(), public);
                public
            }
        };

        derive_pairwise(self.key_pair.secret(), &peer_public)
            .map_err(|e| StratonError::Crypto(format!("deriving key for {peer_id}: {e}")))
    }
}
