use serde::{Deserialize, Serialize};

/// A stored chat message row. The `text` field only ever holds ciphertext
/// (or legacy plaintext written before encryption was rolled out).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// UUID v4, assigned by the sender
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    /// Wire payload: `"<b64 iv>:<b64 ciphertext>"`, or legacy plaintext
    pub text: String,
    /// Unix timestamp in milliseconds
    pub created_at: u64,
}

/// The per-user row in the key directory.
///
/// The public key is overwritten whenever a user re-initializes their
/// identity (last writer wins). The backup fields are written exactly once,
/// together with the `has_recovery_backup` flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyRecord {
    pub user_id: String,
    /// Base64 of the 32-byte X25519 public key
    pub public_key: String,
    /// Base64 AEAD ciphertext of the secret-key export
    #[serde(default)]
    pub encrypted_secret_key: Option<String>,
    /// Base64 of the 16-byte PBKDF2 salt
    #[serde(default)]
    pub kdf_salt: Option<String>,
    /// Base64 of the 12-byte wrapping IV
    #[serde(default)]
    pub wrap_iv: Option<String>,
    #[serde(default)]
    pub kdf_iterations: Option<u32>,
    #[serde(default)]
    pub has_recovery_backup: bool,
}

/// Stable key for a 1:1 conversation: the two user ids, sorted and joined.
/// Both participants compute the same key regardless of direction.
pub fn conversation_key(a: &str, b: &str) -> String {
    let mut pair = [a, b];
    pair.sort_unstable();
    format!("{}-{}", pair[0], pair[1])
}
