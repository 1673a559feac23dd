//! Key derivation: PBKDF2-HMAC-SHA256 recovery secret → wrapping key

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::{KEY_SIZE, SALT_SIZE};

/// A 256-bit symmetric key derived from a recovery secret.
///
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct WrappingKey {
    bytes: [u8; KEY_SIZE],
}

impl WrappingKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for WrappingKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for WrappingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrappingKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a fresh 256-bit recovery secret, rendered as 64 hex characters.
///
/// This is the only copy that will ever exist; it is shown to the user once
/// and never stored by the system.
pub fn generate_recovery_secret() -> SecretString {
    let mut entropy = [0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut entropy);
    let secret = SecretString::from(hex::encode(entropy));
    entropy.zeroize();
    secret
}

/// Derive the backup wrapping key from a recovery secret.
///
/// The salt is random per backup and stored alongside the ciphertext; the
/// iteration count is stored with it too, so restores reproduce the exact
/// derivation regardless of what the current default is.
pub fn derive_wrapping_key(
    secret: &SecretString,
    salt: &[u8; SALT_SIZE],
    iterations: u32,
) -> WrappingKey {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(secret.expose_secret().as_bytes(), salt, iterations, &mut key);
    WrappingKey::from_bytes(key)
}
