//! Recovery backup: wrap the secret-key export under a recovery secret
//!
//! The backup is created once per identity and never rotated. Server-side
//! only the ciphertext, salt, IV, and iteration count exist; the recovery
//! secret itself is held by the user alone.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use secrecy::SecretString;
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::kdf::derive_wrapping_key;
use crate::keys::KeyPair;
use crate::{IV_SIZE, KEY_SIZE, PBKDF2_ITERATIONS, SALT_SIZE};

/// The encrypted private-key envelope stored in the key directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryBackup {
    /// AES-256-GCM ciphertext of the 32-byte secret scalar (tag appended)
    pub ciphertext: Vec<u8>,
    pub salt: [u8; SALT_SIZE],
    pub iv: [u8; IV_SIZE],
    pub iterations: u32,
}

/// Wrap a key pair's secret half under a recovery secret.
///
/// Salt and IV are freshly random; the current iteration count is recorded
/// in the backup so future restores derive the same wrapping key.
pub fn create_backup(secret: &SecretString, pair: &KeyPair) -> Result<RecoveryBackup, CryptoError> {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    let wrapping = derive_wrapping_key(secret, &salt, PBKDF2_ITERATIONS);

    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);
    let nonce = Nonce::from_slice(&iv);

    let cipher = Aes256Gcm::new(wrapping.as_bytes().into());
    let mut secret_bytes = pair.secret().to_bytes();
    let ciphertext = cipher
        .encrypt(nonce, secret_bytes.as_ref())
        .map_err(|e| CryptoError::Encrypt(format!("recovery wrapping: {e}")))?;
    secret_bytes.zeroize();

    Ok(RecoveryBackup {
        ciphertext,
        salt,
        iv,
        iterations: PBKDF2_ITERATIONS,
    })
}

/// Unwrap a backup with a user-supplied recovery secret and rebuild the key
/// pair, taking the public half from the stored directory export.
///
/// A wrong secret fails GCM authentication and surfaces as
/// [`CryptoError::WrongRecoverySecret`]; it can never "succeed" with
/// garbage key material.
pub fn open_backup(
    secret: &SecretString,
    backup: &RecoveryBackup,
    public_export: &str,
) -> Result<KeyPair, CryptoError> {
    let wrapping = derive_wrapping_key(secret, &backup.salt, backup.iterations);
    let nonce = Nonce::from_slice(&backup.iv);
    let cipher = Aes256Gcm::new(wrapping.as_bytes().into());

    let mut plaintext = cipher
        .decrypt(nonce, backup.ciphertext.as_ref())
        .map_err(|_| CryptoError::WrongRecoverySecret)?;

    if plaintext.len() != KEY_SIZE {
        plaintext.zeroize();
        return Err(CryptoError::WrongRecoverySecret);
    }

    let mut secret_bytes = [0u8; KEY_SIZE];
    secret_bytes.copy_from_slice(&plaintext);
    plaintext.zeroize();

    let pair = KeyPair::from_parts(secret_bytes, public_export)?;
    secret_bytes.zeroize();
    Ok(pair)
}
