//! Pairwise AES-256-GCM cipher derived from X25519 key agreement
//!
//! Text payload format: `"<b64 iv>:<b64 ciphertext>"`
//! Binary payload format: `[12-byte IV][ciphertext + 16-byte tag]`
//!
//! The key is re-derived on demand from (my secret, peer public) and never
//! persisted, so it rotates automatically when either party regenerates
//! their identity.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::payload::{encode_wire_text, parse_wire_text, WireText};
use crate::{IV_SIZE, KEY_SIZE, TAG_SIZE};

/// HKDF domain separator for pairwise message keys.
const PAIRWISE_INFO: &[u8] = b"straton-pairwise-v1";

/// A symmetric key shared with exactly one peer.
///
/// Both sides derive the identical key: X25519 produces the same shared
/// secret from (a_secret, b_public) and (b_secret, a_public), and the HKDF
/// step uses a fixed info string.
pub struct PairwiseCipher {
    key: [u8; KEY_SIZE],
}

/// Run the key agreement and derive the AEAD key.
pub fn derive_pairwise(
    secret: &StaticSecret,
    peer_public: &PublicKey,
) -> Result<PairwiseCipher, CryptoError> {
    let shared = secret.diffie_hellman(peer_public);

    let hkdf = Hkdf::<Sha256>::new(None, shared.as_bytes());
    let mut key = [0u8; KEY_SIZE];
    hkdf.expand(PAIRWISE_INFO, &mut key)
        .map_err(|e| CryptoError::Encrypt(format!("HKDF expand: {e}")))?;

    Ok(PairwiseCipher { key })
}

impl PairwiseCipher {
    fn aead(&self) -> Aes256Gcm {
        Aes256Gcm::new((&self.key).into())
    }

    /// Encrypt a text payload into the `"<b64 iv>:<b64 ciphertext>"` form.
    pub fn encrypt_text(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut iv = [0u8; IV_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);
        let nonce = Nonce::from_slice(&iv);

        let ciphertext = self
            .aead()
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::Encrypt(format!("text payload: {e}")))?;

        Ok(encode_wire_text(&iv, &ciphertext))
    }

    /// Decrypt a text payload.
    ///
    /// A payload without the delimiter is legacy plaintext and is returned
    /// unchanged. Every failure path (bad encoding, wrong key, tampered
    /// data, non-UTF-8 plaintext) is [`CryptoError::Undisplayable`]; the
    /// caller suppresses the message rather than rendering anything.
    pub fn decrypt_text(&self, payload: &str) -> Result<String, CryptoError> {
        match parse_wire_text(payload)? {
            WireText::Legacy(plain) => Ok(plain),
            WireText::Sealed { iv, ciphertext } => {
                let nonce = Nonce::from_slice(&iv);
                let plaintext = self
                    .aead()
                    .decrypt(nonce, ciphertext.as_ref())
                    .map_err(|_| CryptoError::Undisplayable)?;
                String::from_utf8(plaintext).map_err(|_| CryptoError::Undisplayable)
            }
        }
    }

    /// Encrypt raw attachment bytes: `[12-byte IV][ciphertext + tag]`.
    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut iv = [0u8; IV_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);
        let nonce = Nonce::from_slice(&iv);

        let ciphertext = self
            .aead()
            .encrypt(nonce, plaintext)
            .map_err(|e| CryptoError::Encrypt(format!("binary payload: {e}")))?;

        let mut out = Vec::with_capacity(IV_SIZE + ciphertext.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt an attachment buffer produced by [`Self::encrypt_bytes`].
    pub fn decrypt_bytes(&self, encrypted: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if encrypted.len() < IV_SIZE + TAG_SIZE {
            return Err(CryptoError::Undisplayable);
        }

        let (iv, ciphertext) = encrypted.split_at(IV_SIZE);
        let nonce = Nonce::from_slice(iv);

        self.aead()
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::Undisplayable)
    }
}

impl Drop for PairwiseCipher {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for PairwiseCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairwiseCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;

    fn pair_of_ciphers() -> (PairwiseCipher, PairwiseCipher) {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        let ab = derive_pairwise(a.secret(), b.public()).unwrap();
        let ba = derive_pairwise(b.secret(), a.public()).unwrap();
        (ab, ba)
    }

    #[test]
    fn test_both_sides_derive_same_key() {
        let (ab, ba) = pair_of_ciphers();
        assert_eq!(ab.key, ba.key, "key agreement must be symmetric");
    }

    #[test]
    fn test_text_roundtrip_across_sides() {
        let (ab, ba) = pair_of_ciphers();

        let wire = ab.encrypt_text("hello").unwrap();
        assert_ne!(wire, "hello");
        assert!(wire.contains(':'));

        assert_eq!(ba.decrypt_text(&wire).unwrap(), "hello");
    }

    #[test]
    fn test_text_roundtrip_unicode_and_empty() {
        let (ab, _) = pair_of_ciphers();

        for msg in ["", "grüße aus zürich 🌍", "a:b:c", "\0\u{1F512}"] {
            let wire = ab.encrypt_text(msg).unwrap();
            assert_eq!(ab.decrypt_text(&wire).unwrap(), msg);
        }
    }

    #[test]
    fn test_legacy_passthrough() {
        let (ab, _) = pair_of_ciphers();
        assert_eq!(ab.decrypt_text("plain old message").unwrap(), "plain old message");
        assert_eq!(ab.decrypt_text("").unwrap(), "");
    }

    #[test]
    fn test_tampered_ciphertext_segment() {
        let (ab, _) = pair_of_ciphers();
        let wire = ab.encrypt_text("secret").unwrap();

        let (iv_b64, ct_b64) = wire.split_once(':').unwrap();
        let mut ct = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, ct_b64).unwrap();
        ct[0] ^= 0x01;
        let tampered = crate::payload::encode_wire_text(
            &base64::Engine::decode(&base64::engine::general_purpose::STANDARD, iv_b64).unwrap(),
            &ct,
        );

        assert_eq!(ab.decrypt_text(&tampered), Err(CryptoError::Undisplayable));
    }

    #[test]
    fn test_tampered_iv_segment() {
        let (ab, _) = pair_of_ciphers();
        let wire = ab.encrypt_text("secret").unwrap();

        let (iv_b64, ct_b64) = wire.split_once(':').unwrap();
        let mut iv = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, iv_b64).unwrap();
        iv[0] ^= 0x01;
        let tampered = crate::payload::encode_wire_text(
            &iv,
            &base64::Engine::decode(&base64::engine::general_purpose::STANDARD, ct_b64).unwrap(),
        );

        assert_eq!(ab.decrypt_text(&tampered), Err(CryptoError::Undisplayable));
    }

    #[test]
    fn test_cross_key_isolation() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        let c = KeyPair::generate();

        let for_b = derive_pairwise(a.secret(), b.public()).unwrap();
        let with_c = derive_pairwise(a.secret(), c.public()).unwrap();

        let wire = for_b.encrypt_text("for bob only").unwrap();
        assert_eq!(with_c.decrypt_text(&wire), Err(CryptoError::Undisplayable));
    }

    #[test]
    fn test_attacker_payload_does_not_panic() {
        let (ab, _) = pair_of_ciphers();
        assert_eq!(ab.decrypt_text("AAAA:BBBB"), Err(CryptoError::Undisplayable));
    }

    #[test]
    fn test_bytes_roundtrip() {
        let (ab, ba) = pair_of_ciphers();
        let data = vec![0xA5u8; 4096];

        let enc = ab.encrypt_bytes(&data).unwrap();
        assert_eq!(enc.len(), IV_SIZE + data.len() + TAG_SIZE);
        assert_eq!(ba.decrypt_bytes(&enc).unwrap(), data);
    }

    #[test]
    fn test_bytes_empty_roundtrip() {
        let (ab, _) = pair_of_ciphers();
        let enc = ab.encrypt_bytes(b"").unwrap();
        assert_eq!(ab.decrypt_bytes(&enc).unwrap(), b"");
    }

    #[test]
    fn test_bytes_too_short_is_undisplayable() {
        let (ab, _) = pair_of_ciphers();
        assert_eq!(ab.decrypt_bytes(&[0u8; 5]), Err(CryptoError::Undisplayable));
    }

    #[test]
    fn test_bytes_tampered_fails() {
        let (ab, _) = pair_of_ciphers();
        let mut enc = ab.encrypt_bytes(b"attachment data").unwrap();
        let last = enc.len() - 1;
        enc[last] ^= 0xFF;
        assert_eq!(ab.decrypt_bytes(&enc), Err(CryptoError::Undisplayable));
    }

    #[test]
    fn test_fresh_iv_per_encryption() {
        let (ab, _) = pair_of_ciphers();
        let w1 = ab.encrypt_text("same plaintext").unwrap();
        let w2 = ab.encrypt_text("same plaintext").unwrap();
        assert_ne!(w1, w2, "every encryption must use a fresh IV");
    }
}
