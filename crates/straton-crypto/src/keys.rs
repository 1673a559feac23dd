//! Identity key pairs: X25519 generation, import/export

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::KEY_SIZE;

/// The local identity's asymmetric key pair.
///
/// Exactly one active pair exists per device profile. The secret half only
/// leaves this process inside a recovery-wrapped envelope.
pub struct KeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh random key pair.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(rand::rngs::OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Rebuild a pair from a raw secret scalar, deriving the public half.
    pub fn from_secret_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Rebuild a pair from a recovered secret scalar and the public key
    /// export stored in the directory. The restore path keeps the stored
    /// public key rather than re-deriving it, so the restored identity is
    /// byte-identical to what peers already cached.
    pub fn from_parts(secret_bytes: [u8; KEY_SIZE], public_export: &str) -> Result<Self, CryptoError> {
        let public = decode_public_key(public_export)?;
        Ok(Self {
            secret: StaticSecret::from(secret_bytes),
            public,
        })
    }

    pub fn secret(&self) -> &StaticSecret {
        &self.secret
    }

    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    /// Base64 of the 32-byte public key, the form published to the directory.
    pub fn public_export(&self) -> String {
        encode_public_key(&self.public)
    }

    /// Serializable form of both halves, for local persistence and recovery
    /// wrapping only.
    pub fn export(&self) -> KeyPairExport {
        KeyPairExport {
            public_key: self.public_export(),
            secret_key: B64.encode(self.secret.to_bytes()),
        }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public_export())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Serialized key pair as stored in the local profile store.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyPairExport {
    pub public_key: String,
    pub secret_key: String,
}

impl KeyPairExport {
    /// Import back into live key handles.
    pub fn import(&self) -> Result<KeyPair, CryptoError> {
        let secret_bytes = decode_key_bytes(&self.secret_key, "secret key")?;
        let pair = KeyPair::from_secret_bytes(secret_bytes);
        // A stored export always carries the public half alongside; prefer
        // it over the re-derived one so imports are bit-stable.
        let public = decode_public_key(&self.public_key)?;
        Ok(KeyPair {
            secret: pair.secret,
            public,
        })
    }
}

impl std::fmt::Debug for KeyPairExport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPairExport")
            .field("public_key", &self.public_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Decode a base64 public key export into a live handle.
pub fn decode_public_key(b64: &str) -> Result<PublicKey, CryptoError> {
    let bytes = decode_key_bytes(b64, "public key")?;
    Ok(PublicKey::from(bytes))
}

/// Base64-encode a public key for storage/transmission.
pub fn encode_public_key(public: &PublicKey) -> String {
    B64.encode(public.as_bytes())
}

fn decode_key_bytes(b64: &str, what: &str) -> Result<[u8; KEY_SIZE], CryptoError> {
    let mut decoded = B64
        .decode(b64)
        .map_err(|e| CryptoError::InvalidKey(format!("{what}: {e}")))?;
    if decoded.len() != KEY_SIZE {
        decoded.zeroize();
        return Err(CryptoError::InvalidKey(format!(
            "{what}: {} bytes (expected {KEY_SIZE})",
            decoded.len()
        )));
    }
    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&decoded);
    decoded.zeroize();
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_distinct_pairs() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        assert_ne!(a.public_export(), b.public_export(), "random pairs must differ");
    }

    #[test]
    fn test_export_import_roundtrip() {
        let pair = KeyPair::generate();
        let export = pair.export();
        let imported = export.import().unwrap();

        assert_eq!(imported.public_export(), pair.public_export());
        assert_eq!(imported.secret().to_bytes(), pair.secret().to_bytes());
    }

    #[test]
    fn test_export_is_stable() {
        let pair = KeyPair::generate();
        let e1 = pair.export();
        let e2 = pair.export();
        assert_eq!(e1.public_key, e2.public_key);
        assert_eq!(e1.secret_key, e2.secret_key);
    }

    #[test]
    fn test_import_rejects_garbage() {
        let export = KeyPairExport {
            public_key: "not base64!!!".into(),
            secret_key: "also not".into(),
        };
        assert!(export.import().is_err());
    }

    #[test]
    fn test_import_rejects_wrong_length() {
        let export = KeyPairExport {
            public_key: B64.encode([1u8; 16]),
            secret_key: B64.encode([2u8; 16]),
        };
        match export.import() {
            Err(CryptoError::InvalidKey(_)) => {}
            other => panic!("expected InvalidKey, got {other:?}"),
        }
    }

    #[test]
    fn test_from_parts_keeps_stored_public() {
        let pair = KeyPair::generate();
        let other = KeyPair::generate();
        // Deliberately mismatched halves: the stored public wins.
        let rebuilt = KeyPair::from_parts(pair.secret().to_bytes(), &other.public_export()).unwrap();
        assert_eq!(rebuilt.public_export(), other.public_export());
    }

    #[test]
    fn test_export_serde_roundtrip() {
        let export = KeyPair::generate().export();
        let json = serde_json::to_string(&export).unwrap();
        let back: KeyPairExport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.public_key, export.public_key);
        assert_eq!(back.secret_key, export.secret_key);
    }
}
