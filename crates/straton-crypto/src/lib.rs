//! straton-crypto: client-side E2E encryption for Straton chat
//!
//! Key hierarchy:
//! ```text
//! Identity Key Pair (X25519, one per device profile)
//!   ├── Pairwise Key (per peer): X25519 ECDH → HKDF-SHA256 → AES-256-GCM
//!   │     ├── text payloads:  "<b64 iv>:<b64 ciphertext>"
//!   │     └── attachments:    [12-byte IV][ciphertext + 16-byte tag]
//!   └── Recovery Wrapping Key: PBKDF2-HMAC-SHA256(recovery secret, salt)
//!         └── wraps the secret-key export for the directory backup
//! ```
//!
//! This crate is pure computation: no I/O, no async. Session wiring and the
//! directory round-trips live in `straton-chat` and `straton-directory`.

pub mod cipher;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod payload;
pub mod recovery;

pub use cipher::{derive_pairwise, PairwiseCipher};
pub use error::CryptoError;
pub use kdf::{derive_wrapping_key, generate_recovery_secret, WrappingKey};
pub use keys::{decode_public_key, encode_public_key, KeyPair, KeyPairExport};
pub use payload::{image_marker, parse_body, parse_wire_text, MessageBody, WireText};
pub use recovery::{create_backup, open_backup, RecoveryBackup};

// The key-agreement types are part of this crate's API surface.
pub use x25519_dalek::{PublicKey, StaticSecret};

/// Size of a symmetric key and of an X25519 scalar (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM initialization vector (96-bit)
pub const IV_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of the PBKDF2 salt stored with a recovery backup
pub const SALT_SIZE: usize = 16;

/// PBKDF2-HMAC-SHA256 iteration count for new recovery backups. Restores
/// always use the count stored in the backup record, never this constant.
pub const PBKDF2_ITERATIONS: u32 = 310_000;

/// Separator between the IV and ciphertext segments of a text payload.
/// Base64 never contains it, so its absence marks legacy plaintext.
pub const WIRE_DELIMITER: char = ':';
