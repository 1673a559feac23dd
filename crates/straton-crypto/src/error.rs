use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Key material failed to decode or had the wrong length.
    #[error("malformed key material: {0}")]
    InvalidKey(String),

    /// A payload failed decryption or decoding. Callers must suppress the
    /// message entirely and never render ciphertext, an error string, or
    /// partial output in its place.
    #[error("payload cannot be displayed")]
    Undisplayable,

    /// The supplied recovery secret did not authenticate the backup, or the
    /// backup data is corrupt. The caller falls through to fresh key
    /// generation; old history stays unreadable.
    #[error("recovery secret does not match this backup")]
    WrongRecoverySecret,

    #[error("encryption failed: {0}")]
    Encrypt(String),
}
