use thiserror::Error;

pub type StratonResult<T> = Result<T, StratonError>;

#[derive(Debug, Error)]
pub enum StratonError {
    /// The peer has never published a public key, so no shared key can be
    /// derived. Recoverable and user-explainable, not a bug.
    #[error("encryption is not initialized for contact {0}")]
    PeerNotInitialized(String),

    /// The user explicitly cancelled an interactive recovery step.
    #[error("recovery cancelled")]
    RecoveryCancelled,

    /// The supplied recovery secret did not authenticate the backup.
    #[error("recovery key invalid: {0}")]
    RecoveryInvalid(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("directory error: {0}")]
    Directory(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("local store error: {0}")]
    LocalStore(String),

    #[error("realtime error: {0}")]
    Realtime(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
