//! straton-directory: narrow clients for the hosted backend
//!
//! The backend is a black box reached through object storage (key records,
//! messages, attachments) plus a local per-profile key-value file. Nothing
//! in this crate encrypts or decrypts; callers hand it ciphertext.

pub mod blobs;
pub mod keys;
pub mod local;
pub mod messages;
pub mod operator;

pub use blobs::BlobStore;
pub use keys::KeyDirectory;
pub use local::LocalStore;
pub use messages::MessageStore;
pub use operator::build_operator;
