//! straton-chat: the encrypted messaging session
//!
//! Wires the pure crypto layer to the directory clients:
//!
//! - [`session`]: identity startup (load local, restore from backup, or
//!   generate fresh), public-key publishing, and the per-peer cipher cache.
//! - [`recovery`]: the one-time recovery backup setup and the restore flow,
//!   both driven through an interactive [`prompt::RecoveryPrompt`] and a
//!   cancellation token.
//! - [`pipeline`]: encrypt-on-send / decrypt-on-receive, including image
//!   attachments stored encrypted in the blob store.
//! - [`realtime`]: NATS fan-out of freshly inserted messages.
//!
//! Session construction must complete before the pipeline runs; the types
//! enforce this (a [`pipeline::ChatClient`] owns its session).

pub mod pipeline;
pub mod prompt;
pub mod realtime;
pub mod recovery;
pub mod session;

pub use pipeline::{ChatClient, DisplayBody, DisplayMessage};
pub use prompt::{RecoveryPrompt, ScriptedPrompt};
pub use realtime::{MessageEvents, Realtime};
pub use recovery::ensure_recovery_backup;
pub use session::{init_crypto_identity, load_or_create_key_pair, CryptoIdentitySession, KeySource};
