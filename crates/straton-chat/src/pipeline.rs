//! Message pipeline: encryption and decryption transparent to the UI
//!
//! Send path: plaintext is encrypted before the message store ever sees it;
//! image bytes are encrypted and uploaded, and the marker referencing them
//! is itself encrypted as the message body.
//!
//! Receive path: every message decrypts independently; completion order is
//! irrelevant because display order is keyed by `(created_at, id)`. A text
//! that fails decryption is suppressed entirely; an image that fails
//! renders a broken-attachment placeholder. The asymmetry is deliberate.

use futures::future::join_all;
use tracing::{debug, warn};
use uuid::Uuid;

use straton_core::types::MessageRecord;
use straton_core::StratonResult;
use straton_crypto::{image_marker, parse_body, MessageBody};
use straton_directory::{BlobStore, MessageStore};

use crate::realtime::Realtime;
use crate::session::CryptoIdentitySession;

const ATTACHMENTS_PREFIX: &str = "attachments";

/// A message after decryption, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub created_at: u64,
    pub body: DisplayBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayBody {
    Text(String),
    Image { mime: String, bytes: Vec<u8> },
    /// The attachment existed but could not be fetched or decrypted.
    BrokenImage { mime: String },
}

/// The messaging client for one identity.
///
/// Owning the session guarantees identity initialization completed before
/// any send or receive runs.
pub struct ChatClient {
    session: CryptoIdentitySession,
    messages: MessageStore,
    blobs: BlobStore,
    realtime: Option<Realtime>,
}

impl ChatClient {
    pub fn new(
        session: CryptoIdentitySession,
        messages: MessageStore,
        blobs: BlobStore,
        realtime: Option<Realtime>,
    ) -> Self {
        Self {
            session,
            messages,
            blobs,
            realtime,
        }
    }

    pub fn session(&self) -> &CryptoIdentitySession {
        &self.session
    }

    /// Encrypt and persist a text message, then fan it out.
    ///
    /// On error nothing was persisted (or persisting itself failed): the
    /// caller surfaces "could not send" and keeps the composed text for
    /// retry. A failed realtime publish is only logged: the stored row is
    /// the source of truth and the peer finds it on next fetch.
    pub async fn send_text(&self, peer_id: &str, plaintext: &str) -> StratonResult<MessageRecord> {
        let cipher = self.session.pairwise(peer_id).await?;
        let text = cipher
            .encrypt_text(plaintext)
            .map_err(|e| straton_core::StratonError::Crypto(e.to_string()))?;

        let record = self.new_record(peer_id, text);
        self.messages.insert(&record).await?;
        self.fan_out(&record).await;
        Ok(record)
    }

    /// Encrypt an image, upload it, and send the encrypted marker message.
    pub async fn send_image(
        &self,
        peer_id: &str,
        bytes: &[u8],
        mime: &str,
    ) -> StratonResult<MessageRecord> {
        let cipher = self.session.pairwise(peer_id).await?;

        let encrypted = cipher
            .encrypt_bytes(bytes)
            .map_err(|e| straton_core::StratonError::Crypto(e.to_string()))?;
        let path = format!(
            "{ATTACHMENTS_PREFIX}/{}/{}/{}-{}",
            self.session.user_id(),
            peer_id,
            now_millis(),
            Uuid::new_v4(),
        );
        self.blobs.upload(&path, encrypted).await?;

        let marker = image_marker(mime, &path);
        let text = cipher
            .encrypt_text(&marker)
            .map_err(|e| straton_core::StratonError::Crypto(e.to_string()))?;

        let record = self.new_record(peer_id, text);
        self.messages.insert(&record).await?;
        self.fan_out(&record).await;
        Ok(record)
    }

    /// Fetch and decrypt the conversation with a peer.
    ///
    /// Decryptions run concurrently and may complete in any order; the
    /// result is ordered by `(created_at, id)`. Undisplayable messages are
    /// absent from the result, not rendered as placeholders.
    pub async fn load_conversation(&self, peer_id: &str) -> StratonResult<Vec<DisplayMessage>> {
        let records = self
            .messages
            .list_conversation(self.session.user_id(), peer_id)
            .await?;

        let decrypted = join_all(records.iter().map(|r| self.decrypt_record(r))).await;

        let mut display: Vec<DisplayMessage> = decrypted.into_iter().flatten().collect();
        display.sort_by(|x, y| (x.created_at, &x.id).cmp(&(y.created_at, &y.id)));
        Ok(display)
    }

    /// Decrypt a single fetched or realtime-pushed message.
    ///
    /// `None` suppresses the message: wrong key, tampered ciphertext, or a
    /// peer whose key record vanished. Attachment failures still yield a
    /// message, with [`DisplayBody::BrokenImage`].
    pub async fn decrypt_record(&self, record: &MessageRecord) -> Option<DisplayMessage> {
        let peer_id = if record.sender_id == self.session.user_id() {
            &record.receiver_id
        } else {
            &record.sender_id
        };

        let cipher = match self.session.pairwise(peer_id).await {
            Ok(cipher) => cipher,
            Err(e) => {
                debug!(message_id = %record.id, error = %e, "suppressing message without usable peer key");
                return None;
            }
        };

        let plaintext = match cipher.decrypt_text(&record.text) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                debug!(message_id = %record.id, error = %e, "suppressing undisplayable message");
                return None;
            }
        };

        let body = match parse_body(&plaintext) {
            MessageBody::Text(text) => DisplayBody::Text(text),
            MessageBody::ImageRef { mime, path } => match self.blobs.download(&path).await {
                Ok(encrypted) => match cipher.decrypt_bytes(&encrypted) {
                    Ok(bytes) => DisplayBody::Image { mime, bytes },
                    Err(e) => {
                        warn!(message_id = %record.id, error = %e, "attachment failed to decrypt");
                        DisplayBody::BrokenImage { mime }
                    }
                },
                Err(e) => {
                    warn!(message_id = %record.id, error = %e, "attachment failed to download");
                    DisplayBody::BrokenImage { mime }
                }
            },
        };

        Some(DisplayMessage {
            id: record.id.clone(),
            sender_id: record.sender_id.clone(),
            receiver_id: record.receiver_id.clone(),
            created_at: record.created_at,
            body,
        })
    }

    fn new_record(&self, peer_id: &str, text: String) -> MessageRecord {
        MessageRecord {
            id: Uuid::new_v4().to_string(),
            sender_id: self.session.user_id().to_string(),
            receiver_id: peer_id.to_string(),
            text,
            created_at: now_millis(),
        }
    }

    async fn fan_out(&self, record: &MessageRecord) {
        if let Some(realtime) = &self.realtime {
            if let Err(e) = realtime.publish(record).await {
                warn!(message_id = %record.id, error = %e, "realtime publish failed; peer will see the message on next fetch");
            }
        }
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
