//! Realtime fan-out over NATS
//!
//! One subject per recipient: `straton.msg.{user_id}`. Payloads are the
//! stored [`MessageRecord`] as JSON: ciphertext only, exactly what the
//! message store holds.

use bytes::Bytes;
use futures::StreamExt;
use tracing::warn;

use straton_core::types::MessageRecord;
use straton_core::{StratonError, StratonResult};

#[derive(Clone)]
pub struct Realtime {
    client: async_nats::Client,
}

impl Realtime {
    pub async fn connect(url: &str) -> StratonResult<Self> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| StratonError::Realtime(format!("connecting {url}: {e}")))?;
        Ok(Self { client })
    }

    fn subject_for(user_id: &str) -> String {
        format!("straton.msg.{user_id}")
    }

    /// Push a freshly inserted message to its recipient.
    pub async fn publish(&self, record: &MessageRecord) -> StratonResult<()> {
        let payload = serde_json::to_vec(record)
            .map_err(|e| StratonError::Realtime(format!("serializing message: {e}")))?;
        self.client
            .publish(Self::subject_for(&record.receiver_id), Bytes::from(payload))
            .await
            .map_err(|e| StratonError::Realtime(format!("publishing: {e}")))?;
        self.client
            .flush()
            .await
            .map_err(|e| StratonError::Realtime(format!("flushing: {e}")))?;
        Ok(())
    }

    /// Subscribe to a user's inbox subject.
    pub async fn subscribe(&self, user_id: &str) -> StratonResult<MessageEvents> {
        let subscriber = self
            .client
            .subscribe(Self::subject_for(user_id))
            .await
            .map_err(|e| StratonError::Realtime(format!("subscribing: {e}")))?;
        Ok(MessageEvents { subscriber })
    }
}

/// Stream of pushed message records.
pub struct MessageEvents {
    subscriber: async_nats::Subscriber,
}

impl MessageEvents {
    /// Next pushed record; malformed payloads are skipped, `None` means the
    /// subscription ended.
    pub async fn next(&mut self) -> Option<MessageRecord> {
        while let Some(message) = self.subscriber.next().await {
            match serde_json::from_slice(&message.payload) {
                Ok(record) => return Some(record),
                Err(e) => warn!(error = %e, "skipping malformed realtime payload"),
            }
        }
        None
    }
}
