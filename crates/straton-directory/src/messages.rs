//! Message store: one JSON object per message under
//! `messages/{conversation}/{created_at}-{id}.json`
//!
//! The conversation segment is the sorted user-id pair, so both
//! participants read and write the same prefix. The zero-padded timestamp
//! keeps object listings roughly chronological, but consumers still sort by
//! `(created_at, id)` after parsing.

use opendal::Operator;
use straton_core::types::{conversation_key, MessageRecord};
use straton_core::{StratonError, StratonResult};
use tracing::warn;

const MESSAGES_PREFIX: &str = "messages";

#[derive(Clone)]
pub struct MessageStore {
    op: Operator,
}

impl MessageStore {
    pub fn new(op: Operator) -> Self {
        Self { op }
    }

    fn message_path(record: &MessageRecord) -> String {
        format!(
            "{MESSAGES_PREFIX}/{}/{:013}-{}.json",
            conversation_key(&record.sender_id, &record.receiver_id),
            record.created_at,
            record.id,
        )
    }

    /// Persist one message. The `text` field is expected to already be
    /// ciphertext.
    pub async fn insert(&self, record: &MessageRecord) -> StratonResult<()> {
        let path = Self::message_path(record);
        let json = serde_json::to_vec(record)
            .map_err(|e| StratonError::Directory(format!("serializing {path}: {e}")))?;
        self.op
            .write(&path, json)
            .await
            .map_err(|e| StratonError::Directory(format!("writing {path}: {e}")))?;
        Ok(())
    }

    /// Fetch the full history between two users, sorted ascending by
    /// `(created_at, id)`. Objects that fail to parse are skipped with a
    /// warning rather than failing the whole conversation.
    pub async fn list_conversation(&self, a: &str, b: &str) -> StratonResult<Vec<MessageRecord>> {
        let prefix = format!("{MESSAGES_PREFIX}/{}/", conversation_key(a, b));

        let entries = match self.op.list(&prefix).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StratonError::Directory(format!("listing {prefix}: {e}")));
            }
        };

        let mut records = Vec::new();
        for entry in entries {
            let path = entry.path();
            if !path.ends_with(".json") {
                continue;
            }
            let data = self
                .op
                .read(path)
                .await
                .map_err(|e| StratonError::Directory(format!("reading {path}: {e}")))?;
            match serde_json::from_slice::<MessageRecord>(&data.to_bytes()) {
                Ok(record) => records.push(record),
                Err(e) => warn!(path, error = %e, "skipping unparseable message object"),
            }
        }

        records.sort_by(|x, y| (x.created_at, &x.id).cmp(&(y.created_at, &y.id)));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::memory_operator;

    fn record(id: &str, from: &str, to: &str, text: &str, at: u64) -> MessageRecord {
        MessageRecord {
            id: id.into(),
            sender_id: from.into(),
            receiver_id: to.into(),
            text: text.into(),
            created_at: at,
        }
    }

    #[tokio::test]
    async fn test_empty_conversation() {
        let store = MessageStore::new(memory_operator());
        assert!(store.list_conversation("alice", "bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_and_list_sorted() {
        let store = MessageStore::new(memory_operator());

        store.insert(&record("m2", "bob", "alice", "x", 2000)).await.unwrap();
        store.insert(&record("m1", "alice", "bob", "y", 1000)).await.unwrap();
        store.insert(&record("m3", "alice", "bob", "z", 3000)).await.unwrap();

        let msgs = store.list_conversation("alice", "bob").await.unwrap();
        assert_eq!(
            msgs.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
            vec!["m1", "m2", "m3"]
        );
    }

    #[tokio::test]
    async fn test_both_directions_share_conversation() {
        let store = MessageStore::new(memory_operator());

        store.insert(&record("m1", "alice", "bob", "hi", 1)).await.unwrap();
        store.insert(&record("m2", "bob", "alice", "hey", 2)).await.unwrap();

        // Same history regardless of who asks.
        assert_eq!(store.list_conversation("alice", "bob").await.unwrap().len(), 2);
        assert_eq!(store.list_conversation("bob", "alice").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_other_conversations_not_listed() {
        let store = MessageStore::new(memory_operator());

        store.insert(&record("m1", "alice", "bob", "hi", 1)).await.unwrap();
        store.insert(&record("m2", "alice", "carol", "psst", 2)).await.unwrap();

        let msgs = store.list_conversation("alice", "bob").await.unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].id, "m1");
    }

    #[tokio::test]
    async fn test_same_timestamp_ordered_by_id() {
        let store = MessageStore::new(memory_operator());

        store.insert(&record("b", "alice", "bob", "2nd", 500)).await.unwrap();
        store.insert(&record("a", "alice", "bob", "1st", 500)).await.unwrap();

        let msgs = store.list_conversation("alice", "bob").await.unwrap();
        assert_eq!(
            msgs.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }
}
