use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;

use crate::agent::Conversation;
use crate::core::FjallWrapper;
use crate::error::{AliceError, AliceResult};
use super::{absent_if_malformed, decode_record, most_recent, Storage};

const PARTITION: &str = "conversations";

/// Conversation records as JSON values in a fjall partition keyed by id
///
/// Further namespaces of the same keyspace are opened with [`FjallStorage::namespace`].
pub struct FjallStorage {
    db: FjallWrapper,
}

impl FjallStorage {
    pub fn new(path: impl AsRef<Path>) -> AliceResult<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)
            .context(format!("Failed to create fjall directory '{}'", path.display()))?;
        let db = FjallWrapper::with_partition(path, PARTITION)
            .context("Failed to open conversation partition")?;
        tracing::info!("Opened fjall conversation storage at {}", path.display());
        Ok(Self { db })
    }

    /// Storage over another partition of the same keyspace
    pub fn namespace(&self, partition: &str) -> AliceResult<Self> {
        let db = self
            .db
            .sibling(partition)
            .context(format!("Failed to open '{}' partition", partition))?;
        Ok(Self { db })
    }

    /// Durably persist pending writes
    pub fn flush(&self) -> AliceResult<()> {
        Ok(self.db.flush()?)
    }
}

#[async_trait]
impl Storage for FjallStorage {
    async fn save(&self, conversation: &Conversation) -> AliceResult<()> {
        if conversation.id.is_empty() {
            return Err(AliceError::InvalidInput("Conversation id must not be empty".to_string()));
        }
        let value = serde_json::to_vec(conversation)?;
        self.db.put(conversation.id.as_bytes(), &value)?;
        tracing::debug!("Saved conversation '{}' ({} messages)", conversation.id, conversation.message_count());
        Ok(())
    }

    async fn get(&self, id: &str) -> AliceResult<Option<Conversation>> {
        match self.db.get(id.as_bytes())? {
            Some(bytes) => absent_if_malformed(decode_record(id, &bytes)),
            None => Ok(None),
        }
    }

    async fn list(&self, limit: usize) -> AliceResult<Vec<Conversation>> {
        let mut conversations = Vec::new();
        for entry in self.db.iter() {
            let (key, value) = entry?;
            let id = String::from_utf8_lossy(&key).into_owned();
            match decode_record(&id, &value) {
                Ok(conversation) => conversations.push(conversation),
                Err(e) => tracing::warn!("Skipping malformed record '{}': {}", id, e),
            }
        }
        Ok(most_recent(conversations, limit))
    }
}
