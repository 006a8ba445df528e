//! Conversation persistence
//!
//! The [`Storage`] trait is the whole contract the rest of the crate relies
//! on: whole conversation records in and out, keyed by id. Three variants are
//! provided and picked at startup through [`StorageKind`]:
//!
//! - [`InMemoryStorage`]: process-local, for tests and demos
//! - [`JsonFileStorage`]: one pretty-printed JSON file per conversation
//! - [`FjallStorage`]: JSON records in a fjall partition (feature `fjall-storage`)
//!
//! [`open_storage`] opens two namespaces of the chosen variant, one for chats
//! and one for explicitly stored memories.
//!
//! Records that fail to deserialize are reported as absent by `get` and
//! skipped by `list`.

mod json_file;
mod memory;
#[cfg(feature = "fjall-storage")]
mod fjall;

pub use json_file::JsonFileStorage;
pub use memory::InMemoryStorage;
#[cfg(feature = "fjall-storage")]
pub use self::fjall::FjallStorage;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::Conversation;
use crate::error::{AliceError, AliceResult};

/// Persistence contract for conversation records
#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert or replace the record with `conversation.id`
    async fn save(&self, conversation: &Conversation) -> AliceResult<()>;

    /// Fetch a record; `None` if unknown or unreadable
    async fn get(&self, id: &str) -> AliceResult<Option<Conversation>>;

    /// Up to `limit` records, most recently updated first
    async fn list(&self, limit: usize) -> AliceResult<Vec<Conversation>>;
}

const CONVERSATIONS: &str = "conversations";
const MEMORIES: &str = "memories";

/// Which storage variant to open
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    #[default]
    Json,
    Fjall,
}

impl std::str::FromStr for StorageKind {
    type Err = AliceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageKind::Memory),
            "json" | "file" => Ok(StorageKind::Json),
            "fjall" => Ok(StorageKind::Fjall),
            other => Err(AliceError::Configuration(format!("Unknown storage kind: {}", other))),
        }
    }
}

/// Conversation records and stored memories, kept in separate namespaces
/// so reading one never scans the other
#[derive(Clone)]
pub struct Stores {
    pub conversations: Arc<dyn Storage>,
    pub memories: Arc<dyn Storage>,
}

impl Stores {
    /// Process-local storage for both namespaces
    pub fn in_memory() -> Self {
        Self {
            conversations: Arc::new(InMemoryStorage::new()),
            memories: Arc::new(InMemoryStorage::new()),
        }
    }
}

/// Open the configured storage under `data_dir`
pub fn open_storage(kind: StorageKind, data_dir: &Path) -> AliceResult<Stores> {
    match kind {
        StorageKind::Memory => Ok(Stores::in_memory()),
        StorageKind::Json => Ok(Stores {
            conversations: Arc::new(JsonFileStorage::new(data_dir.join(CONVERSATIONS))?),
            memories: Arc::new(JsonFileStorage::new(data_dir.join(MEMORIES))?),
        }),
        #[cfg(feature = "fjall-storage")]
        StorageKind::Fjall => {
            let conversations = FjallStorage::new(data_dir.join("fjall"))?;
            let memories = conversations.namespace(MEMORIES)?;
            Ok(Stores {
                conversations: Arc::new(conversations),
                memories: Arc::new(memories),
            })
        }
        #[cfg(not(feature = "fjall-storage"))]
        StorageKind::Fjall => Err(AliceError::Configuration(
            "fjall storage requires the `fjall-storage` feature".to_string(),
        )),
    }
}

/// Deserialize a stored record, mapping failures to `MalformedRecord`
pub(crate) fn decode_record(id: &str, bytes: &[u8]) -> AliceResult<Conversation> {
    serde_json::from_slice::<Conversation>(bytes)
        .map(Conversation::normalize)
        .map_err(|e| AliceError::MalformedRecord {
            id: id.to_string(),
            reason: e.to_string(),
        })
}

/// Order by `updated_at` descending and cut to `limit`
pub(crate) fn most_recent(mut conversations: Vec<Conversation>, limit: usize) -> Vec<Conversation> {
    conversations.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
    conversations.truncate(limit);
    conversations
}

/// Turn a malformed record into "absent", propagating every other error
pub(crate) fn absent_if_malformed(result: AliceResult<Conversation>) -> AliceResult<Option<Conversation>> {
    match result {
        Ok(conversation) => Ok(Some(conversation)),
        Err(AliceError::MalformedRecord { id, reason }) => {
            tracing::warn!("Treating malformed record '{}' as absent: {}", id, reason);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_record_reports_malformed() {
        let err = decode_record("bad", b"{not json").unwrap_err();
        assert!(matches!(err, AliceError::MalformedRecord { ref id, .. } if id == "bad"));
    }

    #[test]
    fn test_storage_kind_parsing() {
        assert_eq!("JSON".parse::<StorageKind>().unwrap(), StorageKind::Json);
        assert_eq!("memory".parse::<StorageKind>().unwrap(), StorageKind::Memory);
        assert!("redis".parse::<StorageKind>().is_err());
    }

    #[tokio::test]
    async fn test_json_namespaces_use_separate_directories() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let stores = open_storage(StorageKind::Json, temp_dir.path()).unwrap();

        stores.memories.save(&Conversation::with_id("memory_keys")).await.unwrap();
        stores.conversations.save(&Conversation::with_id("chat")).await.unwrap();

        assert!(temp_dir.path().join("memories/memory_keys.json").exists());
        assert!(temp_dir.path().join("conversations/chat.json").exists());
        assert_eq!(stores.conversations.list(10).await.unwrap().len(), 1);
        assert_eq!(stores.memories.list(10).await.unwrap().len(), 1);
    }

    #[test]
    fn test_absent_if_malformed() {
        let malformed = Err(AliceError::MalformedRecord {
            id: "x".to_string(),
            reason: "eof".to_string(),
        });
        assert!(absent_if_malformed(malformed).unwrap().is_none());

        let other = Err(AliceError::InvalidInput("bad id".to_string()));
        assert!(absent_if_malformed(other).is_err());
    }
}
