//! Explicitly stored memories
//!
//! Memories recorded on request (`/memory`, `alice remember`) are kept as
//! small conversation records with id `memory_{key}` so that any
//! [`Storage`] variant can hold them. They get a namespace of their own
//! (see [`crate::storage::Stores`]), so reading them every turn costs only
//! as much as there are memories. Storing the same key twice replaces the
//! earlier record.

use std::sync::Arc;

use tracing::instrument;

use crate::error::{AliceError, AliceResult};
use crate::storage::Storage;
use super::conversation::{MEMORY_RECORD_TYPE, RECORD_TYPE_KEY};
use super::types::{Conversation, MemoryCategory, MemoryItem, Message, Metadata};

const MEMORY_ID_PREFIX: &str = "memory_";

/// Memory records in their own storage namespace
#[derive(Clone)]
pub struct MemoryStore {
    storage: Arc<dyn Storage>,
}

impl MemoryStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Storage id of the record holding `key`
    pub fn record_id(key: &str) -> String {
        format!("{}{}", MEMORY_ID_PREFIX, key)
    }

    /// Store `key = value` as a reminder
    pub async fn store(&self, key: &str, value: &str, context: Option<&str>) -> AliceResult<()> {
        let item = MemoryItem::new(key.trim(), value.trim(), MemoryCategory::Reminder, context.map(str::to_string));
        self.store_item(&item).await
    }

    /// Store an item, keeping its category
    #[instrument(skip(self, item), fields(key = %item.key))]
    pub async fn store_item(&self, item: &MemoryItem) -> AliceResult<()> {
        if item.key.is_empty() || item.value.is_empty() {
            return Err(AliceError::InvalidInput("Memory key and value must not be empty".to_string()));
        }

        let mut message_meta = record_metadata();
        message_meta.insert("key".to_string(), item.key.clone().into());
        message_meta.insert("value".to_string(), item.value.clone().into());
        message_meta.insert("category".to_string(), item.category.as_str().into());
        if let Some(context) = &item.context {
            message_meta.insert("context".to_string(), context.clone().into());
        }

        let mut record = Conversation::with_id(&Self::record_id(&item.key))
            .with_title(format!("Memory: {}", item.key))
            .with_metadata(record_metadata());
        record.append(Message::system(format!("MEMORY: {} = {}", item.key, item.value)).with_metadata(message_meta));

        self.storage.save(&record).await?;
        tracing::info!("Stored memory '{}'", item.key);
        Ok(())
    }

    /// Raw text of every stored memory containing `query`, case-insensitively
    pub async fn retrieve(&self, query: &str) -> AliceResult<Vec<String>> {
        let query = query.to_lowercase();
        let mut found = Vec::new();
        for record in self.records().await? {
            for message in record.messages().iter().filter(|m| is_memory_message(m)) {
                if message.content.to_lowercase().contains(&query) {
                    found.push(message.content.clone());
                }
            }
        }
        Ok(found)
    }

    /// Every stored memory as a [`MemoryItem`]
    pub async fn items(&self) -> AliceResult<Vec<MemoryItem>> {
        let mut items = Vec::new();
        for record in self.records().await? {
            for message in record.messages().iter().filter(|m| is_memory_message(m)) {
                if let Some(item) = to_item(message) {
                    items.push(item);
                }
            }
        }
        Ok(items)
    }

    /// Every memory record in the namespace; other records are ignored
    async fn records(&self) -> AliceResult<Vec<Conversation>> {
        let records = self.storage.list(usize::MAX).await?;
        Ok(records.into_iter().filter(Conversation::is_memory_record).collect())
    }
}

fn record_metadata() -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(RECORD_TYPE_KEY.to_string(), MEMORY_RECORD_TYPE.into());
    metadata
}

fn is_memory_message(message: &Message) -> bool {
    message.metadata_str(RECORD_TYPE_KEY) == Some(MEMORY_RECORD_TYPE)
}

fn to_item(message: &Message) -> Option<MemoryItem> {
    let (key, value) = match (message.metadata_str("key"), message.metadata_str("value")) {
        (Some(key), Some(value)) => (key.to_string(), value.to_string()),
        _ => {
            let (key, value) = message.content.strip_prefix("MEMORY: ")?.split_once(" = ")?;
            (key.to_string(), value.to_string())
        }
    };
    let category = message
        .metadata_str("category")
        .and_then(|c| c.parse().ok())
        .unwrap_or(MemoryCategory::Reminder);
    let context = message.metadata_str("context").map(str::to_string);

    let mut item = MemoryItem::new(key, value, category, context);
    item.created_at = message.timestamp;
    item.last_accessed = message.timestamp;
    Some(item)
}
