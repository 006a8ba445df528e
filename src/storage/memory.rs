use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::agent::Conversation;
use crate::error::AliceResult;
use super::{most_recent, Storage};

/// Process-local storage; records live as long as the value does
#[derive(Default)]
pub struct InMemoryStorage {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn save(&self, conversation: &Conversation) -> AliceResult<()> {
        let mut conversations = self.conversations.write().await;
        conversations.insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> AliceResult<Option<Conversation>> {
        let conversations = self.conversations.read().await;
        Ok(conversations.get(id).cloned())
    }

    async fn list(&self, limit: usize) -> AliceResult<Vec<Conversation>> {
        let conversations = self.conversations.read().await;
        Ok(most_recent(conversations.values().cloned().collect(), limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Role;

    #[tokio::test]
    async fn test_save_get_list() {
        let storage = InMemoryStorage::new();
        assert!(storage.get("missing").await.unwrap().is_none());

        let mut older = Conversation::with_id("older");
        older.add_message(Role::User, "hi");
        storage.save(&older).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let mut newer = Conversation::with_id("newer");
        newer.add_message(Role::User, "hello");
        storage.save(&newer).await.unwrap();

        assert_eq!(storage.get("older").await.unwrap(), Some(older));

        let listed = storage.list(10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "newer");
        assert_eq!(storage.list(1).await.unwrap().len(), 1);
    }
}
