//! Context window assembly
//!
//! Combines the most recent messages of a conversation with the memories most
//! relevant to the incoming message into the ordered list handed to the
//! generation backend.

use crate::agent::conversation::{MEMORY_RECORD_TYPE, RECORD_TYPE_KEY};
use crate::agent::{Conversation, MemoryItem, Message, Metadata};
use crate::memory::score_and_rank;

pub const DEFAULT_WINDOW: usize = 10;
pub const DEFAULT_MEMORY_CAP: usize = 3;

/// Leading text of every injected memory message
pub const MEMORY_PREFIX: &str = "Memory: ";

/// Messages for the backend plus the memories that were injected
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub messages: Vec<Message>,
    pub memories: Vec<MemoryItem>,
}

/// Builds bounded context windows
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    window: usize,
    memory_cap: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MEMORY_CAP)
    }
}

impl ContextAssembler {
    pub fn new(window: usize, memory_cap: usize) -> Self {
        Self { window, memory_cap }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn memory_cap(&self) -> usize {
        self.memory_cap
    }

    /// The largest number of messages [`ContextAssembler::assemble`] can return
    pub fn max_len(&self) -> usize {
        self.window + self.memory_cap
    }

    pub fn assemble(
        &self,
        conversation: &Conversation,
        current_message: &str,
        memory_pool: Option<&[MemoryItem]>,
    ) -> Vec<Message> {
        self.assemble_with_memories(conversation, current_message, memory_pool)
            .messages
    }

    /// Take the last `window` messages and, given a pool, inject up to
    /// `memory_cap` ranked memories as system messages placed immediately
    /// before the final message of the window.
    pub fn assemble_with_memories(
        &self,
        conversation: &Conversation,
        current_message: &str,
        memory_pool: Option<&[MemoryItem]>,
    ) -> AssembledContext {
        let mut messages = conversation.recent(self.window).to_vec();

        let memories: Vec<MemoryItem> = match memory_pool {
            Some(pool) if self.memory_cap > 0 => score_and_rank(current_message, pool)
                .into_iter()
                .take(self.memory_cap)
                .collect(),
            _ => Vec::new(),
        };

        if !memories.is_empty() {
            let insert_at = messages.len().saturating_sub(1);
            let injected = memories.iter().map(memory_message);
            messages.splice(insert_at..insert_at, injected);
            tracing::debug!(
                "Injected {} memories into a context of {} messages",
                memories.len(),
                messages.len()
            );
        }

        AssembledContext { messages, memories }
    }
}

/// Render a memory as a synthetic system message
pub fn memory_message(item: &MemoryItem) -> Message {
    let mut metadata = Metadata::new();
    metadata.insert(RECORD_TYPE_KEY.to_string(), MEMORY_RECORD_TYPE.into());
    metadata.insert("key".to_string(), item.key.clone().into());
    metadata.insert("category".to_string(), item.category.as_str().into());
    metadata.insert("confidence".to_string(), serde_json::json!(item.confidence));

    Message::system(format!("{}{} is {}", MEMORY_PREFIX, item.key, item.value)).with_metadata(metadata)
}

/// Free-function form of [`ContextAssembler::assemble`]
pub fn assemble(
    conversation: &Conversation,
    current_message: &str,
    memory_pool: Option<&[MemoryItem]>,
    window: usize,
    memory_cap: usize,
) -> Vec<Message> {
    ContextAssembler::new(window, memory_cap).assemble(conversation, current_message, memory_pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{MemoryCategory, Role};

    fn conversation_with(n: usize) -> Conversation {
        let mut conversation = Conversation::new();
        for i in 1..=n {
            conversation.add_message(Role::User, &format!("Message {}", i));
        }
        conversation
    }

    fn pool() -> Vec<MemoryItem> {
        vec![
            MemoryItem::new("wallet", "the desk", MemoryCategory::Location, None),
            MemoryItem::new("keys", "the drawer", MemoryCategory::Location, None),
            MemoryItem::new("meeting", "3pm", MemoryCategory::Schedule, None),
            MemoryItem::new("love", "hiking", MemoryCategory::Preference, None),
        ]
    }

    #[test]
    fn test_window_without_memories() {
        let conversation = conversation_with(15);
        let context = assemble(&conversation, "Message 15", None, 10, 3);

        assert_eq!(context.len(), 10);
        assert_eq!(context[0].content, "Message 6");
        assert_eq!(context[9].content, "Message 15");
    }

    #[test]
    fn test_memories_inserted_before_last_message() {
        let mut conversation = conversation_with(3);
        conversation.add_message(Role::User, "where is my wallet?");

        let context = assemble(&conversation, "where is my wallet?", Some(&pool()), 10, 3);

        assert_eq!(context.len(), 5);
        assert_eq!(context[3].role, Role::System);
        assert_eq!(context[3].content, "Memory: wallet is the desk");
        assert_eq!(context[3].metadata_str("type"), Some("memory"));
        assert_eq!(context[4].content, "where is my wallet?");
    }

    #[test]
    fn test_memory_cap_is_respected() {
        let conversation = conversation_with(12);
        let query = "wallet keys meeting hiking location schedule";
        let assembler = ContextAssembler::new(10, 3);
        let assembled = assembler.assemble_with_memories(&conversation, query, Some(&pool()));

        assert_eq!(assembled.memories.len(), 3);
        assert_eq!(assembled.messages.len(), 13);
        assert!(assembled.messages.len() <= assembler.max_len());
        assert_eq!(assembled.messages[12].content, "Message 12");
        let injected = assembled
            .messages
            .iter()
            .filter(|m| m.metadata_str("type") == Some("memory"))
            .count();
        assert_eq!(injected, 3);
    }

    #[test]
    fn test_length_bound_holds_for_any_window() {
        let conversation = conversation_with(7);
        for window in 0..10 {
            for cap in 0..5 {
                let context = assemble(&conversation, "wallet keys location", Some(&pool()), window, cap);
                assert!(context.len() <= window + cap, "window={} cap={}", window, cap);
            }
        }
    }

    #[test]
    fn test_empty_conversation_gets_memories_only() {
        let context = assemble(&Conversation::new(), "wallet", Some(&pool()), 10, 3);
        assert_eq!(context.len(), 1);
        assert_eq!(context[0].content, "Memory: wallet is the desk");
    }

    #[test]
    fn test_irrelevant_pool_injects_nothing() {
        let conversation = conversation_with(2);
        let context = assemble(&conversation, "tell me a joke", Some(&pool()), 10, 3);
        assert_eq!(context.len(), 2);
    }
}
