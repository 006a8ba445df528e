//! Conversation history management

use chrono::{DateTime, Utc};

use super::types::{new_id, Conversation, ConversationId, Message, Metadata, Role};

/// Metadata key marking a conversation or message as a stored memory
pub const RECORD_TYPE_KEY: &str = "type";
/// Value of [`RECORD_TYPE_KEY`] for memory records and injected memories
pub const MEMORY_RECORD_TYPE: &str = "memory";

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Create a new, empty conversation with a generated id
    pub fn new() -> Self {
        Self::with_id(&new_id())
    }

    /// Create an empty conversation with a specific id.
    /// An empty id is replaced by a generated one.
    pub fn with_id(id: &str) -> Self {
        let now = Utc::now();
        let id = if id.trim().is_empty() { new_id() } else { id.to_string() };
        Self {
            id,
            messages: Vec::new(),
            title: None,
            created_at: now,
            updated_at: now,
            metadata: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Append a message and bump `updated_at`.
    ///
    /// `updated_at` never moves backwards, even if the wall clock does.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        let now = Utc::now();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    /// Convenience wrapper around [`Conversation::append`]
    pub fn add_message(&mut self, role: Role, content: &str) -> &Message {
        self.append(Message::new(role, content));
        &self.messages[self.messages.len() - 1]
    }

    /// All messages in chronological order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The last `n` messages in chronological order (all of them if fewer exist)
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    /// Whether this record holds a stored memory rather than a chat
    pub fn is_memory_record(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(RECORD_TYPE_KEY))
            .and_then(|v| v.as_str())
            == Some(MEMORY_RECORD_TYPE)
    }

    /// Restore the timestamp invariant on records read from storage
    pub(crate) fn normalize(mut self) -> Self {
        if self.updated_at < self.created_at {
            self.updated_at = self.created_at;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_creation() {
        let conversation = Conversation::new();
        assert!(!conversation.id.is_empty());
        assert!(conversation.is_empty());
        assert_eq!(conversation.created_at(), conversation.updated_at());

        let named = Conversation::with_id("");
        assert!(!named.id.is_empty());
    }

    #[test]
    fn test_append_preserves_order_and_bumps_updated_at() {
        let mut conversation = Conversation::with_id("c1");
        let before = conversation.updated_at();

        let first = Message::user("first");
        conversation.append(first.clone());
        conversation.add_message(Role::Assistant, "second");

        assert_eq!(conversation.message_count(), 2);
        assert_eq!(conversation.messages()[0], first);
        assert_eq!(conversation.messages()[1].content, "second");
        assert!(conversation.updated_at() >= before);
        assert!(conversation.updated_at() >= conversation.created_at());
    }

    #[test]
    fn test_recent_window() {
        let mut conversation = Conversation::new();
        for i in 0..15 {
            conversation.add_message(Role::User, &format!("Message {}", i));
        }

        let recent = conversation.recent(10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].content, "Message 5");
        assert_eq!(recent[9].content, "Message 14");

        assert_eq!(conversation.recent(100).len(), 15);
        assert!(conversation.recent(0).is_empty());
    }

    #[test]
    fn test_memory_record_detection() {
        let mut metadata = Metadata::new();
        metadata.insert(RECORD_TYPE_KEY.to_string(), MEMORY_RECORD_TYPE.into());
        let record = Conversation::with_id("memory_wallet").with_metadata(metadata);
        assert!(record.is_memory_record());
        assert!(!Conversation::new().is_memory_record());
    }
}
