//! Core types for the agent module

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AliceError, AliceResult};

/// Unique identifier for a conversation
pub type ConversationId = String;

/// Unique identifier for a message
pub type MessageId = String;

/// Free-form key/value metadata attached to messages and conversations
pub type Metadata = BTreeMap<String, serde_json::Value>;

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message
    User,
    /// Assistant/AI response
    Assistant,
    /// System message (prompts and injected memories)
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message in a conversation.
///
/// Messages are never edited once appended; a correction is a new message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    #[serde(default = "new_id")]
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Message {
    /// Create a message with a fresh id and the current time
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Look up a string-valued metadata entry
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }
}

/// A conversation: an append-only, chronologically ordered message log.
///
/// `messages`, `created_at` and `updated_at` are only reachable through
/// accessors so that the log cannot be reordered and `updated_at` never
/// moves backwards. See `conversation.rs` for the operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub id: ConversationId,
    pub(crate) messages: Vec<Message>,
    #[serde(default)]
    pub title: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Category a memory item is filed under
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum MemoryCategory {
    Location,
    Personal,
    Schedule,
    Reminder,
    Preference,
}

impl MemoryCategory {
    pub const ALL: [MemoryCategory; 5] = [
        MemoryCategory::Location,
        MemoryCategory::Personal,
        MemoryCategory::Schedule,
        MemoryCategory::Reminder,
        MemoryCategory::Preference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryCategory::Location => "location",
            MemoryCategory::Personal => "personal",
            MemoryCategory::Schedule => "schedule",
            MemoryCategory::Reminder => "reminder",
            MemoryCategory::Preference => "preference",
        }
    }
}

impl fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryCategory {
    type Err = AliceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MemoryCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AliceError::InvalidInput(format!("Unknown memory category: {}", s)))
    }
}

/// A key/value fact extracted from user text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryItem {
    pub key: String,
    pub value: String,
    pub category: MemoryCategory,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u32,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl MemoryItem {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        category: MemoryCategory,
        context: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            value: value.into(),
            category,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            confidence: 1.0,
            context,
        }
    }

    /// The timestamp-free identity of the fact
    pub fn fact(&self) -> (&str, &str, MemoryCategory) {
        (&self.key, &self.value, self.category)
    }

    /// Record one retrieval of this item
    pub fn touch(&mut self) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed = Utc::now();
    }
}

/// Compute device hint passed through to the generation backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Auto,
    Cpu,
    Gpu,
}

/// Configuration for the language model, passed opaquely to the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub model_name: String,
    pub max_length: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub do_sample: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pad_token_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eos_token_id: Option<u32>,
    pub device: Device,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_name: "microsoft/DialoGPT-medium".to_string(),
            max_length: 512,
            temperature: 0.7,
            top_p: 0.9,
            do_sample: true,
            pad_token_id: None,
            eos_token_id: None,
            device: Device::Auto,
        }
    }
}

impl ModelConfig {
    pub fn named(model_name: &str, max_length: u32, temperature: f32) -> Self {
        Self {
            model_name: model_name.to_string(),
            max_length,
            temperature,
            ..Default::default()
        }
    }

    /// Reject values no backend can honour
    pub fn validate(&self) -> AliceResult<()> {
        if self.model_name.trim().is_empty() {
            return Err(AliceError::InvalidInput("model_name must not be empty".to_string()));
        }
        if self.max_length == 0 {
            return Err(AliceError::InvalidInput("max_length must be greater than 0".to_string()));
        }
        if !(self.temperature >= 0.0) {
            return Err(AliceError::InvalidInput(format!(
                "temperature must be >= 0, got {}",
                self.temperature
            )));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(AliceError::InvalidInput(format!(
                "top_p must be in (0, 1], got {}",
                self.top_p
            )));
        }
        Ok(())
    }
}

/// Result of one generation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Seconds spent on the turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_info: Option<Metadata>,
}

impl ChatResponse {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            confidence: None,
            processing_time: None,
            model_info: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_gets_generated_id() {
        let a = Message::user("Hello, Alice!");
        let b = Message::user("Hello, Alice!");
        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
        assert_eq!(a.role, Role::User);
    }

    #[test]
    fn test_message_without_id_deserializes_with_fresh_id() {
        let json = r#"{"role":"user","content":"hi","timestamp":"2024-05-01T10:00:00Z"}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert!(!msg.id.is_empty());
        assert_eq!(msg.content, "hi");
        assert!(msg.metadata.is_none());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        assert_eq!(Role::System.to_string(), "system");
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("Location".parse::<MemoryCategory>().unwrap(), MemoryCategory::Location);
        assert!("weather".parse::<MemoryCategory>().is_err());
    }

    #[test]
    fn test_model_config_validation() {
        assert!(ModelConfig::default().validate().is_ok());

        let config = ModelConfig { max_length: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = ModelConfig { top_p: 0.0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = ModelConfig { temperature: -0.1, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_memory_item_touch() {
        let mut item = MemoryItem::new("wallet", "the desk", MemoryCategory::Location, None);
        assert_eq!(item.access_count, 0);
        item.touch();
        assert_eq!(item.access_count, 1);
        assert!(item.last_accessed >= item.created_at);
    }
}
