//! Alice: a conversational assistant that remembers what you tell it.
//!
//! This library provides:
//! - Conversation and message types with an append-only history
//! - Rule-based memory extraction from user messages
//! - Relevance ranking of memories against the next message
//! - Bounded context assembly for a generation backend
//! - Conversation analysis and optional reply enhancement
//! - Pluggable storage (in-memory, JSON files, fjall) and backends (scripted, HTTP)
//!
//! # Example
//!
//! ```rust,no_run
//! use alice::{Config, EmbeddedAlice};
//!
//! # async fn demo() -> alice::AliceResult<()> {
//! let alice = EmbeddedAlice::new(Config::default())?;
//! let conversation = alice.agent().start_conversation(alice.config().system_prompt()).await?;
//! let reply = alice.agent().send_message(&conversation.id, "my keys are in the drawer", None).await?;
//! println!("{}", reply.message.content);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod analysis;
pub mod backend;
pub mod cli;
pub mod config;
pub mod context;
#[cfg(feature = "fjall-storage")]
pub mod core;
pub mod error;
pub mod memory;
pub mod storage;

// Re-export key types
pub use crate::agent::{Agent, ChatResponse, Conversation, MemoryItem, MemoryStore, Message, ModelConfig, Role, Session};
pub use crate::backend::{GenerationBackend, ScriptedBackend};
pub use crate::config::Config;
pub use crate::context::ContextAssembler;
pub use crate::error::{AliceError, AliceResult};
pub use crate::memory::MemoryExtractor;
pub use crate::storage::{Storage, Stores};

use std::sync::Arc;

/// Embedded Alice interface
///
/// Opens the configured storage and backend and wires them into an [`Agent`].
pub struct EmbeddedAlice {
    config: Config,
    agent: Arc<Agent>,
}

impl EmbeddedAlice {
    pub fn new(config: Config) -> AliceResult<Self> {
        config.validate()?;
        let stores = storage::open_storage(config.storage, &config.data_dir)?;
        let backend = backend::open_backend(&config.backend)?;
        Ok(Self::with_parts(config, stores, backend))
    }

    /// Build around already opened storage namespaces and a backend
    pub fn with_parts(config: Config, stores: Stores, backend: Arc<dyn GenerationBackend>) -> Self {
        let agent = Agent::from_config(&config, stores.conversations, backend)
            .with_memory_store(MemoryStore::new(stores.memories));
        Self {
            config,
            agent: Arc::new(agent),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// A console session whose new conversations open with the configured personality
    pub fn session(&self) -> Session {
        Session::new(self.agent.clone(), self.config.system_prompt().map(str::to_string))
    }
}
