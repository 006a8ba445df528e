//! The conversational agent
//!
//! This module ties the pieces together:
//! - **Types**: messages, conversations, memory items and model settings
//! - **Conversation**: append-only message history
//! - **MemoryStore**: explicitly stored memories
//! - **Agent**: the turn cycle (user message in, assistant message out, persisted)
//! - **Session**: tracks the current conversation for interactive use
//!
//! # Example
//!
//! ```rust,ignore
//! use alice::agent::Agent;
//! use alice::backend::ScriptedBackend;
//! use alice::storage::InMemoryStorage;
//! use std::sync::Arc;
//!
//! let agent = Agent::new(Arc::new(InMemoryStorage::new()), Arc::new(ScriptedBackend::new()));
//! let conversation = agent.start_conversation(None).await?;
//! agent.send_message(&conversation.id, "my wallet is on the desk", None).await?;
//! let reply = agent.send_message(&conversation.id, "where is my wallet?", None).await?;
//! ```

pub mod types;
pub mod memory;
pub mod conversation;
pub mod session;

pub use types::{
    ChatResponse, Conversation, ConversationId, Device, MemoryCategory, MemoryItem, Message, MessageId,
    Metadata, ModelConfig, Role,
};
pub use memory::MemoryStore;
pub use session::Session;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::analysis::{ConversationAnalysis, ConversationAnalyzer, EnhancementContext, ResponseEnhancer};
use crate::backend::GenerationBackend;
use crate::config::Config;
use crate::context::ContextAssembler;
use crate::error::{AliceError, AliceResult};
use crate::memory::{dedup_facts, MemoryExtractor};
use crate::storage::{InMemoryStorage, Storage};

const NEW_CONVERSATION_TITLE: &str = "New Conversation";

/// Where the agent is in the turn cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    AwaitingUserInput,
    Processing,
    Persisting,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnState::Idle => "idle",
            TurnState::AwaitingUserInput => "awaiting user input",
            TurnState::Processing => "processing",
            TurnState::Persisting => "persisting",
        };
        f.write_str(name)
    }
}

/// Snapshot of the generation backend
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub backend: String,
    pub loaded: bool,
    pub model: ModelConfig,
}

/// Returns the agent to `Idle` however a turn ends
struct TurnGuard<'a>(&'a Mutex<TurnState>);

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = TurnState::Idle;
    }
}

/// Orchestrates turns over a storage and a generation backend
///
/// The design assumes at most one in-flight turn per conversation id;
/// [`Agent::state`] reports the most recent turn's progress.
pub struct Agent {
    storage: Arc<dyn Storage>,
    backend: Arc<dyn GenerationBackend>,
    memory_store: MemoryStore,
    extractor: MemoryExtractor,
    analyzer: ConversationAnalyzer,
    assembler: ContextAssembler,
    enhancer: Option<ResponseEnhancer>,
    use_stored_memories: bool,
    model: RwLock<ModelConfig>,
    state: Mutex<TurnState>,
}

impl Agent {
    /// Create an agent with default rules and settings
    pub fn new(storage: Arc<dyn Storage>, backend: Arc<dyn GenerationBackend>) -> Self {
        Self::from_config(&Config::default(), storage, backend)
    }

    /// Create an agent using the turn settings of `config`
    ///
    /// Stored memories live in a process-local namespace until
    /// [`Agent::with_memory_store`] supplies a persistent one.
    pub fn from_config(config: &Config, storage: Arc<dyn Storage>, backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            memory_store: MemoryStore::new(Arc::new(InMemoryStorage::new())),
            storage,
            backend,
            extractor: MemoryExtractor::default(),
            analyzer: ConversationAnalyzer::default(),
            assembler: ContextAssembler::new(config.context_window, config.memory_cap),
            enhancer: config.enhance_responses.then(ResponseEnhancer::default),
            use_stored_memories: config.use_stored_memories,
            model: RwLock::new(config.model.clone()),
            state: Mutex::new(TurnState::Idle),
        }
    }

    pub fn with_memory_store(mut self, memory_store: MemoryStore) -> Self {
        self.memory_store = memory_store;
        self
    }

    pub fn with_extractor(mut self, extractor: MemoryExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_analyzer(mut self, analyzer: ConversationAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_enhancer(mut self, enhancer: Option<ResponseEnhancer>) -> Self {
        self.enhancer = enhancer;
        self
    }

    pub fn state(&self) -> TurnState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: TurnState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn begin_turn(&self) -> TurnGuard<'_> {
        self.set_state(TurnState::AwaitingUserInput);
        TurnGuard(&self.state)
    }

    pub fn memory_store(&self) -> &MemoryStore {
        &self.memory_store
    }

    /// Create and persist an empty conversation, optionally led by a system prompt
    pub async fn start_conversation(&self, system_prompt: Option<&str>) -> AliceResult<Conversation> {
        let mut conversation = Conversation::new().with_title(NEW_CONVERSATION_TITLE);
        if let Some(prompt) = system_prompt.filter(|p| !p.trim().is_empty()) {
            conversation.append(Message::system(prompt));
        }
        self.storage.save(&conversation).await?;
        tracing::info!("Started conversation {}", conversation.id);
        Ok(conversation)
    }

    async fn load_conversation(&self, conversation_id: &str) -> AliceResult<Conversation> {
        self.storage
            .get(conversation_id)
            .await?
            .ok_or_else(|| AliceError::NotFound(conversation_id.to_string()))
    }

    /// Run one turn: append `text` as a user message, generate a reply and persist both.
    ///
    /// If generation fails the conversation is saved with the user message
    /// before the error is returned, so [`Agent::retry`] can pick it up.
    #[instrument(skip(self, text, config))]
    pub async fn send_message(
        &self,
        conversation_id: &str,
        text: &str,
        config: Option<&ModelConfig>,
    ) -> AliceResult<ChatResponse> {
        let start = Instant::now();
        let _turn = self.begin_turn();

        let mut conversation = self.load_conversation(conversation_id).await?;
        conversation.append(Message::user(text));
        self.set_state(TurnState::Processing);

        self.complete_turn(conversation, text, config, start).await
    }

    /// Generate a reply for a conversation whose last message is from the user
    #[instrument(skip(self, config))]
    pub async fn retry(&self, conversation_id: &str, config: Option<&ModelConfig>) -> AliceResult<ChatResponse> {
        let start = Instant::now();
        let _turn = self.begin_turn();

        let conversation = self.load_conversation(conversation_id).await?;
        let text = match conversation.last_message() {
            Some(message) if message.role == Role::User => message.content.clone(),
            _ => {
                return Err(AliceError::InvalidInput(format!(
                    "Conversation {} has no unanswered user message",
                    conversation_id
                )))
            }
        };
        self.set_state(TurnState::Processing);

        self.complete_turn(conversation, &text, config, start).await
    }

    async fn complete_turn(
        &self,
        mut conversation: Conversation,
        text: &str,
        config: Option<&ModelConfig>,
        start: Instant,
    ) -> AliceResult<ChatResponse> {
        let config = match config {
            Some(config) => config.clone(),
            None => self.model.read().await.clone(),
        };

        match self.generate(&conversation, text, &config).await {
            Ok(mut response) => {
                conversation.append(response.message.clone());
                self.set_state(TurnState::Persisting);
                self.storage.save(&conversation).await?;
                response.processing_time = Some(start.elapsed().as_secs_f64());
                tracing::debug!(
                    "Turn complete for {} in {:.3}s",
                    conversation.id,
                    start.elapsed().as_secs_f64()
                );
                Ok(response)
            }
            Err(e) => {
                tracing::warn!("Generation failed for {}: {}", conversation.id, e);
                self.set_state(TurnState::Persisting);
                if let Err(save_err) = self.storage.save(&conversation).await {
                    tracing::warn!("Failed to keep user message for {}: {}", conversation.id, save_err);
                }
                Err(e)
            }
        }
    }

    async fn generate(&self, conversation: &Conversation, text: &str, config: &ModelConfig) -> AliceResult<ChatResponse> {
        if !self.backend.is_loaded() {
            tracing::info!("Loading backend '{}' for model {}", self.backend.name(), config.model_name);
            self.backend.load(config).await?;
        }

        let pool = self.memory_pool(conversation).await?;
        let context = self.assembler.assemble_with_memories(conversation, text, Some(&pool));
        let mut response = self.backend.generate(&context.messages, config).await?;

        if let Some(enhancer) = &self.enhancer {
            let analysis = self.analyzer.analyze(conversation);
            let enhancement = EnhancementContext {
                memories_used: context.memories,
                topics: analysis.topics,
                user_question_count: user_question_count(conversation),
            };
            let content = enhancer.enhance(&response.message.content, &enhancement);
            response.message = Message {
                content,
                ..response.message
            };
        }
        Ok(response)
    }

    /// Stored memories, if enabled, then those extracted from the conversation,
    /// with repeats of one fact collapsed
    async fn memory_pool(&self, conversation: &Conversation) -> AliceResult<Vec<MemoryItem>> {
        let mut pool = Vec::new();
        if self.use_stored_memories {
            pool.extend(self.memory_store.items().await?);
        }
        pool.extend(self.extractor.extract_memories(conversation));
        Ok(dedup_facts(pool))
    }

    /// Full conversation record
    pub async fn conversation_history(&self, conversation_id: &str) -> AliceResult<Conversation> {
        self.load_conversation(conversation_id).await
    }

    /// Chat conversations, most recently updated first; memory records are left out
    pub async fn list_conversations(&self, limit: usize) -> AliceResult<Vec<Conversation>> {
        let all = self.storage.list(usize::MAX).await?;
        Ok(all.into_iter().filter(|c| !c.is_memory_record()).take(limit).collect())
    }

    pub async fn analyze(&self, conversation_id: &str) -> AliceResult<ConversationAnalysis> {
        let conversation = self.load_conversation(conversation_id).await?;
        Ok(self.analyzer.analyze(&conversation))
    }

    /// Memories extracted from the user messages of a conversation
    pub async fn memories(&self, conversation_id: &str) -> AliceResult<Vec<MemoryItem>> {
        let conversation = self.load_conversation(conversation_id).await?;
        Ok(self.extractor.extract_memories(&conversation))
    }

    /// Load the backend for `config` and make it the default for later turns
    pub async fn load_model(&self, config: ModelConfig) -> AliceResult<()> {
        config.validate()?;
        self.backend.load(&config).await?;
        tracing::info!("Model {} loaded on backend '{}'", config.model_name, self.backend.name());
        *self.model.write().await = config;
        Ok(())
    }

    pub async fn model_status(&self) -> ModelStatus {
        ModelStatus {
            backend: self.backend.name().to_string(),
            loaded: self.backend.is_loaded(),
            model: self.model.read().await.clone(),
        }
    }
}

fn user_question_count(conversation: &Conversation) -> usize {
    conversation
        .messages()
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.matches('?').count())
        .sum()
}
