//! Interactive session state

use std::sync::Arc;

use crate::analysis::ConversationAnalysis;
use crate::error::{AliceError, AliceResult};
use super::types::{ChatResponse, Conversation, ConversationId, MemoryItem};
use super::Agent;

/// Keeps track of the conversation a console user is talking in
pub struct Session {
    agent: Arc<Agent>,
    system_prompt: Option<String>,
    current: Option<ConversationId>,
}

impl Session {
    pub fn new(agent: Arc<Agent>, system_prompt: Option<String>) -> Self {
        Self {
            agent,
            system_prompt,
            current: None,
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Start a fresh conversation and make it current
    pub async fn start_new(&mut self) -> AliceResult<ConversationId> {
        let conversation = self.agent.start_conversation(self.system_prompt.as_deref()).await?;
        self.current = Some(conversation.id.clone());
        Ok(conversation.id)
    }

    /// Continue an existing conversation
    pub async fn resume(&mut self, conversation_id: &str) -> AliceResult<()> {
        self.agent.conversation_history(conversation_id).await?;
        self.current = Some(conversation_id.to_string());
        Ok(())
    }

    async fn ensure_current(&mut self) -> AliceResult<ConversationId> {
        if let Some(id) = &self.current {
            return Ok(id.clone());
        }
        self.start_new().await
    }

    /// Send a message in the current conversation, starting one if needed
    pub async fn send(&mut self, text: &str) -> AliceResult<ChatResponse> {
        let id = self.ensure_current().await?;
        self.agent.send_message(&id, text, None).await
    }

    fn require_current(&self) -> AliceResult<&str> {
        self.current_id()
            .ok_or_else(|| AliceError::InvalidInput("No active conversation".to_string()))
    }

    pub async fn history(&self) -> AliceResult<Conversation> {
        self.agent.conversation_history(self.require_current()?).await
    }

    pub async fn analyze(&self) -> AliceResult<ConversationAnalysis> {
        self.agent.analyze(self.require_current()?).await
    }

    pub async fn memories(&self) -> AliceResult<Vec<MemoryItem>> {
        self.agent.memories(self.require_current()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScriptedBackend;
    use crate::storage::InMemoryStorage;

    fn session() -> Session {
        let agent = Agent::new(Arc::new(InMemoryStorage::new()), Arc::new(ScriptedBackend::new()));
        Session::new(Arc::new(agent), Some("You are Alice.".to_string()))
    }

    #[tokio::test]
    async fn test_send_starts_conversation_on_demand() {
        let mut session = session();
        assert!(session.current_id().is_none());
        assert!(session.history().await.is_err());

        session.send("I love hiking").await.unwrap();
        let id = session.current_id().unwrap().to_string();

        session.send("thanks").await.unwrap();
        assert_eq!(session.current_id(), Some(id.as_str()));

        let history = session.history().await.unwrap();
        assert_eq!(history.message_count(), 5);
        assert_eq!(session.memories().await.unwrap()[0].key, "love");
        assert_eq!(session.analyze().await.unwrap().user_message_count, 2);
    }

    #[tokio::test]
    async fn test_start_new_and_resume() {
        let mut session = session();
        let first = session.start_new().await.unwrap();
        let second = session.start_new().await.unwrap();
        assert_ne!(first, second);

        session.resume(&first).await.unwrap();
        assert_eq!(session.current_id(), Some(first.as_str()));
        assert!(session.resume("missing").await.unwrap_err().is_not_found());
        assert_eq!(session.current_id(), Some(first.as_str()));
    }
}
