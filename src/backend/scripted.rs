use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;

use crate::agent::{ChatResponse, Message, ModelConfig, Role};
use crate::context::MEMORY_PREFIX;
use crate::error::{AliceError, AliceResult};
use super::{check_loadable, model_info, GenerationBackend};

const GREETINGS: &[&str] = &["hello", "hi", "hey", "greetings"];
const THANKS: &[&str] = &["thanks", "thank", "thx"];
const FAREWELLS: &[&str] = &["bye", "goodbye", "farewell"];
const HELP: &[&str] = &["help", "commands"];
const MEMORY_CUES: &[&str] = &["remember", "remind", "my", "i"];

const INTRO: &str = "Hello! I'm Alice. Tell me things you'd like me to remember and ask me about them later.";
const FALLBACK: &str = "I see. Tell me more, or ask me about something you've shared before.";

/// Deterministic keyword responder
///
/// Replies depend only on the last user message and the memory messages in
/// the context, so tests can assert on exact output.
#[derive(Default)]
pub struct ScriptedBackend {
    loaded: AtomicBool,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn reply(messages: &[Message]) -> String {
        let Some(last) = messages.iter().rev().find(|m| m.role == Role::User) else {
            return INTRO.to_string();
        };

        let text = last.content.to_lowercase();
        let words: HashSet<&str> = text
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|w| !w.is_empty())
            .collect();
        let has_any = |list: &[&str]| list.iter().any(|w| words.contains(w));

        let recalled: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .filter_map(|m| m.content.strip_prefix(MEMORY_PREFIX))
            .collect();

        if text.contains('?') && !recalled.is_empty() {
            return format!("From what I remember: {}.", recalled.join("; "));
        }
        if has_any(GREETINGS) {
            return INTRO.to_string();
        }
        if has_any(THANKS) {
            return "You're welcome! Anything else I should keep in mind?".to_string();
        }
        if has_any(FAREWELLS) {
            return "Goodbye! I'll keep our conversation saved for next time.".to_string();
        }
        if has_any(HELP) {
            return "You can tell me facts like \"my keys are in the drawer\" and ask about them later. \
                    Type /help in the console for commands."
                .to_string();
        }
        if text.contains('?') {
            return "I don't have anything on that yet. Could you tell me?".to_string();
        }
        if has_any(MEMORY_CUES) {
            return format!("Got it, I'll remember that: {}", last.content.trim());
        }
        FALLBACK.to_string()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn load(&self, config: &ModelConfig) -> AliceResult<()> {
        check_loadable(self.name(), config)?;
        if !self.loaded.swap(true, Ordering::SeqCst) {
            tracing::info!("Scripted backend ready (model '{}')", config.model_name);
        }
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    async fn generate(&self, messages: &[Message], config: &ModelConfig) -> AliceResult<ChatResponse> {
        if !self.is_loaded() {
            return Err(AliceError::BackendNotReady);
        }
        let start = Instant::now();
        let mut response = ChatResponse::new(Message::assistant(Self::reply(messages)));
        response.confidence = Some(1.0);
        response.processing_time = Some(start.elapsed().as_secs_f64());
        response.model_info = Some(model_info(self.name(), config));
        Ok(response)
    }
}
