use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::{ChatResponse, Message, ModelConfig};
use crate::error::{AliceError, AliceResult};
use super::{check_loadable, model_info, GenerationBackend};

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    api_key_env: Option<String>,
    loaded: AtomicBool,
}

impl HttpBackend {
    pub fn new(base_url: &str, api_key_env: Option<String>, timeout: Duration) -> AliceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AliceError::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key_env,
            loaded: AtomicBool::new(false),
        })
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn api_key(&self) -> AliceResult<Option<String>> {
        match &self.api_key_env {
            None => Ok(None),
            Some(name) => std::env::var(name).map(Some).map_err(|_| {
                AliceError::BackendFailure(format!("Environment variable {} is not set", name))
            }),
        }
    }

    fn request<'a>(messages: &'a [Message], config: &'a ModelConfig) -> ChatRequest<'a> {
        ChatRequest {
            model: &config.model_name,
            messages: messages
                .iter()
                .map(|m| ChatMessage { role: m.role.as_str(), content: &m.content })
                .collect(),
            max_tokens: config.max_length,
            temperature: if config.do_sample { config.temperature } else { 0.0 },
            top_p: config.top_p,
        }
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn load(&self, config: &ModelConfig) -> AliceResult<()> {
        check_loadable(self.name(), config)?;
        self.api_key()?;
        if !self.loaded.swap(true, Ordering::SeqCst) {
            tracing::info!("HTTP backend ready: {} (model '{}')", self.base_url, config.model_name);
        }
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    #[tracing::instrument(skip(self, messages, config), fields(model = %config.model_name))]
    async fn generate(&self, messages: &[Message], config: &ModelConfig) -> AliceResult<ChatResponse> {
        if !self.is_loaded() {
            return Err(AliceError::BackendNotReady);
        }
        let start = Instant::now();

        let mut builder = self.client.post(self.url()).json(&Self::request(messages, config));
        if let Some(key) = self.api_key()? {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AliceError::BackendFailure(format!("HTTP request failed: {}", e)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AliceError::BackendFailure(format!("Failed to read response: {}", e)))?;
        if !status.is_success() {
            return Err(AliceError::BackendFailure(format!("HTTP {}: {}", status, body)));
        }

        let completion: ChatCompletion = serde_json::from_str(&body)
            .map_err(|e| AliceError::BackendFailure(format!("Unexpected response: {}", e)))?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AliceError::BackendFailure("Response contained no choices".to_string()))?;

        let mut info = model_info(self.name(), config);
        info.insert("base_url".to_string(), self.base_url.clone().into());

        let mut reply = ChatResponse::new(Message::assistant(content.trim()));
        reply.processing_time = Some(start.elapsed().as_secs_f64());
        reply.model_info = Some(info);
        Ok(reply)
    }
}
