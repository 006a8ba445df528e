//! Generation backends
//!
//! The orchestrator only needs three things from a language model: load it,
//! ask whether it is loaded, and generate one reply for a bounded list of
//! role-tagged messages. [`GenerationBackend`] is that contract.
//!
//! - [`ScriptedBackend`]: deterministic keyword responder for demos and tests
//! - [`HttpBackend`]: OpenAI-compatible `/chat/completions` client (feature `http-backend`)

mod scripted;
#[cfg(feature = "http-backend")]
mod http;

pub use scripted::ScriptedBackend;
#[cfg(feature = "http-backend")]
pub use http::HttpBackend;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::{ChatResponse, Message, Metadata, ModelConfig};
use crate::error::{AliceError, AliceResult};

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short backend name reported in `model_info`
    fn name(&self) -> &str;

    /// Prepare the backend for `config`; calling it again is harmless
    async fn load(&self, config: &ModelConfig) -> AliceResult<()>;

    fn is_loaded(&self) -> bool;

    /// Produce one assistant message for `messages`
    async fn generate(&self, messages: &[Message], config: &ModelConfig) -> AliceResult<ChatResponse>;
}

/// Which backend to construct at startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    #[default]
    Scripted,
    Http {
        base_url: String,
        /// Environment variable holding the bearer token, if any
        #[serde(default)]
        api_key_env: Option<String>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

fn default_timeout_secs() -> u64 {
    120
}

impl BackendConfig {
    /// Parse the short `--backend` flag form: `scripted` or an http(s) base URL
    pub fn from_flag(value: &str) -> AliceResult<Self> {
        match value {
            "scripted" => Ok(BackendConfig::Scripted),
            url if url.starts_with("http://") || url.starts_with("https://") => Ok(BackendConfig::Http {
                base_url: url.to_string(),
                api_key_env: Some("OPENAI_API_KEY".to_string()),
                timeout_secs: default_timeout_secs(),
            }),
            other => Err(AliceError::Configuration(format!("Unknown backend: {}", other))),
        }
    }
}

pub fn open_backend(config: &BackendConfig) -> AliceResult<Arc<dyn GenerationBackend>> {
    match config {
        BackendConfig::Scripted => Ok(Arc::new(ScriptedBackend::new())),
        #[cfg(feature = "http-backend")]
        BackendConfig::Http { base_url, api_key_env, timeout_secs } => Ok(Arc::new(HttpBackend::new(
            base_url,
            api_key_env.clone(),
            std::time::Duration::from_secs(*timeout_secs),
        )?)),
        #[cfg(not(feature = "http-backend"))]
        BackendConfig::Http { .. } => Err(AliceError::Configuration(
            "http backend requires the `http-backend` feature".to_string(),
        )),
    }
}

/// Reject a model config at load time; a refused load is a backend failure
pub(crate) fn check_loadable(backend: &str, config: &ModelConfig) -> AliceResult<()> {
    config
        .validate()
        .map_err(|e| AliceError::BackendFailure(format!("{} backend cannot load {}: {}", backend, config.model_name, e)))
}

pub(crate) fn model_info(backend: &str, config: &ModelConfig) -> Metadata {
    let mut info = Metadata::new();
    info.insert("model_name".to_string(), config.model_name.clone().into());
    info.insert("backend".to_string(), backend.into());
    info
}
