use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::agent::ModelConfig;
use crate::backend::BackendConfig;
use crate::context::{DEFAULT_MEMORY_CAP, DEFAULT_WINDOW};
use crate::error::{AliceError, AliceResult};
use crate::storage::StorageKind;

pub const DEFAULT_PERSONALITY: &str = "memory_focused";

/// Configuration for Alice
///
/// Every field has a default, so a config file only needs the values it
/// wants to change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub storage: StorageKind,
    pub backend: BackendConfig,
    pub model: ModelConfig,
    /// Named model configurations selectable at runtime
    pub presets: BTreeMap<String, ModelConfig>,
    /// Named system prompts
    pub system_prompts: BTreeMap<String, String>,
    /// Key into `system_prompts` used for new conversations
    pub personality: String,
    pub context_window: usize,
    pub memory_cap: usize,
    /// Add memories recorded through the memory store to each turn's pool
    pub use_stored_memories: bool,
    pub enhance_responses: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            storage: StorageKind::default(),
            backend: BackendConfig::default(),
            model: ModelConfig::default(),
            presets: default_presets(),
            system_prompts: default_system_prompts(),
            personality: DEFAULT_PERSONALITY.to_string(),
            context_window: DEFAULT_WINDOW,
            memory_cap: DEFAULT_MEMORY_CAP,
            use_stored_memories: true,
            enhance_responses: false,
        }
    }
}

impl Config {
    /// Load a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> AliceResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&data).map_err(|e| {
            AliceError::Configuration(format!("Invalid config file '{}': {}", path.display(), e))
        })?;
        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> AliceResult<()> {
        self.model
            .validate()
            .map_err(|e| AliceError::Configuration(format!("model: {}", e)))?;
        for (name, preset) in &self.presets {
            preset
                .validate()
                .map_err(|e| AliceError::Configuration(format!("preset '{}': {}", name, e)))?;
        }
        if !self.system_prompts.contains_key(&self.personality) {
            return Err(AliceError::Configuration(format!(
                "Unknown personality '{}'",
                self.personality
            )));
        }
        Ok(())
    }

    /// System prompt of the configured personality
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompts.get(&self.personality).map(String::as_str)
    }

    pub fn preset(&self, name: &str) -> AliceResult<ModelConfig> {
        self.presets
            .get(name)
            .cloned()
            .ok_or_else(|| AliceError::InvalidInput(format!("Unknown model preset '{}'", name)))
    }
}

fn default_presets() -> BTreeMap<String, ModelConfig> {
    [
        ("distilgpt2", ModelConfig::named("distilgpt2", 256, 0.8)),
        ("dialogpt-small", ModelConfig::named("microsoft/DialoGPT-small", 256, 0.8)),
        ("dialogpt-medium", ModelConfig::named("microsoft/DialoGPT-medium", 512, 0.7)),
        ("gpt2", ModelConfig::named("gpt2", 512, 0.7)),
    ]
    .into_iter()
    .map(|(name, config)| (name.to_string(), config))
    .collect()
}

fn default_system_prompts() -> BTreeMap<String, String> {
    [
        (
            "assistant",
            "You are Alice, a helpful AI assistant. You are friendly, knowledgeable, and always try to be \
             helpful. You can remember things that users tell you.",
        ),
        (
            "casual",
            "You are Alice, a casual and friendly AI companion. Keep conversations light and engaging.",
        ),
        (
            "professional",
            "You are Alice, a professional AI assistant. Provide clear, concise, and accurate information.",
        ),
        (
            "creative",
            "You are Alice, a creative AI assistant. Help users with creative tasks, brainstorming, and \
             innovative solutions.",
        ),
        (
            "memory_focused",
            "You are Alice, an AI assistant with excellent memory. You remember everything users tell you \
             and can recall information when needed. You help users keep track of important things like \
             where they put items, important dates, and personal information.",
        ),
    ]
    .into_iter()
    .map(|(name, prompt)| (name.to_string(), prompt.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.context_window, 10);
        assert_eq!(config.memory_cap, 3);
        assert_eq!(config.presets.len(), 4);
        assert!(config.system_prompt().unwrap().contains("excellent memory"));
        assert_eq!(config.preset("gpt2").unwrap().max_length, 512);
        assert!(config.preset("gpt5").is_err());
        config.validate().unwrap();
    }

    #[test]
    fn test_from_file_partial() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("alice.json");
        std::fs::write(
            &path,
            r#"{"storage": "memory", "personality": "casual", "model": {"temperature": 0.2}}"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.storage, StorageKind::Memory);
        assert_eq!(config.model.temperature, 0.2);
        assert_eq!(config.model.max_length, 512);
        assert!(config.system_prompt().unwrap().starts_with("You are Alice, a casual"));
        assert!(!config.enhance_responses);
        assert!(config.use_stored_memories);
    }

    #[test]
    fn test_from_file_rejects_unknown_personality() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("alice.json");
        std::fs::write(&path, r#"{"personality": "grumpy"}"#).unwrap();
        assert!(matches!(Config::from_file(&path), Err(AliceError::Configuration(_))));
    }
}
