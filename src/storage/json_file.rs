use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use futures::future::join_all;

use crate::agent::Conversation;
use crate::error::{AliceError, AliceResult};
use super::{absent_if_malformed, decode_record, most_recent, Storage};

/// One pretty-printed `<id>.json` file per conversation
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    root: PathBuf,
}

impl JsonFileStorage {
    /// Open (and create if needed) a storage directory
    pub fn new(root: impl AsRef<Path>) -> AliceResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .context(format!("Failed to create storage directory '{}'", root.display()))?;
        tracing::info!("Opened JSON conversation storage at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, id: &str) -> AliceResult<PathBuf> {
        validate_id(id)?;
        Ok(self.root.join(format!("{}.json", id)))
    }

    async fn read_record(path: &Path, id: &str) -> AliceResult<Conversation> {
        let bytes = tokio::fs::read(path).await.map_err(|e| AliceError::MalformedRecord {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
        decode_record(id, &bytes)
    }
}

/// Ids become file names, so they must stay inside the storage directory
fn validate_id(id: &str) -> AliceResult<()> {
    if id.is_empty()
        || id.starts_with('.')
        || id.contains(['/', '\\', '\0'])
        || id.contains("..")
    {
        return Err(AliceError::InvalidInput(format!("Invalid conversation id: '{}'", id)));
    }
    Ok(())
}

#[async_trait]
impl Storage for JsonFileStorage {
    async fn save(&self, conversation: &Conversation) -> AliceResult<()> {
        let path = self.record_path(&conversation.id)?;
        let tmp_path = path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(conversation)?;

        tokio::fs::write(&tmp_path, &data)
            .await
            .context(format!("Failed to write '{}'", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .context(format!("Failed to move record into place at '{}'", path.display()))?;

        tracing::debug!("Saved conversation '{}' ({} messages)", conversation.id, conversation.message_count());
        Ok(())
    }

    async fn get(&self, id: &str) -> AliceResult<Option<Conversation>> {
        let path = self.record_path(id)?;
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        absent_if_malformed(Self::read_record(&path, id).await)
    }

    async fn list(&self, limit: usize) -> AliceResult<Vec<Conversation>> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .context(format!("Failed to read storage directory '{}'", self.root.display()))?;

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            records.push((id, path));
        }

        let loaded = join_all(
            records
                .iter()
                .map(|(id, path)| Self::read_record(path, id)),
        )
        .await;

        let mut conversations = Vec::with_capacity(loaded.len());
        for result in loaded {
            match result {
                Ok(conversation) => conversations.push(conversation),
                Err(AliceError::MalformedRecord { id, reason }) => {
                    tracing::warn!("Skipping malformed record '{}': {}", id, reason);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(most_recent(conversations, limit))
    }
}
