use std::collections::BTreeMap;

use async_trait::async_trait;
use pipeline::{ArtifactError, ArtifactKey, ArtifactStore};
use tokio::sync::RwLock;

/// In-process artifact store.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: RwLock<BTreeMap<ArtifactKey, String>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently stored, in sorted order.
    pub async fn keys(&self) -> Vec<ArtifactKey> {
        self.artifacts.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn write(&self, key: &ArtifactKey, content: &str) -> Result<(), ArtifactError> {
        self.artifacts
            .write()
            .await
            .insert(key.clone(), content.to_string());
        Ok(())
    }

    async fn read(&self, key: &ArtifactKey) -> Result<Option<String>, ArtifactError> {
        Ok(self.artifacts.read().await.get(key).cloned())
    }

    async fn remove(&self, key: &ArtifactKey) -> Result<(), ArtifactError> {
        self.artifacts.write().await.remove(key);
        Ok(())
    }
}
