use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pipeline::{ArtifactError, ArtifactKey, ArtifactStore};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Stores each artifact as a file at `<root>/<key>`.
///
/// Writes go to a hidden temporary sibling that is synced and then renamed
/// over the target, so readers see either the previous content or the new
/// content, never a torn file.
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    root: PathBuf,
}

impl FileArtifactStore {
    /// Creates a store rooted at `root`. The directory is created on first
    /// write if it does not exist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the artifact for `key` lives on disk.
    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    async fn write_atomic(&self, path: &Path, content: &str) -> std::io::Result<()> {
        let parent = path.parent().unwrap_or(self.root.as_path());
        tokio::fs::create_dir_all(parent).await?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("artifact");
        let tmp = parent.join(format!(".{file_name}.{}.tmp", Uuid::new_v4()));

        let result = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(content.as_bytes()).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, path).await
        }
        .await;

        if result.is_err() {
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        result
    }
}

fn io_error(key: &ArtifactKey, err: std::io::Error) -> ArtifactError {
    ArtifactError::Io {
        key: key.clone(),
        message: err.to_string(),
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn write(&self, key: &ArtifactKey, content: &str) -> Result<(), ArtifactError> {
        let path = self.path_for(key);
        self.write_atomic(&path, content)
            .await
            .map_err(|e| io_error(key, e))?;
        tracing::debug!(artifact = %key, path = %path.display(), bytes = content.len(), "Artifact written");
        Ok(())
    }

    async fn read(&self, key: &ArtifactKey) -> Result<Option<String>, ArtifactError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key, e)),
        }
    }

    async fn remove(&self, key: &ArtifactKey) -> Result<(), ArtifactError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => {
                tracing::debug!(artifact = %key, "Stale artifact removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> ArtifactKey {
        ArtifactKey::new(k).unwrap()
    }

    #[tokio::test]
    async fn write_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());

        store.write(&key("final-blog-post.md"), "# Title\n").await.unwrap();

        let content = store.read(&key("final-blog-post.md")).await.unwrap();
        assert_eq!(content.as_deref(), Some("# Title\n"));
        assert!(dir.path().join("final-blog-post.md").is_file());
    }

    #[tokio::test]
    async fn overwrite_leaves_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());

        store.write(&key("draft.md"), "one").await.unwrap();
        store.write(&key("draft.md"), "two").await.unwrap();

        assert_eq!(store.read(&key("draft.md")).await.unwrap().as_deref(), Some("two"));
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn nested_keys_create_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path().join("out"));

        store.write(&key("runs/latest/kit.md"), "kit").await.unwrap();

        assert!(dir.path().join("out/runs/latest/kit.md").is_file());
    }

    #[tokio::test]
    async fn missing_artifacts_read_as_none_and_remove_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::new(dir.path());

        assert_eq!(store.read(&key("absent.md")).await.unwrap(), None);
        store.remove(&key("absent.md")).await.unwrap();

        store.write(&key("present.md"), "x").await.unwrap();
        store.remove(&key("present.md")).await.unwrap();
        assert_eq!(store.read(&key("present.md")).await.unwrap(), None);
    }
}
