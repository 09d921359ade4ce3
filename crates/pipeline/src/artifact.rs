//! Port trait for durable artifact storage.

use async_trait::async_trait;

use crate::{ArtifactError, ArtifactKey};

/// Durable key → text storage for stage outputs.
///
/// Each key is written by exactly one stage at most once per run, so
/// implementations only need last-writer-wins semantics. A write must be
/// all-or-nothing: a reader never observes a partially written artifact.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Replaces the artifact at `key` with `content`.
    async fn write(&self, key: &ArtifactKey, content: &str) -> Result<(), ArtifactError>;

    /// Returns the artifact at `key`, or `None` if absent.
    async fn read(&self, key: &ArtifactKey) -> Result<Option<String>, ArtifactError>;

    /// Deletes the artifact at `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &ArtifactKey) -> Result<(), ArtifactError>;
}
