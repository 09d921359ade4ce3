//! The user-facing trigger: one topic in, a finished post and social media
//! kit out.

use std::sync::Arc;

use pipeline::{ArtifactKey, ArtifactStore, CompletedRun, PipelineError, PipelineRunId, StageName};

use crate::blog::{key, FINAL_POST_KEY, SOCIAL_KIT_KEY};
use crate::executor::PipelineExecutor;
use crate::social::SocialMediaKit;

/// The artifacts a successful generation leaves behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedContent {
    /// The run that produced this content.
    pub run_id: PipelineRunId,
    /// The publication-ready blog post.
    pub final_artifact: String,
    /// The social media kit, parsed.
    pub social_kit: SocialMediaKit,
    /// The social media kit exactly as the social stage produced it.
    pub social_kit_text: String,
}

/// Runs the pipeline and collects the published artifacts of that run.
pub struct ContentGenerator {
    executor: PipelineExecutor,
    store: Arc<dyn ArtifactStore>,
    final_post: Published,
    social_kit: Published,
}

/// A persisted artifact and the stage that writes it.
struct Published {
    stage: StageName,
    key: ArtifactKey,
}

impl ContentGenerator {
    /// Wraps an executor whose pipeline persists the final post and the social
    /// kit under the standard keys.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidDefinition`] if the pipeline does not persist
    /// both artifacts.
    pub fn new(executor: PipelineExecutor) -> Result<Self, PipelineError> {
        let final_post = published(&executor, key(FINAL_POST_KEY)?)?;
        let social_kit = published(&executor, key(SOCIAL_KIT_KEY)?)?;

        let store = Arc::clone(executor.store());
        Ok(Self {
            executor,
            store,
            final_post,
            social_kit,
        })
    }

    /// Generates a blog post and social media kit for `topic`.
    ///
    /// The returned texts are this run's own stage results; the store is only
    /// checked for their presence, so overlapping runs never see each other's
    /// content.
    ///
    /// # Errors
    ///
    /// - Any error from [`PipelineExecutor::run`].
    /// - [`PipelineError::ArtifactMissing`] if the run succeeded but an
    ///   artifact is absent from the store.
    /// - [`PipelineError::InvalidState`] if the kit does not parse.
    pub async fn generate(&self, topic: &str) -> Result<GeneratedContent, PipelineError> {
        let run = self.executor.run(topic).await?;

        let final_artifact = self.collect(&run, &self.final_post).await?;
        let social_kit_text = self.collect(&run, &self.social_kit).await?;
        let social_kit =
            SocialMediaKit::parse(&social_kit_text).map_err(|e| PipelineError::InvalidState {
                reason: format!("social media kit is invalid: {e}"),
            })?;

        tracing::info!(run_id = %run.id(), "Content generated");
        Ok(GeneratedContent {
            run_id: run.id(),
            final_artifact,
            social_kit,
            social_kit_text,
        })
    }

    async fn collect(&self, run: &CompletedRun, artifact: &Published) -> Result<String, PipelineError> {
        if self.store.read(&artifact.key).await?.is_none() {
            return Err(PipelineError::ArtifactMissing {
                key: artifact.key.clone(),
            });
        }
        run.result(&artifact.stage)
            .map(|result| result.text().to_string())
            .ok_or_else(|| PipelineError::InvalidState {
                reason: format!("run {} has no result for stage '{}'", run.id(), artifact.stage),
            })
    }
}

fn published(executor: &PipelineExecutor, key: ArtifactKey) -> Result<Published, PipelineError> {
    let stage = executor
        .definition()
        .stages()
        .iter()
        .find(|stage| stage.output() == Some(&key))
        .map(|stage| stage.name().clone())
        .ok_or_else(|| PipelineError::InvalidDefinition {
            reason: format!("pipeline never persists '{key}'"),
        })?;
    Ok(Published { stage, key })
}
