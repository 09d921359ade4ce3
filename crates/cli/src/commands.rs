//! Command line surface and the wiring behind each subcommand.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use artifacts::FileArtifactStore;
use clap::{Args, Parser, Subcommand};
use llm::{GeminiConfig, GeminiProvider};
use nodes::blog::{key, FINAL_POST_KEY, SOCIAL_KIT_KEY};
use nodes::{blog_pipeline, BlogTools, ContentGenerator, PipelineExecutor, RetryConfig, SocialMediaKit};
use pipeline::{ArtifactStore, CapabilityProvider, Tool};
use tools::{PromptTool, ScrapeWebsiteTool, SerperConfig, SerperSearchTool};

use crate::config::{self, Settings};
use crate::telemetry::{LogFormat, Telemetry};

const SCRAPE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Parser)]
#[command(
    name = "insightforge",
    version,
    about = "Generate a researched blog post and social media kit for a topic"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Directory artifacts are written to [env: INSIGHTFORGE_OUTPUT_DIR]
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
    /// Gemini model [env: INSIGHTFORGE_MODEL]
    #[arg(long, global = true)]
    model: Option<String>,
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the pipeline for a topic and print the results
    Generate {
        /// Blog topic, e.g. "The Rise of Open Source LLMs"
        #[arg(long)]
        topic: String,
    },
    /// Print the final post and social kit left by the last run
    Show,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let env = |name: &str| std::env::var(name).ok();
        match self.command {
            Command::Generate { topic } => {
                let mut settings = Settings::load(env)?;
                if let Some(dir) = self.global.output_dir {
                    settings.output_dir = dir;
                }
                if let Some(model) = self.global.model {
                    settings.model = model;
                }

                let telemetry =
                    Telemetry::init(self.global.log_format, settings.otlp_endpoint.as_deref())?;
                let result = generate(&settings, &topic).await;
                if let Err(e) = &result {
                    tracing::error!(error = %e, "Generation failed");
                }
                telemetry.shutdown();
                result
            }
            Command::Show => {
                let telemetry = Telemetry::init(self.global.log_format, None)?;
                let dir = self
                    .global
                    .output_dir
                    .unwrap_or_else(|| config::output_dir(env));
                let result = show(&dir).await;
                telemetry.shutdown();
                result
            }
        }
    }
}

async fn generate(settings: &Settings, topic: &str) -> anyhow::Result<()> {
    let provider: Arc<dyn CapabilityProvider> = Arc::new(GeminiProvider::new(GeminiConfig::new(
        settings.google_api_key.clone(),
        settings.model.clone(),
    ))?);
    let store: Arc<dyn ArtifactStore> = Arc::new(FileArtifactStore::new(settings.output_dir.clone()));

    let definition = blog_pipeline(blog_tools(settings, &provider)?)?;
    let executor = PipelineExecutor::new(Arc::new(definition), provider, store)
        .with_retry(RetryConfig::default().with_max_attempts(settings.max_attempts));
    let generator = ContentGenerator::new(executor)?;

    tracing::info!(
        topic,
        model = %settings.model,
        output_dir = %settings.output_dir.display(),
        "Generating content"
    );
    let content = generator.generate(topic).await?;
    tracing::info!(run_id = %content.run_id, "Content generated");

    print_artifacts(&content.final_artifact, &content.social_kit.to_markdown());
    Ok(())
}

fn blog_tools(
    settings: &Settings,
    provider: &Arc<dyn CapabilityProvider>,
) -> anyhow::Result<BlogTools> {
    let search = SerperSearchTool::new(SerperConfig::new(settings.serper_api_key.clone()))?;
    let scrape = ScrapeWebsiteTool::new(SCRAPE_TIMEOUT)?;

    Ok(BlogTools {
        research: vec![shared(search), shared(scrape)],
        seo: vec![shared(PromptTool::seo_analysis(Arc::clone(provider))?)],
        editing: vec![shared(PromptTool::grammar_check(Arc::clone(provider))?)],
        social: vec![shared(PromptTool::social_post_generator(Arc::clone(provider))?)],
    })
}

fn shared(tool: impl Tool + 'static) -> Arc<dyn Tool> {
    Arc::new(tool)
}

async fn show(dir: &Path) -> anyhow::Result<()> {
    let store = FileArtifactStore::new(dir);
    let final_key = key(FINAL_POST_KEY)?;
    let social_key = key(SOCIAL_KIT_KEY)?;

    let final_post = store
        .read(&final_key)
        .await?
        .with_context(|| format!("'{final_key}' not found in {}; run `insightforge generate` first", dir.display()))?;
    let social_text = store
        .read(&social_key)
        .await?
        .with_context(|| format!("'{social_key}' not found in {}; run `insightforge generate` first", dir.display()))?;

    let social = match SocialMediaKit::parse(&social_text) {
        Ok(kit) => kit.to_markdown(),
        Err(e) => {
            tracing::warn!(error = %e, "Social media kit is not structured; printing as stored");
            social_text
        }
    };
    print_artifacts(&final_post, &social);
    Ok(())
}

fn print_artifacts(final_post: &str, social_kit: &str) {
    println!("{}", final_post.trim_end());
    println!();
    println!("---");
    println!();
    println!("{}", social_kit.trim_end());
}
