//! The default InsightForge pipeline: research → write → SEO → edit → social.
//!
//! Each stage is owned by its own agent role, consumes the output of the
//! stage before it, and (apart from research) persists its text under a
//! fixed artifact key.

use std::sync::Arc;
use std::time::Duration;

use pipeline::{
    AgentRole, ArtifactKey, PipelineDefinition, PipelineError, PipelineName, ResourceLimits,
    RoleName, StageName, StageTask, Tool, ToolSet,
};

use crate::social::SocialKitContract;

pub const PIPELINE_NAME: &str = "insightforge-blog";

pub const RESEARCH_STAGE: &str = "research";
pub const WRITE_STAGE: &str = "write";
pub const SEO_STAGE: &str = "seo";
pub const EDIT_STAGE: &str = "edit";
pub const SOCIAL_STAGE: &str = "social";

pub const DRAFT_POST_KEY: &str = "draft-blog-post.md";
pub const SEO_POST_KEY: &str = "seo-optimized-post.md";
pub const FINAL_POST_KEY: &str = "final-blog-post.md";
pub const SOCIAL_KIT_KEY: &str = "social-media-kit.md";

/// Tool handles granted to each role of the blog pipeline.
///
/// The writer never receives tools.
#[derive(Clone, Default)]
pub struct BlogTools {
    pub research: Vec<Arc<dyn Tool>>,
    pub seo: Vec<Arc<dyn Tool>>,
    pub editing: Vec<Arc<dyn Tool>>,
    pub social: Vec<Arc<dyn Tool>>,
}

/// Builds the five-stage blog pipeline.
///
/// # Errors
///
/// [`PipelineError::InvalidDefinition`] if a tool group grants the same tool
/// twice.
pub fn blog_pipeline(tools: BlogTools) -> Result<PipelineDefinition, PipelineError> {
    let researcher = AgentRole::new(
        role("Emerging Tech Research Analyst")?,
        "Investigate and deliver deep insights on the next major trends in {topic}, \
         including risks, opportunities, and current developments backed by credible sources.",
        "You are a thought leader with a PhD in Computer Science and a decade in tech journalism. \
         You specialize in identifying high-potential innovations before they go mainstream. \
         Your trend analyses are widely referenced in academic journals and business reports.",
    )
    .with_tools(ToolSet::new(tools.research)?)
    .with_limits(ResourceLimits::unlimited().with_max_iterations(5));

    let writer = AgentRole::new(
        role("Tech Industry Blog Author")?,
        "Write a clear, engaging, blog-formatted article that educates readers about {topic}, \
         translating research into a structured, informative, and enjoyable blog experience.",
        "You're an ex-editor at MIT Technology Review and Wired. You specialize in converting \
         cutting-edge research into compelling blog articles that are accessible, structured, and valuable.",
    )
    .with_limits(ResourceLimits::unlimited().with_max_calls_per_minute(10));

    let seo_optimizer = AgentRole::new(
        role("Technical SEO Expert for AI Content")?,
        "Improve the discoverability and performance of blog content about {topic} by implementing \
         on-page SEO strategies such as keyword optimization, structured metadata, and internal linking.",
        "You're a former Google Search Quality Engineer who transitioned into SEO consultancy. \
         You have optimized content that ranks #1 across competitive keywords in the tech space.",
    )
    .with_tools(ToolSet::new(tools.seo)?)
    .with_limits(ResourceLimits::unlimited().with_max_execution_time(Duration::from_secs(120)));

    let editor = AgentRole::new(
        role("Senior Editorial Reviewer")?,
        "Refine the blog post about {topic} by ensuring it maintains high-quality grammar, consistent tone, \
         logical flow, and clear structure, ready for publication in top-tier outlets.",
        "You've edited award-winning journalism at The New York Times and Scientific American. \
         Your edits elevate content clarity, precision, and flow while respecting the writer's voice.",
    )
    .with_tools(ToolSet::new(tools.editing)?);

    let promoter = AgentRole::new(
        role("Tech Content Growth Hacker")?,
        "Craft viral, platform-specific social media content that maximizes reach and engagement \
         for the blog post about {topic}, tailored to each platform's tone and algorithm.",
        "You've scaled blogs and YouTube channels from zero to millions of followers. \
         You deeply understand content virality, hooks, and timing across Twitter, LinkedIn, and Instagram.",
    )
    .with_tools(ToolSet::new(tools.social)?);

    let research = StageTask::new(
        stage(RESEARCH_STAGE)?,
        Arc::new(researcher),
        "Conduct in-depth research to identify the next big trend in {topic}. Your analysis should focus on:\n\
         - Identifying and explaining 3-5 key trends shaping the industry\n\
         - Analyzing the pros and cons of each trend in detail, including market reception\n\
         - Assessing the market potential for each trend, considering current and future demand\n\
         - Evaluating potential risks, including technological, regulatory, or market-based risks\n\
         Gather information from reputable sources including:\n\
         - Leading tech news platforms\n\
         - Peer-reviewed research papers or whitepapers\n\
         - Comprehensive industry reports and market surveys",
        "Comprehensive research report (3-5 paragraphs) containing:\n\
         - A detailed summary of each identified trend, including relevant data and expert opinions\n\
         - An analysis of the pros and cons for each trend, with a clear explanation of their potential impact\n\
         - A market potential assessment that includes key metrics, target demographics, and growth projections\n\
         - A risk analysis that outlines technological, regulatory, and market challenges\n\
         - Clear citations from authoritative sources to back up the findings",
    );

    let write = StageTask::new(
        stage(WRITE_STAGE)?,
        Arc::new(writer),
        "Write a blog post on the topic '{topic}' based on the research report provided.\n\n\
         The article should follow a clear blog structure, including:\n\
         - A compelling introduction that hooks the reader\n\
         - A brief context or background of the topic\n\
         - 3-5 well-organized sections, each focusing on a specific trend or insight\n\
         - Use of subheadings (H2 and H3) for readability\n\
         - Bullet points or numbered lists for key takeaways or data points\n\
         - Smooth transitions between sections\n\
         - A strong conclusion with key takeaways and forward-looking insights\n\n\
         Maintain a clear, engaging, and positive tone. Avoid jargon and ensure that the language \
         is accessible to a general audience.",
        "Final draft blog post in Markdown format (.md) that includes:\n\
         - Word count between 1300 - 1500 words\n\
         - Proper Markdown headers (## for H2, ### for H3)\n\
         - Clearly defined blog structure (intro, body with sections, conclusion)\n\
         - Bullet points or numbered lists for facts or tips\n\
         - Hyperlinks to sources (if available)\n\
         - Optimized for readability and flow\n\
         - Informative yet conversational tone",
    )
    .depends_on(stage(RESEARCH_STAGE)?)
    .persist_to(key(DRAFT_POST_KEY)?);

    let seo = StageTask::new(
        stage(SEO_STAGE)?,
        Arc::new(seo_optimizer),
        "Optimize the blog post about {topic} for maximum search engine visibility. Tasks include:\n\
         - Identifying high-priority primary and secondary keywords based on search volume and relevance\n\
         - Strategically placing primary and secondary keywords in headings, body text, and meta elements\n\
         - Improving meta elements (title, description) to increase click-through rates on search results\n\
         - Enhancing the heading structure to make it SEO-friendly and reader-friendly\n\
         - Suggesting internal links to relevant content across the site, ensuring a natural flow\n\
         - Making sure the content meets the readability and user experience standards for SEO",
        "SEO-optimized blog post with the following:\n\
         - Keyword analysis report with primary and secondary keywords highlighted\n\
         - Suggested meta title and description with SEO best practices (under 160 characters)\n\
         - Markdown annotations showing where and how keywords were integrated into headings and body\n\
         - Recommendations for internal linking opportunities (including anchor text)\n\
         - Enhanced readability, with suggestions for improving content engagement and reducing bounce rate",
    )
    .depends_on(stage(WRITE_STAGE)?)
    .persist_to(key(SEO_POST_KEY)?);

    let edit = StageTask::new(
        stage(EDIT_STAGE)?,
        Arc::new(editor),
        "Polish the blog post about {topic} to ensure it is publication-ready. Focus on:\n\
         - Correcting grammar, spelling, and punctuation errors throughout the text\n\
         - Ensuring consistent writing style and tone, with clear and concise language\n\
         - Enhancing logical flow between sections to ensure smooth transitions\n\
         - Adding or adjusting content depth to ensure the article is engaging and informative \
         without being too technical\n\
         - Ensuring proper attribution for sources and correcting any citation issues",
        "Publication-ready blog post with the following:\n\
         - Tracked changes showing all grammar, style, and content edits made\n\
         - Editor's notes on major revisions (e.g., content added/removed or restructured)\n\
         - Final formatted Markdown with appropriate headings, bullet points, and citations\n\
         - Full approval for publishing, including suggestions for any final tweaks",
    )
    .depends_on(stage(SEO_STAGE)?)
    .persist_to(key(FINAL_POST_KEY)?);

    let social = StageTask::new(
        stage(SOCIAL_STAGE)?,
        Arc::new(promoter),
        "Create promotional content for the blog post about {topic} including:\n\
         - 2 Twitter/X posts (280 chars max, hashtags included)\n\
         - 1 LinkedIn post (professional tone)\n\
         - 1 Instagram caption (with emojis)\n\
         - Hashtag suggestions for each platform",
        "A single JSON object, with no other text, of the form:\n\
         {\"posts\": [{\"platform\": \"twitter\" | \"linkedin\" | \"instagram\", \"text\": \"...\", \
         \"hashtags\": [\"#...\"]}], \
         \"posting_times\": [{\"platform\": \"...\", \"window\": \"...\"}], \
         \"engagement_tips\": [\"...\"], \"calls_to_action\": [\"...\"]}\n\
         It must hold exactly 2 twitter posts, 1 linkedin post and 1 instagram post.",
    )
    .depends_on(stage(EDIT_STAGE)?)
    .persist_to(key(SOCIAL_KIT_KEY)?)
    .with_contract(Arc::new(SocialKitContract));

    let name = PipelineName::new(PIPELINE_NAME).ok_or_else(|| invalid("pipeline name"))?;
    PipelineDefinition::new(name, vec![research, write, seo, edit, social])
}

fn role(name: &str) -> Result<RoleName, PipelineError> {
    RoleName::new(name).ok_or_else(|| invalid(name))
}

fn stage(name: &str) -> Result<StageName, PipelineError> {
    StageName::new(name).ok_or_else(|| invalid(name))
}

/// Parses one of the fixed artifact keys.
///
/// # Errors
///
/// [`PipelineError::InvalidDefinition`] if `name` is not a valid key.
pub fn key(name: &str) -> Result<ArtifactKey, PipelineError> {
    ArtifactKey::new(name).ok_or_else(|| invalid(name))
}

fn invalid(what: &str) -> PipelineError {
    PipelineError::InvalidDefinition {
        reason: format!("'{what}' is not a valid identifier"),
    }
}
