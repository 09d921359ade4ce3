//! Analysis tools backed by a single prompted model call.

use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{
    required_arg, CapabilityProvider, Tool, ToolArgs, ToolError, ToolName, ToolParameter,
};

const SEO_ANALYSIS_TEMPLATE: &str = "Analyze this text for SEO optimization:
{text}
Provide recommendations on:
1. Primary keyword opportunities
2. Secondary keywords to include
3. Heading structure improvements
4. Meta description suggestion
5. Readability improvements";

const GRAMMAR_CHECK_TEMPLATE: &str = "Please check and correct the grammar in this text:
{text}
Return the corrected version with explanations of major changes.";

const SOCIAL_POST_TEMPLATE: &str = "Create a {platform} post based on this content:
{text}
Include:
- Appropriate length for the platform
- Relevant hashtags
- Engaging emojis
- A call-to-action";

/// A tool whose output is the model's answer to a fixed prompt template.
///
/// Every declared parameter is required and substituted into the template at
/// its `{name}` placeholder.
pub struct PromptTool {
    name: ToolName,
    description: String,
    parameters: Vec<ToolParameter>,
    template: &'static str,
    provider: Arc<dyn CapabilityProvider>,
}

impl PromptTool {
    fn build(
        name: &str,
        description: &str,
        parameters: Vec<ToolParameter>,
        template: &'static str,
        provider: Arc<dyn CapabilityProvider>,
    ) -> Result<Self, ToolError> {
        let name = ToolName::new(name)
            .ok_or_else(|| ToolError::permanent(format!("invalid tool name '{name}'")))?;
        Ok(Self {
            name,
            description: description.to_string(),
            parameters,
            template,
            provider,
        })
    }

    /// `seo_analysis(text)`: keyword, heading and meta description advice.
    ///
    /// # Errors
    ///
    /// Never in practice; the name is a valid constant.
    pub fn seo_analysis(provider: Arc<dyn CapabilityProvider>) -> Result<Self, ToolError> {
        Self::build(
            "seo_analysis",
            "Analyzes text for SEO optimization opportunities",
            vec![ToolParameter::required("text", "The text to analyze")],
            SEO_ANALYSIS_TEMPLATE,
            provider,
        )
    }

    /// `grammar_check(text)`: corrected text plus notes on major changes.
    ///
    /// # Errors
    ///
    /// Never in practice; the name is a valid constant.
    pub fn grammar_check(provider: Arc<dyn CapabilityProvider>) -> Result<Self, ToolError> {
        Self::build(
            "grammar_check",
            "Checks and corrects grammar in text",
            vec![ToolParameter::required("text", "The text to correct")],
            GRAMMAR_CHECK_TEMPLATE,
            provider,
        )
    }

    /// `social_post_generator(text, platform)`: one post for the platform.
    ///
    /// # Errors
    ///
    /// Never in practice; the name is a valid constant.
    pub fn social_post_generator(
        provider: Arc<dyn CapabilityProvider>,
    ) -> Result<Self, ToolError> {
        Self::build(
            "social_post_generator",
            "Generates platform-specific social media posts",
            vec![
                ToolParameter::required("text", "The content to promote"),
                ToolParameter::required("platform", "Target platform, e.g. Twitter, LinkedIn"),
            ],
            SOCIAL_POST_TEMPLATE,
            provider,
        )
    }

    fn render(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let mut prompt = self.template.to_string();
        for parameter in &self.parameters {
            let value = required_arg(args, &parameter.name)?;
            prompt = prompt.replace(&format!("{{{}}}", parameter.name), value);
        }
        Ok(prompt)
    }
}

#[async_trait]
impl Tool for PromptTool {
    fn name(&self) -> &ToolName {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        self.parameters.clone()
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let prompt = self.render(args)?;
        tracing::debug!(
            tool = %self.name,
            provider = self.provider.name(),
            "Prompting provider"
        );
        let answer = self.provider.generate_text(&prompt, &[]).await?;
        Ok(answer)
    }
}
