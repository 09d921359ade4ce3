//! The social media kit produced by the promotion stage.
//!
//! The stage is asked for a JSON object; [`SocialKitContract`] rejects any
//! output that does not parse into a [`SocialMediaKit`] with the required
//! post mix, so a malformed kit is retried instead of persisted.

use std::fmt::Write as _;

use pipeline::OutputContract;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest Twitter/X post accepted, hashtags included.
pub const TWITTER_MAX_CHARS: usize = 280;

const REQUIRED_POSTS: [(Platform, usize); 3] = [
    (Platform::Twitter, 2),
    (Platform::LinkedIn, 1),
    (Platform::Instagram, 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[serde(alias = "x", alias = "Twitter", alias = "X")]
    Twitter,
    #[serde(alias = "LinkedIn", alias = "Linkedin")]
    LinkedIn,
    #[serde(alias = "Instagram")]
    Instagram,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Twitter => "Twitter/X",
            Self::LinkedIn => "LinkedIn",
            Self::Instagram => "Instagram",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialPost {
    pub platform: Platform,
    pub text: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

impl SocialPost {
    /// The post as published: its text followed by any hashtags the text does
    /// not already contain.
    pub fn rendered(&self) -> String {
        let mut out = self.text.trim().to_string();
        for tag in &self.hashtags {
            let tag = normalize_hashtag(tag);
            if !tag.is_empty() && !out.contains(&tag) {
                out.push(' ');
                out.push_str(&tag);
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingTime {
    pub platform: Platform,
    pub window: String,
}

/// Platform posts plus the promotion plan around them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialMediaKit {
    pub posts: Vec<SocialPost>,
    #[serde(default)]
    pub posting_times: Vec<PostingTime>,
    #[serde(default)]
    pub engagement_tips: Vec<String>,
    #[serde(default)]
    pub calls_to_action: Vec<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SocialKitError {
    #[error("output contains no JSON object")]
    NoJson,

    #[error("malformed social media kit: {0}")]
    Malformed(String),

    #[error("expected {expected} {platform} post(s), found {found}")]
    PostCount {
        platform: Platform,
        expected: usize,
        found: usize,
    },

    #[error("{platform} post is empty")]
    EmptyPost { platform: Platform },

    #[error("{platform} post is {chars} characters long (limit {limit})")]
    TooLong {
        platform: Platform,
        chars: usize,
        limit: usize,
    },
}

impl SocialMediaKit {
    /// Extracts and validates a kit from model output.
    ///
    /// The JSON object may be wrapped in prose or a Markdown code fence; the
    /// text from the first `{` to the last `}` is parsed.
    ///
    /// # Errors
    ///
    /// [`SocialKitError`] describing the first problem found.
    pub fn parse(output: &str) -> Result<Self, SocialKitError> {
        let (Some(start), Some(end)) = (output.find('{'), output.rfind('}')) else {
            return Err(SocialKitError::NoJson);
        };
        if end < start {
            return Err(SocialKitError::NoJson);
        }
        let kit: Self = serde_json::from_str(&output[start..=end])
            .map_err(|e| SocialKitError::Malformed(e.to_string()))?;
        kit.validate()?;
        Ok(kit)
    }

    /// Checks the post mix and per-platform constraints.
    ///
    /// # Errors
    ///
    /// [`SocialKitError`] describing the first violation.
    pub fn validate(&self) -> Result<(), SocialKitError> {
        for (platform, expected) in REQUIRED_POSTS {
            let found = self.posts_for(platform).count();
            if found != expected {
                return Err(SocialKitError::PostCount {
                    platform,
                    expected,
                    found,
                });
            }
        }

        for post in &self.posts {
            if post.text.trim().is_empty() {
                return Err(SocialKitError::EmptyPost {
                    platform: post.platform,
                });
            }
            if post.platform == Platform::Twitter {
                let chars = post.rendered().chars().count();
                if chars > TWITTER_MAX_CHARS {
                    return Err(SocialKitError::TooLong {
                        platform: post.platform,
                        chars,
                        limit: TWITTER_MAX_CHARS,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn posts_for(&self, platform: Platform) -> impl Iterator<Item = &SocialPost> {
        self.posts.iter().filter(move |p| p.platform == platform)
    }

    /// Renders the kit as a Markdown document.
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# Social Media Kit\n");

        for (platform, _) in REQUIRED_POSTS {
            let _ = write!(out, "\n## {platform}\n");
            for (i, post) in self.posts_for(platform).enumerate() {
                let _ = write!(out, "\n### Post {}\n\n{}\n", i + 1, post.rendered());
            }
        }

        if !self.posting_times.is_empty() {
            out.push_str("\n## Suggested Posting Times\n\n");
            for time in &self.posting_times {
                let _ = writeln!(out, "- **{}**: {}", time.platform, time.window);
            }
        }
        push_list(&mut out, "Engagement Tips", &self.engagement_tips);
        push_list(&mut out, "Calls to Action", &self.calls_to_action);
        out
    }
}

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = write!(out, "\n## {heading}\n\n");
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
}

fn normalize_hashtag(tag: &str) -> String {
    let tag = tag.trim();
    if tag.is_empty() || tag.starts_with('#') {
        tag.to_string()
    } else {
        format!("#{tag}")
    }
}

/// Output contract for the social stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocialKitContract;

impl OutputContract for SocialKitContract {
    fn name(&self) -> &str {
        "social-media-kit"
    }

    fn check(&self, output: &str) -> Result<(), String> {
        SocialMediaKit::parse(output).map(|_| ()).map_err(|e| e.to_string())
    }
}
