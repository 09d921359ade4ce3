//! Settings read from the process environment (after `.env` is loaded).

use std::path::PathBuf;

use pipeline::PipelineError;

pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const SERPER_API_KEY: &str = "SERPER_API_KEY";
pub const MODEL: &str = "INSIGHTFORGE_MODEL";
pub const OUTPUT_DIR: &str = "INSIGHTFORGE_OUTPUT_DIR";
pub const MAX_ATTEMPTS: &str = "INSIGHTFORGE_MAX_ATTEMPTS";
pub const OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Everything `generate` needs to wire the pipeline.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub google_api_key: String,
    pub serper_api_key: String,
    pub model: String,
    pub output_dir: PathBuf,
    pub max_attempts: u32,
    pub otlp_endpoint: Option<String>,
}

impl Settings {
    /// Reads settings through `env`, which returns the value of a variable
    /// if it is set.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ConfigurationError`] if a key is missing or
    /// `INSIGHTFORGE_MAX_ATTEMPTS` is not a positive integer.
    pub fn load(env: impl Fn(&str) -> Option<String>) -> Result<Self, PipelineError> {
        let max_attempts = match non_empty(&env, MAX_ATTEMPTS) {
            None => DEFAULT_MAX_ATTEMPTS,
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(PipelineError::ConfigurationError {
                        message: format!("{MAX_ATTEMPTS} must be a positive integer, got '{raw}'"),
                    })
                }
            },
        };

        Ok(Self {
            google_api_key: required(&env, GOOGLE_API_KEY)?,
            serper_api_key: required(&env, SERPER_API_KEY)?,
            model: non_empty(&env, MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            output_dir: output_dir(&env),
            max_attempts,
            otlp_endpoint: non_empty(&env, OTLP_ENDPOINT),
        })
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("model", &self.model)
            .field("output_dir", &self.output_dir)
            .field("max_attempts", &self.max_attempts)
            .field("otlp_endpoint", &self.otlp_endpoint)
            .finish_non_exhaustive()
    }
}

/// Where artifacts are written; `.` unless overridden.
pub fn output_dir(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    non_empty(&env, OUTPUT_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn non_empty(env: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    env(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(env: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String, PipelineError> {
    non_empty(env, name).ok_or_else(|| PipelineError::ConfigurationError {
        message: format!("{name} is not set"),
    })
}
