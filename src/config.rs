//! Assistant configuration
//!
//! Values come from the process environment (a `.env` file is loaded by the
//! binary before this runs) and can be overridden by command line flags.

use crate::error::{AssistantError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_RETRIES: u32 = 1;
pub const DEFAULT_MAX_QUERIES_PER_SESSION: usize = 5;

/// Connection settings for the text completion service
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub llm: LlmConfig,
    pub db_path: PathBuf,
    pub csv_dir: PathBuf,
    pub prompts_dir: PathBuf,
    pub max_retries: u32,
    pub statement_timeout: Option<Duration>,
    pub max_queries_per_session: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_key: None,
                model: DEFAULT_MODEL.to_string(),
                base_url: DEFAULT_BASE_URL.to_string(),
            },
            db_path: PathBuf::from("data/target.db"),
            csv_dir: PathBuf::from("data/csv"),
            prompts_dir: PathBuf::from("prompts"),
            max_retries: DEFAULT_MAX_RETRIES,
            statement_timeout: None,
            max_queries_per_session: DEFAULT_MAX_QUERIES_PER_SESSION,
        }
    }
}

impl AssistantConfig {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let llm = LlmConfig {
            api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            model: env::var("OPENAI_MODEL").unwrap_or(defaults.llm.model),
            base_url: env::var("OPENAI_BASE_URL").unwrap_or(defaults.llm.base_url),
        };

        let statement_timeout = parse_env::<u64>("ASSISTANT_STATEMENT_TIMEOUT_MS")?
            .map(Duration::from_millis);

        Ok(Self {
            llm,
            db_path: env::var("ASSISTANT_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            csv_dir: env::var("ASSISTANT_CSV_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.csv_dir),
            prompts_dir: env::var("ASSISTANT_PROMPTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.prompts_dir),
            max_retries: parse_env("ASSISTANT_MAX_RETRIES")?.unwrap_or(defaults.max_retries),
            statement_timeout,
            max_queries_per_session: parse_env("ASSISTANT_MAX_QUERIES")?
                .unwrap_or(defaults.max_queries_per_session),
        })
    }

    /// The API key, or a configuration error naming the variable to set.
    pub fn require_api_key(&self) -> Result<&str> {
        self.llm.api_key.as_deref().ok_or_else(|| {
            AssistantError::Config("OPENAI_API_KEY is not set (use --api-key or .env)".to_string())
        })
    }
}

fn parse_env<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AssistantError::Config(format!("Invalid value for {}: '{}' ({})", name, raw, e))),
        Err(_) => Ok(None),
    }
}
