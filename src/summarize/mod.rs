//! Table summarization through a remote text-generation endpoint.
//!
//! The pipeline only depends on the [`Summarizer`] trait; the bundled
//! [`ChatCompletionsSummarizer`] talks to any OpenAI/Mistral-compatible
//! `chat/completions` endpoint.

mod client;

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

pub use client::ChatCompletionsSummarizer;

/// Default endpoint base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";

/// Default model name.
pub const DEFAULT_MODEL: &str = "mistral-large-latest";

/// Default prompt; `{table}` is replaced with the rendered table.
pub const DEFAULT_PROMPT: &str = "Summarize the following table data:\n\n{table}\n\nProvide a concise summary of the key points.";

/// Produces a prose summary of a rendered table.
pub trait Summarizer: Send + Sync {
    /// Summarize the table text.
    ///
    /// Fails with [`Error::SummarizationUnavailable`] on network, auth,
    /// quota or timeout failures.
    fn summarize(&self, table_text: &str) -> Result<String>;
}

impl<S: Summarizer + ?Sized> Summarizer for Box<S> {
    fn summarize(&self, table_text: &str) -> Result<String> {
        (**self).summarize(table_text)
    }
}

/// Summarizer endpoint configuration.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Endpoint base URL (without `/chat/completions`)
    pub base_url: String,

    /// Model name
    pub model: String,

    /// Bearer token
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Prompt template containing `{table}`
    pub prompt_template: String,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: 30,
            max_tokens: 100,
            prompt_template: DEFAULT_PROMPT.to_string(),
        }
    }
}

// Keeps the key out of logs.
impl fmt::Debug for SummarizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummarizerConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl SummarizerConfig {
    /// Create a config with defaults and no API key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `UNTABLE_API_KEY` (or `MISTRAL_API_KEY`),
    /// `UNTABLE_BASE_URL` and `UNTABLE_MODEL`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.api_key = env_var("UNTABLE_API_KEY").or_else(|| env_var("MISTRAL_API_KEY"));
        if let Some(url) = env_var("UNTABLE_BASE_URL") {
            config.base_url = url;
        }
        if let Some(model) = env_var("UNTABLE_MODEL") {
            config.model = model;
        }
        config
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the endpoint base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Set the generation cap.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the prompt template.
    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(Error::Config(
                "no API key (set UNTABLE_API_KEY or pass --api-key)".to_string(),
            ));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!("invalid base URL: {}", self.base_url)));
        }
        if !self.prompt_template.contains("{table}") {
            return Err(Error::Config(
                "prompt template must contain {table}".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the prompt for a rendered table.
    pub fn render_prompt(&self, table_text: &str) -> String {
        self.prompt_template.replace("{table}", table_text)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
