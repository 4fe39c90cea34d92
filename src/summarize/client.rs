//! Chat-completions client.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::{Summarizer, SummarizerConfig};

/// Longest error body kept in an error message.
const MAX_ERROR_BODY: usize = 200;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Summarizer backed by an OpenAI/Mistral-compatible `chat/completions` endpoint.
///
/// Blocking; each call is bounded by the configured timeout and never retried.
pub struct ChatCompletionsSummarizer {
    config: SummarizerConfig,
    client: Client,
}

impl ChatCompletionsSummarizer {
    /// Create a summarizer; fails if the configuration is incomplete.
    pub fn new(config: SummarizerConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("untable/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Summarizer configured from the environment.
    pub fn from_env() -> Result<Self> {
        Self::new(SummarizerConfig::from_env())
    }

    /// Configuration in use.
    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

impl Summarizer for ChatCompletionsSummarizer {
    fn summarize(&self, table_text: &str) -> Result<String> {
        let prompt = self.config.render_prompt(table_text);
        let body = build_request(&self.config, &prompt);
        let api_key = self.config.api_key.as_deref().unwrap_or_default();

        log::debug!(
            "Requesting summary from {} ({} prompt chars)",
            self.config.model,
            prompt.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(Error::SummarizationUnavailable(format!(
                "HTTP {}: {}",
                status,
                truncate(text.trim(), MAX_ERROR_BODY)
            )));
        }

        let text = response.text()?;
        parse_response(&text)
    }
}

fn build_request<'a>(config: &'a SummarizerConfig, prompt: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model: &config.model,
        messages: vec![ChatMessage {
            role: "user",
            content: prompt,
        }],
        max_tokens: config.max_tokens,
    }
}

/// Extract `choices[0].message.content` from a response body.
fn parse_response(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| Error::SummarizationUnavailable(format!("malformed response: {}", e)))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::SummarizationUnavailable("empty response".to_string()))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let config = SummarizerConfig::default().with_api_key("k");
        let body = serde_json::to_value(build_request(&config, "hello")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "mistral-large-latest",
                "messages": [{"role": "user", "content": "hello"}],
                "max_tokens": 100
            })
        );
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"  Two people. \n"}}]}"#;
        assert_eq!(parse_response(body).unwrap(), "Two people.");
    }

    #[test]
    fn test_parse_response_failures() {
        for body in [
            "not json",
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{"content":null}}]}"#,
            r#"{"choices":[{"message":{"content":"   "}}]}"#,
        ] {
            assert!(matches!(
                parse_response(body),
                Err(Error::SummarizationUnavailable(_))
            ));
        }
    }

    #[test]
    fn test_new_requires_key() {
        assert!(matches!(
            ChatCompletionsSummarizer::new(SummarizerConfig::default()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_endpoint() {
        let summarizer = ChatCompletionsSummarizer::new(
            SummarizerConfig::default()
                .with_api_key("k")
                .with_base_url("http://localhost:8080/v1/"),
        )
        .unwrap();
        assert_eq!(summarizer.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_unreachable_endpoint_is_unavailable() {
        // Port 9 (discard) on localhost is closed in test environments.
        let summarizer = ChatCompletionsSummarizer::new(
            SummarizerConfig::default()
                .with_api_key("k")
                .with_base_url("http://127.0.0.1:9")
                .with_timeout(std::time::Duration::from_secs(2)),
        )
        .unwrap();
        assert!(matches!(
            summarizer.summarize("a | b"),
            Err(Error::SummarizationUnavailable(_))
        ));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("ab", 3), "ab");
    }
}
