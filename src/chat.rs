//! Minimal client for OpenAI-compatible `/v1/chat/completions` endpoints.
//!
//! Both the ingredient recognizer and the recipe assistant talk to a chat
//! model that answers in JSON.  [`ChatClient`] owns the HTTP client and the
//! connection details; callers build the message list and parse the reply.
//! Works with Ollama (OpenAI mode), OpenAI, Groq, LM Studio, vLLM, etc.

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::{RecipeConfig, RecognitionConfig};

/// Longest service error body kept in [`ChatError::Status`].
const MAX_ERROR_BODY: usize = 512;

// ---------------------------------------------------------------------------
// ChatError
// ---------------------------------------------------------------------------

/// Errors from a single chat-completions round trip.
#[derive(Debug, Error)]
pub enum ChatError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The HTTP body was not the expected chat-completions JSON.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The reply had no usable message content.
    #[error("service returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChatError::Timeout
        } else {
            ChatError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// ChatEndpoint
// ---------------------------------------------------------------------------

/// Connection details for one chat model.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEndpoint {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl From<&RecognitionConfig> for ChatEndpoint {
    fn from(config: &RecognitionConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        }
    }
}

impl From<&RecipeConfig> for ChatEndpoint {
    fn from(config: &RecipeConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// ChatClient
// ---------------------------------------------------------------------------

/// Sends chat requests in JSON mode and returns the raw message content.
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: ChatEndpoint,
}

impl ChatClient {
    /// Build a client with the endpoint's per-request timeout.
    ///
    /// A default (no-timeout) client is used as a last-resort fallback if
    /// the builder fails.
    pub fn new(endpoint: ChatEndpoint) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(endpoint.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &ChatEndpoint {
        &self.endpoint
    }

    /// Full URL of the chat-completions route.
    pub fn completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.endpoint.base_url.trim_end_matches('/')
        )
    }

    /// POST `messages` and return the first choice's message content.
    ///
    /// The `Authorization: Bearer …` header is attached only when an API key
    /// is configured and non-empty.
    pub async fn complete(
        &self,
        messages: Vec<serde_json::Value>,
        max_tokens: u32,
    ) -> Result<String, ChatError> {
        let body = serde_json::json!({
            "model":           self.endpoint.model,
            "messages":        messages,
            "stream":          false,
            "temperature":     self.endpoint.temperature,
            "max_tokens":      max_tokens,
            "response_format": { "type": "json_object" }
        });

        let mut req = self.client.post(self.completions_url()).json(&body);

        let key = self.endpoint.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();

        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            truncate_at_char_boundary(&mut message, MAX_ERROR_BODY);
            return Err(ChatError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(ChatError::EmptyResponse)?
            .trim()
            .to_string();

        if content.is_empty() {
            return Err(ChatError::EmptyResponse);
        }

        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// Reply parsing
// ---------------------------------------------------------------------------

/// Strip a surrounding markdown code fence (```` ```json … ``` ````) if the
/// model added one despite JSON mode.
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`, `JSON`, …) on the opening line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Deserialize a JSON reply, tolerating a code fence around it.
pub fn parse_json_reply<T: DeserializeOwned>(content: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(strip_code_fence(content))
}

fn truncate_at_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(base_url: &str) -> ChatEndpoint {
        ChatEndpoint {
            base_url: base_url.into(),
            api_key: None,
            model: "llava:7b".into(),
            temperature: 0.1,
            timeout_secs: 5,
        }
    }

    #[test]
    fn completions_url_ignores_trailing_slash() {
        let a = ChatClient::new(endpoint("http://localhost:11434"));
        let b = ChatClient::new(endpoint("http://localhost:11434/"));
        assert_eq!(a.completions_url(), "http://localhost:11434/v1/chat/completions");
        assert_eq!(a.completions_url(), b.completions_url());
    }

    #[test]
    fn endpoint_from_recognition_config() {
        let mut cfg = RecognitionConfig::default();
        cfg.api_key = Some("sk-test".into());
        let ep = ChatEndpoint::from(&cfg);
        assert_eq!(ep.model, cfg.model);
        assert_eq!(ep.api_key.as_deref(), Some("sk-test"));
        assert_eq!(ep.timeout_secs, cfg.timeout_secs);
    }

    #[test]
    fn strip_plain_json_is_identity() {
        assert_eq!(strip_code_fence("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn strip_fenced_json() {
        let fenced = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(fenced), "{\"a\": 1}");
    }

    #[test]
    fn strip_fence_without_info_string() {
        let fenced = "```\n{\"a\": 1}\n```\n";
        assert_eq!(strip_code_fence(fenced), "{\"a\": 1}");
    }

    #[test]
    fn parse_json_reply_through_fence() {
        #[derive(serde::Deserialize)]
        struct Reply {
            a: u32,
        }
        let reply: Reply = parse_json_reply("```json\n{\"a\": 7}\n```").unwrap();
        assert_eq!(reply.a, 7);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let mut s = "ééééé".to_string(); // 2 bytes each
        truncate_at_char_boundary(&mut s, 3);
        assert_eq!(s, "é");
    }
}
