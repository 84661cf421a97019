//! Core types for LLM backend abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::LlmError;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Input to an LLM backend invocation
#[derive(Debug, Clone)]
pub struct LlmInvocation {
    /// Pipeline that issued the call (e.g. `essay`), for logs
    pub pipeline: String,
    /// Stage within the pipeline (e.g. `draft`), for logs
    pub stage: String,
    /// Model to use; empty means the backend default
    pub model: String,
    pub timeout: Duration,
    /// Ordered list of messages in the conversation
    pub messages: Vec<Message>,
    /// Provider-specific overrides (`temperature`, `max_tokens`)
    pub metadata: HashMap<String, serde_json::Value>,
}

impl LlmInvocation {
    #[must_use]
    pub fn new(
        pipeline: impl Into<String>,
        stage: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            pipeline: pipeline.into(),
            stage: stage.into(),
            model: model.into(),
            timeout,
            messages,
            metadata: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Content of the last user message, which carries the stage prompt.
    #[must_use]
    pub fn prompt(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map_or("", |m| m.content.as_str())
    }

    pub(crate) fn metadata_f32(&self, key: &str) -> Option<f32> {
        self.metadata.get(key).and_then(|v| v.as_f64()).map(|v| v as f32)
    }

    pub(crate) fn metadata_u32(&self, key: &str) -> Option<u32> {
        self.metadata
            .get(key)
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
    }
}

/// Result from an LLM backend invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResult {
    /// Raw response text, never parsed further
    pub raw_response: String,
    /// Provider name (e.g. "openai", "perplexity", "gemini", "anthropic")
    pub provider: String,
    pub model_used: String,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
    /// Provider-specific extensions (e.g. Perplexity citations)
    pub extensions: HashMap<String, serde_json::Value>,
}

impl LlmResult {
    #[must_use]
    pub fn new(
        raw_response: impl Into<String>,
        provider: impl Into<String>,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            raw_response: raw_response.into(),
            provider: provider.into(),
            model_used: model_used.into(),
            tokens_input: None,
            tokens_output: None,
            extensions: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.tokens_input = Some(input);
        self.tokens_output = Some(output);
        self
    }

    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    /// The response text, followed by a numbered `Sources:` list when the
    /// provider returned citations.
    #[must_use]
    pub fn into_text(self) -> String {
        let sources: Vec<&str> = self
            .extensions
            .get("citations")
            .and_then(|v| v.as_array())
            .map(|urls| urls.iter().filter_map(|u| u.as_str()).collect())
            .unwrap_or_default();
        if sources.is_empty() {
            return self.raw_response;
        }

        let mut text = self.raw_response.trim_end().to_string();
        text.push_str("\n\nSources:");
        for (i, url) in sources.iter().enumerate() {
            text.push_str(&format!("\n{}. {url}", i + 1));
        }
        text
    }
}

/// Trait for LLM backend implementations
///
/// Every provider implements this trait, so pipelines work with any provider
/// without knowing its wire format.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Invoke the LLM with the given invocation parameters
    ///
    /// # Errors
    ///
    /// Returns `LlmError` for any failure during invocation, including:
    /// - Transport failures (network errors, unreadable bodies)
    /// - Provider errors (auth, quota, outages)
    /// - Timeouts
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_is_last_user_message() {
        let inv = LlmInvocation::new(
            "essay",
            "draft",
            "",
            Duration::from_secs(30),
            vec![
                Message::system("be brief"),
                Message::user("first"),
                Message::assistant("ok"),
                Message::user("second"),
            ],
        );
        assert_eq!(inv.prompt(), "second");
    }

    #[test]
    fn test_metadata_accessors() {
        let inv = LlmInvocation::new("ideas", "tidy", "", Duration::from_secs(1), vec![])
            .with_metadata("temperature", serde_json::json!(0.25))
            .with_metadata("max_tokens", serde_json::json!(512));
        assert_eq!(inv.metadata_f32("temperature"), Some(0.25));
        assert_eq!(inv.metadata_u32("max_tokens"), Some(512));
        assert_eq!(inv.metadata_u32("missing"), None);
    }

    #[test]
    fn test_into_text_appends_citations() {
        let result = LlmResult::new("Tides follow the moon.\n", "perplexity", "sonar")
            .with_extension(
                "citations",
                serde_json::json!(["https://a.example/tides", "https://b.example/moon"]),
            );
        assert_eq!(
            result.into_text(),
            "Tides follow the moon.\n\nSources:\n1. https://a.example/tides\n2. https://b.example/moon"
        );
    }

    #[test]
    fn test_into_text_without_citations_is_raw_response() {
        let plain = LlmResult::new("answer\n", "openai", "gpt-4o-mini");
        assert_eq!(plain.into_text(), "answer\n");

        let empty = LlmResult::new("answer", "perplexity", "sonar")
            .with_extension("citations", serde_json::json!([]));
        assert_eq!(empty.into_text(), "answer");
    }
}
