//! Anthropic HTTP backend implementation
//!
//! Serves the `long-form` role through Anthropic's Messages API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use quartet_config::ProviderConfig;

use crate::LlmError;
use crate::http_client::HttpClient;
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The Messages API requires `max_tokens`; used when configuration leaves it unset
const DEFAULT_MAX_TOKENS: u32 = 1500;

/// HTTP request parameters
#[derive(Debug, Clone)]
pub struct AnthropicParams {
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl Default for AnthropicParams {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: Some(0.7),
        }
    }
}

#[derive(Clone)]
pub struct AnthropicBackend {
    client: Arc<HttpClient>,
    endpoint: String,
    api_key: String,
    default_model: String,
    default_params: AnthropicParams,
}

impl AnthropicBackend {
    /// Create a backend posting to `<base_url>/messages`.
    #[must_use]
    pub fn new(
        client: Arc<HttpClient>,
        api_key: String,
        base_url: &str,
        default_model: String,
        default_params: AnthropicParams,
    ) -> Self {
        Self {
            client,
            endpoint: format!("{}/messages", base_url.trim_end_matches('/')),
            api_key,
            default_model,
            default_params,
        }
    }

    /// Create a new Anthropic backend from `[providers.anthropic]`
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if `base_url` or `model` is unset.
    pub fn new_from_config(
        client: Arc<HttpClient>,
        config: &ProviderConfig,
        api_key: String,
    ) -> Result<Self, LlmError> {
        let base_url = config.base_url.as_deref().ok_or_else(|| {
            LlmError::Misconfiguration(
                "Anthropic base_url not specified. Please set [providers.anthropic] base_url."
                    .to_string(),
            )
        })?;
        let default_model = config.model.clone().ok_or_else(|| {
            LlmError::Misconfiguration(
                "Anthropic model not specified in configuration. \
                 Please set [providers.anthropic] model = \"model-name\"."
                    .to_string(),
            )
        })?;

        let default_params = AnthropicParams {
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: config.temperature,
        };

        Ok(Self::new(
            client,
            api_key,
            base_url,
            default_model,
            default_params,
        ))
    }

    fn resolve_params(&self, inv: &LlmInvocation) -> (String, AnthropicParams) {
        let model = if inv.model.is_empty() {
            self.default_model.clone()
        } else {
            inv.model.clone()
        };

        let params = AnthropicParams {
            max_tokens: inv
                .metadata_u32("max_tokens")
                .unwrap_or(self.default_params.max_tokens),
            temperature: inv
                .metadata_f32("temperature")
                .or(self.default_params.temperature),
        };

        (model, params)
    }

    /// Convert messages to Anthropic Messages API format
    ///
    /// System messages move to the top-level `system` field, concatenated
    /// with blank lines when there are several.
    fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system_prompt: Option<String> = None;
        let mut anthropic_messages = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => {
                    if let Some(existing) = system_prompt.as_mut() {
                        existing.push_str("\n\n");
                        existing.push_str(&msg.content);
                    } else {
                        system_prompt = Some(msg.content.clone());
                    }
                }
                Role::User => anthropic_messages.push(AnthropicMessage {
                    role: "user",
                    content: msg.content.clone(),
                }),
                Role::Assistant => anthropic_messages.push(AnthropicMessage {
                    role: "assistant",
                    content: msg.content.clone(),
                }),
            }
        }

        (system_prompt, anthropic_messages)
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let (model, params) = self.resolve_params(&inv);

        debug!(
            provider = "anthropic",
            model = %model,
            max_tokens = params.max_tokens,
            temperature = ?params.temperature,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking Anthropic backend"
        );

        let (system_prompt, anthropic_messages) = Self::convert_messages(&inv.messages);

        let request_body = AnthropicRequest {
            model: model.clone(),
            messages: anthropic_messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            system: system_prompt,
        };

        let request = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request_body);

        let response = self
            .client
            .execute_with_retry(request, inv.timeout, "anthropic")
            .await?;

        let response_body: AnthropicResponse = response.json().await.map_err(|e| {
            LlmError::Transport(format!("Failed to parse Anthropic response: {}", e))
        })?;

        // Concatenate every text block; tool or thinking blocks are skipped
        let content: String = response_body
            .content
            .iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        if content.is_empty() {
            return Err(LlmError::Transport(
                "Anthropic response missing text content".to_string(),
            ));
        }

        let mut result = LlmResult::new(content, "anthropic", model);
        if let Some(usage) = response_body.usage {
            result = result.with_tokens(usage.input_tokens, usage.output_tokens);
        }

        debug!(
            provider = "anthropic",
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "Anthropic invocation completed"
        );

        Ok(result)
    }
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use quartet_utils::types::ProviderRole;
    use std::time::Duration;

    fn backend() -> AnthropicBackend {
        AnthropicBackend::new_from_config(
            Arc::new(HttpClient::new().unwrap()),
            &ProviderConfig::default_for(ProviderRole::LongForm),
            "test-key".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_defaults_from_config() {
        let backend = backend();
        assert_eq!(backend.endpoint, "https://api.anthropic.com/v1/messages");

        let inv = LlmInvocation::new("ideas", "tidy", "", Duration::from_secs(60), vec![]);
        let (model, params) = backend.resolve_params(&inv);
        assert_eq!(model, "claude-3-haiku-20240307");
        assert_eq!(params.max_tokens, 1500);
        assert_eq!(params.temperature, Some(0.7));
    }

    #[test]
    fn test_resolve_params_overrides_max_tokens() {
        let inv = LlmInvocation::new("ideas", "tidy", "", Duration::from_secs(60), vec![])
            .with_metadata("max_tokens", serde_json::json!(4096));
        let (_, params) = backend().resolve_params(&inv);
        assert_eq!(params.max_tokens, 4096);
        assert_eq!(params.temperature, Some(0.7));
    }

    #[test]
    fn test_convert_messages_separates_system() {
        let messages = vec![
            Message::system("First system message"),
            Message::system("Second system message"),
            Message::user("Hello"),
            Message::assistant("Hi there!"),
        ];

        let (system, anthropic_messages) = AnthropicBackend::convert_messages(&messages);

        assert_eq!(
            system.as_deref(),
            Some("First system message\n\nSecond system message")
        );
        assert_eq!(anthropic_messages.len(), 2);
        assert_eq!(anthropic_messages[0].role, "user");
        assert_eq!(anthropic_messages[1].role, "assistant");
    }

    #[test]
    fn test_convert_messages_no_system() {
        let (system, messages) = AnthropicBackend::convert_messages(&[Message::user("Hello")]);
        assert_eq!(system, None);
        assert_eq!(messages.len(), 1);
    }
}
