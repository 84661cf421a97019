//! OpenAI-compatible chat-completions backend
//!
//! Serves both the `reasoning` role (OpenAI) and the `search` role
//! (Perplexity, whose API speaks the same wire format and adds citations).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use quartet_config::ProviderConfig;

use crate::LlmError;
use crate::http_client::HttpClient;
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};

/// Optional sampling parameters; `None` leaves the provider's default in force.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatParams {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Clone)]
pub struct OpenAiCompatibleBackend {
    client: Arc<HttpClient>,
    endpoint: String,
    api_key: String,
    provider_name: String,
    default_model: String,
    default_params: ChatParams,
}

impl OpenAiCompatibleBackend {
    /// Create a backend posting to `<base_url>/chat/completions`.
    #[must_use]
    pub fn new(
        client: Arc<HttpClient>,
        provider_name: impl Into<String>,
        api_key: String,
        base_url: &str,
        default_model: String,
        default_params: ChatParams,
    ) -> Self {
        Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            provider_name: provider_name.into(),
            default_model,
            default_params,
        }
    }

    /// Create a backend from a `[providers.<name>]` section.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if `base_url` or `model` is unset.
    pub fn new_from_config(
        client: Arc<HttpClient>,
        provider_name: &str,
        config: &ProviderConfig,
        api_key: String,
    ) -> Result<Self, LlmError> {
        let base_url = config.base_url.as_deref().ok_or_else(|| {
            LlmError::Misconfiguration(format!(
                "{provider_name} base_url not specified. Please set [providers.{provider_name}] base_url."
            ))
        })?;
        let default_model = config.model.clone().ok_or_else(|| {
            LlmError::Misconfiguration(format!(
                "{provider_name} model not specified. Please set [providers.{provider_name}] model = \"model-name\"."
            ))
        })?;

        Ok(Self::new(
            client,
            provider_name,
            api_key,
            base_url,
            default_model,
            ChatParams {
                max_tokens: config.max_tokens,
                temperature: config.temperature,
            },
        ))
    }

    /// Resolve parameters for this invocation
    ///
    /// 1. `inv.model` overrides `default_model` when non-empty
    /// 2. `inv.metadata["max_tokens"]` / `["temperature"]` override the defaults
    fn resolve_params(&self, inv: &LlmInvocation) -> (String, ChatParams) {
        let model = if inv.model.is_empty() {
            self.default_model.clone()
        } else {
            inv.model.clone()
        };

        let params = ChatParams {
            max_tokens: inv
                .metadata_u32("max_tokens")
                .or(self.default_params.max_tokens),
            temperature: inv
                .metadata_f32("temperature")
                .or(self.default_params.temperature),
        };

        (model, params)
    }

    fn convert_messages(messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|msg| ChatMessage {
                role: match msg.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: msg.content.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let (model, params) = self.resolve_params(&inv);
        let provider = self.provider_name.as_str();

        debug!(
            provider = provider,
            model = %model,
            max_tokens = ?params.max_tokens,
            temperature = ?params.temperature,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking chat-completions backend"
        );

        let request_body = ChatRequest {
            model: model.clone(),
            messages: Self::convert_messages(&inv.messages),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        };

        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body);

        let response = self
            .client
            .execute_with_retry(request, inv.timeout, provider)
            .await?;

        let response_body: ChatResponse = response.json().await.map_err(|e| {
            LlmError::Transport(format!("Failed to parse {provider} response: {}", e))
        })?;

        let choice = response_body.choices.into_iter().next().ok_or_else(|| {
            LlmError::Transport(format!("{provider} response missing choices[0]"))
        })?;

        let content = choice.message.content.ok_or_else(|| {
            LlmError::Transport(format!("{provider} response missing content in choices[0]"))
        })?;

        let mut result = LlmResult::new(content, provider, model);

        if let Some(usage) = response_body.usage {
            result = result.with_tokens(usage.prompt_tokens, usage.completion_tokens);
        }
        if let Some(citations) = response_body.citations.filter(|c| !c.is_empty()) {
            result = result.with_extension("citations", serde_json::json!(citations));
        }

        debug!(
            provider = provider,
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "Chat-completions invocation completed"
        );

        Ok(result)
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
    /// Perplexity only
    #[serde(default)]
    citations: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
