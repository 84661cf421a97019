//! Gemini HTTP backend implementation
//!
//! Serves the `synthesis` role through the `generateContent` REST endpoint.
//! The API key travels in the `x-goog-api-key` header, never in the URL, so
//! it cannot leak through transport error messages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use quartet_config::ProviderConfig;

use crate::LlmError;
use crate::http_client::HttpClient;
use crate::openai_backend::ChatParams;
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};

#[derive(Clone)]
pub struct GeminiBackend {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: String,
    default_model: String,
    default_params: ChatParams,
}

impl GeminiBackend {
    #[must_use]
    pub fn new(
        client: Arc<HttpClient>,
        api_key: String,
        base_url: &str,
        default_model: String,
        default_params: ChatParams,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model,
            default_params,
        }
    }

    /// Create a new Gemini backend from `[providers.gemini]`
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
                "Gemini base_url not specified. Please set [providers.gemini] base_url."
                    .to_string(),
            )
        })?;
        let default_model = config.model.clone().ok_or_else(|| {
            LlmError::Misconfiguration(
                "Gemini model not specified in configuration. \
                 Please set [providers.gemini] model = \"model-name\"."
                    .to_string(),
            )
        })?;

        Ok(Self::new(
            client,
            api_key,
            base_url,
            default_model,
            ChatParams {
                max_tokens: config.max_tokens,
                temperature: config.temperature,
            },
        ))
    }

    fn endpoint_for(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn build_request(messages: &[Message], params: &ChatParams) -> GeminiRequest {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => system_parts.push(GeminiPart {
                    text: msg.content.clone(),
                }),
                Role::User | Role::Assistant => contents.push(GeminiContent {
                    role: if msg.role == Role::User { "user" } else { "model" },
                    parts: vec![GeminiPart {
                        text: msg.content.clone(),
                    }],
                }),
            }
        }

        let generation_config = (params.temperature.is_some() || params.max_tokens.is_some())
            .then(|| GenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_tokens,
            });

        GeminiRequest {
            contents,
            system_instruction: (!system_parts.is_empty()).then_some(SystemInstruction {
                parts: system_parts,
            }),
            generation_config,
        }
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
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

        debug!(
            provider = "gemini",
            model = %model,
            temperature = ?params.temperature,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking Gemini backend"
        );

        let request = self
            .client
            .post(&self.endpoint_for(&model))
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_request(&inv.messages, &params));

        let response = self
            .client
            .execute_with_retry(request, inv.timeout, "gemini")
            .await?;

        let response_body: GeminiResponse = response.json().await.map_err(|e| {
            LlmError::Transport(format!("Failed to parse Gemini response: {}", e))
        })?;

        let candidate = response_body
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| {
                let reason = response_body
                    .prompt_feedback
                    .and_then(|f| f.block_reason)
                    .unwrap_or_else(|| "no candidates".to_string());
                LlmError::Transport(format!("Gemini returned no candidates ({reason})"))
            })?;

        let content: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(LlmError::Transport(
                "Gemini response missing text content".to_string(),
            ));
        }

        let mut result = LlmResult::new(content, "gemini", model);
        if let Some(usage) = response_body.usage_metadata {
            result = result.with_tokens(
                usage.prompt_token_count.unwrap_or(0),
                usage.candidates_token_count.unwrap_or(0),
            );
        }

        debug!(
            provider = "gemini",
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "Gemini invocation completed"
        );

        Ok(result)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize)]
struct SystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}
