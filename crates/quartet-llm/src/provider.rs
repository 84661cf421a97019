//! Role-bound providers
//!
//! A [`Provider`] pairs one backend with the settings of the role it serves
//! and exposes the single prompt-in/text-out operation pipelines use.
//! [`ProviderSet`] holds one provider per role and is built once at startup.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use quartet_config::Config;
use quartet_utils::error::ConfigError;
use quartet_utils::types::ProviderRole;

use crate::LlmError;
use crate::anthropic_backend::AnthropicBackend;
use crate::gemini_backend::GeminiBackend;
use crate::http_client::HttpClient;
use crate::openai_backend::OpenAiCompatibleBackend;
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message};

/// Ceiling applied by the shared HTTP client to every request.
const HTTP_MAX_TIMEOUT: Duration = Duration::from_secs(300);

/// A backend bound to a role, with a per-call timeout and optional system prompt.
#[derive(Clone)]
pub struct Provider {
    role: ProviderRole,
    backend: Arc<dyn LlmBackend>,
    timeout: Duration,
    system_prompt: Option<String>,
}

impl Provider {
    #[must_use]
    pub fn new(role: ProviderRole, backend: Arc<dyn LlmBackend>, timeout: Duration) -> Self {
        Self {
            role,
            backend,
            timeout,
            system_prompt: None,
        }
    }

    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt.filter(|p| !p.trim().is_empty());
        self
    }

    #[must_use]
    pub fn role(&self) -> ProviderRole {
        self.role
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `prompt` and return the provider's text unmodified.
    ///
    /// # Errors
    ///
    /// Any [`LlmError`] from the backend, or `LlmError::Timeout` when the call
    /// outlives the provider's timeout.
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.generate_labelled("", "", prompt).await
    }

    /// [`Provider::generate`] with the calling pipeline and stage attached for logs.
    ///
    /// # Errors
    ///
    /// Same as [`Provider::generate`].
    pub async fn generate_labelled(
        &self,
        pipeline: &str,
        stage: &str,
        prompt: &str,
    ) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(Message::system(system.clone()));
        }
        messages.push(Message::user(prompt));

        let invocation = LlmInvocation::new(pipeline, stage, "", self.timeout, messages);

        debug!(
            role = %self.role,
            pipeline = pipeline,
            stage = stage,
            prompt_chars = prompt.chars().count(),
            "Generating"
        );

        // The HTTP client caps each attempt; this bounds the call including retries.
        match tokio::time::timeout(self.timeout, self.backend.invoke(invocation)).await {
            Ok(result) => result.map(LlmResult::into_text),
            Err(_) => Err(LlmError::Timeout {
                duration: self.timeout,
            }),
        }
    }
}

/// One provider per role.
#[derive(Clone)]
pub struct ProviderSet {
    search: Provider,
    reasoning: Provider,
    synthesis: Provider,
    long_form: Provider,
}

impl ProviderSet {
    /// Assemble a set from already-built providers.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if a provider sits in the wrong slot.
    pub fn new(
        search: Provider,
        reasoning: Provider,
        synthesis: Provider,
        long_form: Provider,
    ) -> Result<Self, LlmError> {
        for (expected, provider) in [
            (ProviderRole::Search, &search),
            (ProviderRole::Reasoning, &reasoning),
            (ProviderRole::Synthesis, &synthesis),
            (ProviderRole::LongForm, &long_form),
        ] {
            if provider.role() != expected {
                return Err(LlmError::Misconfiguration(format!(
                    "provider for role '{}' placed in the '{}' slot",
                    provider.role(),
                    expected
                )));
            }
        }

        Ok(Self {
            search,
            reasoning,
            synthesis,
            long_form,
        })
    }

    /// Build every role's provider from a backend factory, all sharing one timeout.
    pub fn from_backends<F>(timeout: Duration, mut backend_for: F) -> Self
    where
        F: FnMut(ProviderRole) -> Arc<dyn LlmBackend>,
    {
        let mut make = |role| Provider::new(role, backend_for(role), timeout);
        Self {
            search: make(ProviderRole::Search),
            reasoning: make(ProviderRole::Reasoning),
            synthesis: make(ProviderRole::Synthesis),
            long_form: make(ProviderRole::LongForm),
        }
    }

    #[must_use]
    pub fn get(&self, role: ProviderRole) -> &Provider {
        match role {
            ProviderRole::Search => &self.search,
            ProviderRole::Reasoning => &self.reasoning,
            ProviderRole::Synthesis => &self.synthesis,
            ProviderRole::LongForm => &self.long_form,
        }
    }
}

/// Build the four HTTP-backed providers from configuration and the process environment.
///
/// # Errors
///
/// - `ConfigError::MissingCredentials` naming every unset API key variable
/// - `ConfigError::InvalidValue` if a provider section cannot produce a backend
pub fn from_config(config: &Config) -> Result<ProviderSet, ConfigError> {
    from_config_with(config, |name| std::env::var(name).ok())
}

/// [`from_config`] with an injectable environment lookup.
///
/// # Errors
///
/// Same as [`from_config`].
pub fn from_config_with<F>(config: &Config, lookup: F) -> Result<ProviderSet, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    config.check_credentials_with(&lookup)?;

    let client = Arc::new(
        HttpClient::with_settings(HTTP_MAX_TIMEOUT, config.http_max_retries())
            .map_err(|e| invalid_value("http", &e))?,
    );
    let timeout = config.stage_timeout();

    let build = |role: ProviderRole| -> Result<Provider, ConfigError> {
        let section = config.providers.for_role(role);
        let api_key = lookup(&config.api_key_env(role)).unwrap_or_default();
        let name = role.provider_name();

        let backend: Arc<dyn LlmBackend> = match role {
            ProviderRole::Search | ProviderRole::Reasoning => Arc::new(
                OpenAiCompatibleBackend::new_from_config(client.clone(), name, section, api_key)
                    .map_err(|e| invalid_value(&format!("providers.{name}"), &e))?,
            ),
            ProviderRole::Synthesis => Arc::new(
                GeminiBackend::new_from_config(client.clone(), section, api_key)
                    .map_err(|e| invalid_value(&format!("providers.{name}"), &e))?,
            ),
            ProviderRole::LongForm => Arc::new(
                AnthropicBackend::new_from_config(client.clone(), section, api_key)
                    .map_err(|e| invalid_value(&format!("providers.{name}"), &e))?,
            ),
        };

        info!(
            role = %role,
            provider = name,
            model = section.model.as_deref().unwrap_or_default(),
            "Provider configured"
        );

        Ok(Provider::new(role, backend, timeout).with_system_prompt(section.system_prompt.clone()))
    };

    ProviderSet::new(
        build(ProviderRole::Search)?,
        build(ProviderRole::Reasoning)?,
        build(ProviderRole::Synthesis)?,
        build(ProviderRole::LongForm)?,
    )
    .map_err(|e| invalid_value("providers", &e))
}

fn invalid_value(key: &str, error: &LlmError) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: error.to_string(),
    }
}
