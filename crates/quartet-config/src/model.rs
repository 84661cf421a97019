use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use quartet_utils::types::{ConfigSource, ProviderRole};

/// Default per-invocation timeout for a pipeline stage
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 300;

/// Default listen address for `quartet serve`
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Default transport-level retries for 5xx and network errors
pub const DEFAULT_HTTP_MAX_RETRIES: u32 = 2;

/// Default idle lifetime of a stored plan
pub const DEFAULT_PLAN_TTL_SECS: u64 = 3600;

/// Default upper bound on concurrently stored plans
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// Default first backoff between stage retries
pub const DEFAULT_STAGE_BACKOFF_MS: u64 = 1000;

/// System prompt sent with every `reasoning` call unless overridden
pub const DEFAULT_TUTOR_SYSTEM_PROMPT: &str =
    "You are a tutor who helps high-school students with their assignments.";

/// Configuration for quartet.
///
/// Hierarchical with precedence CLI arguments > config file > built-in
/// defaults.
///
/// # Discovery
///
/// [`Config::discover()`] looks for the file named by `--config`, then
/// `QUARTET_CONFIG`, then searches for `.quartet/config.toml` upward from the
/// current directory.
///
/// # Source Attribution
///
/// Each value tracks its source (`cli`, `config`, `programmatic`, or
/// `default`) for `quartet config`.
///
/// # Example
///
/// ```rust,no_run
/// use quartet_config::{CliArgs, Config};
///
/// let config = Config::discover(&CliArgs::default())?;
/// println!("Listening on {}", config.bind());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub defaults: Defaults,
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub http: HttpConfig,
    pub pipeline: PipelineConfig,
    pub intent: IntentConfig,
    pub plans: PlansConfig,
    #[serde(skip)]
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// `[defaults]`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    pub stage_timeout_secs: Option<u64>,
    pub verbose: Option<bool>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            stage_timeout_secs: Some(DEFAULT_STAGE_TIMEOUT_SECS),
            verbose: Some(false),
        }
    }
}

/// `[server]`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: Some(DEFAULT_BIND.to_string()),
        }
    }
}

/// One `[providers.<name>]` section.
///
/// Every field is optional in the file; unset fields keep the provider's
/// built-in default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
}

impl ProviderConfig {
    /// Built-in settings for the provider serving `role`.
    #[must_use]
    pub fn default_for(role: ProviderRole) -> Self {
        match role {
            ProviderRole::Search => Self {
                api_key_env: Some("PERPLEXITY_API_KEY".to_string()),
                base_url: Some("https://api.perplexity.ai".to_string()),
                model: Some("sonar".to_string()),
                max_tokens: None,
                temperature: Some(0.2),
                system_prompt: None,
            },
            ProviderRole::Reasoning => Self {
                api_key_env: Some("OPENAI_API_KEY".to_string()),
                base_url: Some("https://api.openai.com/v1".to_string()),
                model: Some("gpt-4o-mini".to_string()),
                max_tokens: None,
                temperature: Some(0.8),
                system_prompt: Some(DEFAULT_TUTOR_SYSTEM_PROMPT.to_string()),
            },
            ProviderRole::Synthesis => Self {
                api_key_env: Some("GEMINI_API_KEY".to_string()),
                base_url: Some("https://generativelanguage.googleapis.com/v1beta".to_string()),
                model: Some("gemini-2.0-flash".to_string()),
                max_tokens: None,
                temperature: None,
                system_prompt: None,
            },
            ProviderRole::LongForm => Self {
                api_key_env: Some("ANTHROPIC_API_KEY".to_string()),
                base_url: Some("https://api.anthropic.com/v1".to_string()),
                model: Some("claude-3-haiku-20240307".to_string()),
                max_tokens: Some(1500),
                temperature: Some(0.7),
                system_prompt: None,
            },
        }
    }

    /// Overlay every field set in `other`, returning the names of the fields taken.
    pub(crate) fn overlay(&mut self, other: ProviderConfig) -> Vec<&'static str> {
        let mut taken = Vec::new();
        if other.api_key_env.is_some() {
            self.api_key_env = other.api_key_env;
            taken.push("api_key_env");
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url;
            taken.push("base_url");
        }
        if other.model.is_some() {
            self.model = other.model;
            taken.push("model");
        }
        if other.max_tokens.is_some() {
            self.max_tokens = other.max_tokens;
            taken.push("max_tokens");
        }
        if other.temperature.is_some() {
            self.temperature = other.temperature;
            taken.push("temperature");
        }
        if other.system_prompt.is_some() {
            self.system_prompt = other.system_prompt;
            taken.push("system_prompt");
        }
        taken
    }
}

/// `[providers.*]`, one section per role's provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvidersConfig {
    pub perplexity: ProviderConfig,
    pub openai: ProviderConfig,
    pub gemini: ProviderConfig,
    pub anthropic: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            perplexity: ProviderConfig::default_for(ProviderRole::Search),
            openai: ProviderConfig::default_for(ProviderRole::Reasoning),
            gemini: ProviderConfig::default_for(ProviderRole::Synthesis),
            anthropic: ProviderConfig::default_for(ProviderRole::LongForm),
        }
    }
}

impl ProvidersConfig {
    #[must_use]
    pub fn for_role(&self, role: ProviderRole) -> &ProviderConfig {
        match role {
            ProviderRole::Search => &self.perplexity,
            ProviderRole::Reasoning => &self.openai,
            ProviderRole::Synthesis => &self.gemini,
            ProviderRole::LongForm => &self.anthropic,
        }
    }

    pub fn for_role_mut(&mut self, role: ProviderRole) -> &mut ProviderConfig {
        match role {
            ProviderRole::Search => &mut self.perplexity,
            ProviderRole::Reasoning => &mut self.openai,
            ProviderRole::Synthesis => &mut self.gemini,
            ProviderRole::LongForm => &mut self.anthropic,
        }
    }
}

/// Provider sections as they appear in a file: any subset, any subset of fields.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub(crate) struct TomlProviders {
    pub perplexity: Option<ProviderConfig>,
    pub openai: Option<ProviderConfig>,
    pub gemini: Option<ProviderConfig>,
    pub anthropic: Option<ProviderConfig>,
}

impl TomlProviders {
    pub(crate) fn take(&mut self, role: ProviderRole) -> Option<ProviderConfig> {
        match role {
            ProviderRole::Search => self.perplexity.take(),
            ProviderRole::Reasoning => self.openai.take(),
            ProviderRole::Synthesis => self.gemini.take(),
            ProviderRole::LongForm => self.anthropic.take(),
        }
    }
}

/// `[http]`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    pub max_retries: Option<u32>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_retries: Some(DEFAULT_HTTP_MAX_RETRIES),
        }
    }
}

/// `[pipeline]` with per-stage overrides under `[pipeline.stages."<pipeline>.<stage>"]`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub max_retries: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    #[serde(default)]
    pub stages: HashMap<String, StageOverride>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_retries: Some(0),
            initial_backoff_ms: Some(DEFAULT_STAGE_BACKOFF_MS),
            stages: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StageOverride {
    pub max_retries: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
}

/// `[intent]`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IntentConfig {
    /// Appended to the built-in finalize keywords
    #[serde(default)]
    pub extra_keywords: Vec<String>,
}

/// `[plans]`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlansConfig {
    pub ttl_secs: Option<u64>,
    pub max_sessions: Option<usize>,
}

impl Default for PlansConfig {
    fn default() -> Self {
        Self {
            ttl_secs: Some(DEFAULT_PLAN_TTL_SECS),
            max_sessions: Some(DEFAULT_MAX_SESSIONS),
        }
    }
}

/// How often, and how patiently, a failing stage is re-invoked.
///
/// Attempt `n` (1-based) waits `initial_backoff * n` before retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Fail on the first error.
    pub const NONE: RetryPolicy = RetryPolicy {
        max_retries: 0,
        initial_backoff: Duration::from_millis(DEFAULT_STAGE_BACKOFF_MS),
    };

    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.initial_backoff * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::NONE
    }
}
