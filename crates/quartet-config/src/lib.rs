//! Configuration management for quartet
//!
//! Hierarchical configuration with discovery and precedence: CLI > file >
//! defaults. The TOML file has `[defaults]`, `[server]`, `[providers.*]`,
//! `[http]`, `[pipeline]`, `[intent]` and `[plans]` sections.

mod builder;
mod cli_args;
mod discovery;
mod dotenv;
mod model;
mod sources;
mod validation;

use std::time::Duration;

pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use discovery::CONFIG_ENV_VAR;
pub use dotenv::load_dotenv;
pub use model::*;
pub use quartet_utils::types::ConfigSource;

use quartet_utils::error::ConfigError;
use quartet_utils::types::ProviderRole;

impl Config {
    /// Per-invocation timeout for every provider call.
    #[must_use]
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(
            self.defaults
                .stage_timeout_secs
                .unwrap_or(DEFAULT_STAGE_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.defaults.verbose.unwrap_or(false)
    }

    #[must_use]
    pub fn bind(&self) -> &str {
        self.server.bind.as_deref().unwrap_or(DEFAULT_BIND)
    }

    #[must_use]
    pub fn http_max_retries(&self) -> u32 {
        self.http.max_retries.unwrap_or(DEFAULT_HTTP_MAX_RETRIES)
    }

    /// Retry policy for a stage keyed `<pipeline>.<stage>`.
    ///
    /// Precedence (highest to lowest):
    /// 1. `[pipeline.stages."<key>"]`
    /// 2. `[pipeline]`
    /// 3. No retries, 1s initial backoff
    ///
    /// ```toml
    /// [pipeline]
    /// max_retries = 1
    ///
    /// [pipeline.stages."essay.polish"]
    /// max_retries = 3
    /// ```
    ///
    /// With the above, `essay.polish` retries three times and every other
    /// stage once.
    #[must_use]
    pub fn retry_policy_for(&self, stage_key: &str) -> RetryPolicy {
        let stage = self.pipeline.stages.get(stage_key);

        let max_retries = stage
            .and_then(|s| s.max_retries)
            .or(self.pipeline.max_retries)
            .unwrap_or(0);
        let backoff_ms = stage
            .and_then(|s| s.initial_backoff_ms)
            .or(self.pipeline.initial_backoff_ms)
            .unwrap_or(DEFAULT_STAGE_BACKOFF_MS);

        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(backoff_ms),
        }
    }

    #[must_use]
    pub fn plan_ttl(&self) -> Duration {
        Duration::from_secs(self.plans.ttl_secs.unwrap_or(DEFAULT_PLAN_TTL_SECS))
    }

    #[must_use]
    pub fn max_sessions(&self) -> usize {
        self.plans.max_sessions.unwrap_or(DEFAULT_MAX_SESSIONS)
    }

    /// Environment variable holding the API key for `role`.
    #[must_use]
    pub fn api_key_env(&self, role: ProviderRole) -> String {
        self.providers
            .for_role(role)
            .api_key_env
            .clone()
            .or_else(|| ProviderConfig::default_for(role).api_key_env)
            .unwrap_or_default()
    }

    /// Check that every provider's API key variable is set.
    ///
    /// All four keys are required: any mode may reach any provider. The error
    /// names every missing variable, not just the first.
    pub fn check_credentials(&self) -> Result<(), ConfigError> {
        self.check_credentials_with(|name| std::env::var(name).ok())
    }

    /// [`Config::check_credentials`] with an injectable variable lookup.
    pub fn check_credentials_with<F>(&self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let variables: Vec<String> = ProviderRole::ALL
            .iter()
            .map(|role| self.api_key_env(*role))
            .filter(|var| lookup(var).is_none_or(|value| value.trim().is_empty()))
            .collect();

        if variables.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingCredentials { variables })
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Config {
    /// Built-in defaults only, with no discovery.
    pub fn minimal_for_testing() -> Self {
        Config {
            defaults: Defaults::default(),
            server: ServerConfig::default(),
            providers: ProvidersConfig::default(),
            http: HttpConfig::default(),
            pipeline: PipelineConfig::default(),
            intent: IntentConfig::default(),
            plans: PlansConfig::default(),
            source_attribution: std::collections::HashMap::new(),
        }
    }
}
