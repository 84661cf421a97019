use std::collections::HashMap;

use quartet_utils::error::ConfigError;
use quartet_utils::types::ProviderRole;

use crate::{
    Config, ConfigSource, Defaults, HttpConfig, IntentConfig, PipelineConfig, PlansConfig,
    ProvidersConfig, ServerConfig, StageOverride,
};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this when embedding quartet or in tests, where the environment and
    /// any config file on disk must not influence behavior.
    ///
    /// ```rust
    /// use quartet_config::Config;
    /// use quartet_utils::types::ProviderRole;
    ///
    /// let config = Config::builder()
    ///     .stage_timeout_secs(60)
    ///     .provider_base_url(ProviderRole::Synthesis, "http://127.0.0.1:9000")
    ///     .stage_retries("essay.polish", 2, 250)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.retry_policy_for("essay.polish").max_retries, 2);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for programmatic configuration.
///
/// All values set via the builder are attributed to
/// `ConfigSource::Programmatic`.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    stage_timeout_secs: Option<u64>,
    verbose: Option<bool>,
    bind: Option<String>,
    http_max_retries: Option<u32>,
    pipeline_max_retries: Option<u32>,
    pipeline_initial_backoff_ms: Option<u64>,
    stages: HashMap<String, StageOverride>,
    provider_models: Vec<(ProviderRole, String)>,
    provider_base_urls: Vec<(ProviderRole, String)>,
    provider_key_envs: Vec<(ProviderRole, String)>,
    extra_keywords: Vec<String>,
    plan_ttl_secs: Option<u64>,
    max_sessions: Option<usize>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stage_timeout_secs(mut self, secs: u64) -> Self {
        self.stage_timeout_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    #[must_use]
    pub fn bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = Some(bind.into());
        self
    }

    /// Transport-level retries in the shared HTTP client.
    #[must_use]
    pub fn http_max_retries(mut self, retries: u32) -> Self {
        self.http_max_retries = Some(retries);
        self
    }

    /// Default retry policy applied to every stage without an override.
    #[must_use]
    pub fn pipeline_retries(mut self, max_retries: u32, initial_backoff_ms: u64) -> Self {
        self.pipeline_max_retries = Some(max_retries);
        self.pipeline_initial_backoff_ms = Some(initial_backoff_ms);
        self
    }

    /// Retry policy for one stage, keyed `<pipeline>.<stage>` (e.g. `essay.polish`).
    #[must_use]
    pub fn stage_retries(
        mut self,
        stage_key: impl Into<String>,
        max_retries: u32,
        initial_backoff_ms: u64,
    ) -> Self {
        self.stages.insert(
            stage_key.into(),
            StageOverride {
                max_retries: Some(max_retries),
                initial_backoff_ms: Some(initial_backoff_ms),
            },
        );
        self
    }

    #[must_use]
    pub fn provider_model(mut self, role: ProviderRole, model: impl Into<String>) -> Self {
        self.provider_models.push((role, model.into()));
        self
    }

    /// Point a provider at another endpoint, e.g. a local mock server.
    #[must_use]
    pub fn provider_base_url(mut self, role: ProviderRole, url: impl Into<String>) -> Self {
        self.provider_base_urls.push((role, url.into()));
        self
    }

    #[must_use]
    pub fn provider_api_key_env(mut self, role: ProviderRole, var: impl Into<String>) -> Self {
        self.provider_key_envs.push((role, var.into()));
        self
    }

    #[must_use]
    pub fn extra_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.extra_keywords.push(keyword.into());
        self
    }

    #[must_use]
    pub fn plan_ttl_secs(mut self, secs: u64) -> Self {
        self.plan_ttl_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = Some(max);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut source_attribution = HashMap::new();
        let mut mark = |key: String| {
            source_attribution.insert(key, ConfigSource::Programmatic);
        };

        let mut defaults = Defaults::default();
        if let Some(secs) = self.stage_timeout_secs {
            defaults.stage_timeout_secs = Some(secs);
            mark("stage_timeout_secs".to_string());
        }
        if let Some(verbose) = self.verbose {
            defaults.verbose = Some(verbose);
            mark("verbose".to_string());
        }

        let mut server = ServerConfig::default();
        if let Some(bind) = self.bind {
            server.bind = Some(bind);
            mark("bind".to_string());
        }

        let mut http = HttpConfig::default();
        if let Some(retries) = self.http_max_retries {
            http.max_retries = Some(retries);
            mark("http_max_retries".to_string());
        }

        let mut pipeline = PipelineConfig::default();
        if let Some(retries) = self.pipeline_max_retries {
            pipeline.max_retries = Some(retries);
            mark("pipeline_max_retries".to_string());
        }
        if let Some(backoff) = self.pipeline_initial_backoff_ms {
            pipeline.initial_backoff_ms = Some(backoff);
            mark("pipeline_initial_backoff_ms".to_string());
        }
        for (key, stage) in self.stages {
            mark(format!("pipeline.stages.{key}"));
            pipeline.stages.insert(key, stage);
        }

        let mut providers = ProvidersConfig::default();
        for (role, model) in self.provider_models {
            providers.for_role_mut(role).model = Some(model);
            mark(format!("providers.{}.model", role.provider_name()));
        }
        for (role, url) in self.provider_base_urls {
            providers.for_role_mut(role).base_url = Some(url);
            mark(format!("providers.{}.base_url", role.provider_name()));
        }
        for (role, var) in self.provider_key_envs {
            providers.for_role_mut(role).api_key_env = Some(var);
            mark(format!("providers.{}.api_key_env", role.provider_name()));
        }

        let mut intent = IntentConfig::default();
        if !self.extra_keywords.is_empty() {
            intent.extra_keywords = self.extra_keywords;
            mark("intent_extra_keywords".to_string());
        }

        let mut plans = PlansConfig::default();
        if let Some(ttl) = self.plan_ttl_secs {
            plans.ttl_secs = Some(ttl);
            mark("plan_ttl_secs".to_string());
        }
        if let Some(max) = self.max_sessions {
            plans.max_sessions = Some(max);
            mark("max_sessions".to_string());
        }

        let config = Config {
            defaults,
            server,
            providers,
            http,
            pipeline,
            intent,
            plans,
            source_attribution,
        };
        config.validate()?;
        Ok(config)
    }
}
