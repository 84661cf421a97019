use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use quartet_utils::error::ConfigError;
use quartet_utils::types::ProviderRole;

use crate::model::TomlProviders;
use crate::{
    CliArgs, Config, ConfigSource, Defaults, HttpConfig, IntentConfig, PipelineConfig, PlansConfig,
    ProvidersConfig, ServerConfig,
};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "QUARTET_CONFIG";

/// TOML configuration file structure
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    defaults: Option<Defaults>,
    server: Option<ServerConfig>,
    providers: Option<TomlProviders>,
    http: Option<HttpConfig>,
    pipeline: Option<PipelineConfig>,
    intent: Option<IntentConfig>,
    plans: Option<PlansConfig>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        let env_path = std::env::var_os(CONFIG_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::discover_from(&start_dir, env_path.as_deref(), cli_args)
    }

    /// Discover and load configuration starting from a specific directory.
    ///
    /// `env_path` stands in for `QUARTET_CONFIG` so tests need not touch the
    /// process environment. An explicit `--config` path wins over it.
    pub fn discover_from(
        start_dir: &Path,
        env_path: Option<&Path>,
        cli_args: &CliArgs,
    ) -> Result<Self> {
        let mut source_attribution = HashMap::new();

        let mut defaults = Defaults::default();
        let mut server = ServerConfig::default();
        let mut providers = ProvidersConfig::default();
        let mut http = HttpConfig::default();
        let mut pipeline = PipelineConfig::default();
        let mut intent = IntentConfig::default();
        let mut plans = PlansConfig::default();

        for key in [
            "stage_timeout_secs",
            "verbose",
            "bind",
            "http_max_retries",
            "pipeline_max_retries",
            "pipeline_initial_backoff_ms",
            "plan_ttl_secs",
            "max_sessions",
        ] {
            source_attribution.insert(key.to_string(), ConfigSource::Default);
        }

        let config_path = match (&cli_args.config_path, env_path) {
            (Some(explicit), _) => Some(explicit.clone()),
            (None, Some(from_env)) => Some(from_env.to_path_buf()),
            (None, None) => Self::discover_config_file_from(start_dir)?,
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;

            let source = ConfigSource::Config;

            if let Some(file_defaults) = file_config.defaults {
                if file_defaults.stage_timeout_secs.is_some() {
                    defaults.stage_timeout_secs = file_defaults.stage_timeout_secs;
                    source_attribution.insert("stage_timeout_secs".to_string(), source.clone());
                }
                if file_defaults.verbose.is_some() {
                    defaults.verbose = file_defaults.verbose;
                    source_attribution.insert("verbose".to_string(), source.clone());
                }
            }

            if let Some(file_server) = file_config.server
                && file_server.bind.is_some()
            {
                server.bind = file_server.bind;
                source_attribution.insert("bind".to_string(), source.clone());
            }

            if let Some(mut file_providers) = file_config.providers {
                for role in ProviderRole::ALL {
                    if let Some(section) = file_providers.take(role) {
                        for field in providers.for_role_mut(role).overlay(section) {
                            source_attribution.insert(
                                format!("providers.{}.{field}", role.provider_name()),
                                source.clone(),
                            );
                        }
                    }
                }
            }

            if let Some(file_http) = file_config.http
                && file_http.max_retries.is_some()
            {
                http.max_retries = file_http.max_retries;
                source_attribution.insert("http_max_retries".to_string(), source.clone());
            }

            if let Some(file_pipeline) = file_config.pipeline {
                if file_pipeline.max_retries.is_some() {
                    pipeline.max_retries = file_pipeline.max_retries;
                    source_attribution.insert("pipeline_max_retries".to_string(), source.clone());
                }
                if file_pipeline.initial_backoff_ms.is_some() {
                    pipeline.initial_backoff_ms = file_pipeline.initial_backoff_ms;
                    source_attribution
                        .insert("pipeline_initial_backoff_ms".to_string(), source.clone());
                }
                for (key, stage) in file_pipeline.stages {
                    source_attribution.insert(format!("pipeline.stages.{key}"), source.clone());
                    pipeline.stages.insert(key, stage);
                }
            }

            if let Some(file_intent) = file_config.intent
                && !file_intent.extra_keywords.is_empty()
            {
                intent.extra_keywords = file_intent.extra_keywords;
                source_attribution.insert("intent_extra_keywords".to_string(), source.clone());
            }

            if let Some(file_plans) = file_config.plans {
                if file_plans.ttl_secs.is_some() {
                    plans.ttl_secs = file_plans.ttl_secs;
                    source_attribution.insert("plan_ttl_secs".to_string(), source.clone());
                }
                if file_plans.max_sessions.is_some() {
                    plans.max_sessions = file_plans.max_sessions;
                    source_attribution.insert("max_sessions".to_string(), source.clone());
                }
            }
        }

        // CLI overrides (highest priority)
        if let Some(verbose) = cli_args.verbose {
            defaults.verbose = Some(verbose);
            source_attribution.insert("verbose".to_string(), ConfigSource::Cli);
        }
        if let Some(bind) = &cli_args.bind {
            server.bind = Some(bind.clone());
            source_attribution.insert("bind".to_string(), ConfigSource::Cli);
        }
        if let Some(timeout) = cli_args.stage_timeout_secs {
            defaults.stage_timeout_secs = Some(timeout);
            source_attribution.insert("stage_timeout_secs".to_string(), ConfigSource::Cli);
        }

        let config = Self {
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

    /// Discover config file by searching upward from a given directory
    ///
    /// Walks up the directory tree looking for `.quartet/config.toml`, stopping
    /// at repository root markers (.git, .hg, .svn) or the filesystem root.
    pub fn discover_config_file_from(start_dir: &Path) -> Result<Option<PathBuf>> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(".quartet").join("config.toml");
            if config_path.exists() {
                return Ok(Some(config_path));
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                break;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        if !path.exists() {
            return Err(ConfigError::DiscoveryFailed {
                reason: format!("config file {} does not exist", path.display()),
            }
            .into());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::InvalidFile(e.to_string()))?;

        Ok(config)
    }
}
