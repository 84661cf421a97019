use std::net::SocketAddr;

use quartet_utils::error::ConfigError;
use quartet_utils::types::{ProviderRole, STAGE_KEYS};

use crate::Config;

const MAX_RETRIES_LIMIT: u32 = 10;

fn invalid(key: impl Into<String>, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.into(),
        value: value.into(),
    }
}

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(timeout) = self.defaults.stage_timeout_secs {
            if timeout < 5 {
                return Err(invalid("stage_timeout_secs", "must be at least 5 seconds"));
            }
            if timeout > 3600 {
                return Err(invalid(
                    "stage_timeout_secs",
                    "exceeds maximum limit of 3600 seconds (1 hour)",
                ));
            }
        }

        if let Some(bind) = &self.server.bind
            && bind.parse::<SocketAddr>().is_err()
        {
            return Err(invalid(
                "bind",
                format!("'{bind}' is not a socket address such as 127.0.0.1:8000"),
            ));
        }

        for role in ProviderRole::ALL {
            let name = role.provider_name();
            let provider = self.providers.for_role(role);

            if let Some(temperature) = provider.temperature
                && !(0.0..=2.0).contains(&temperature)
            {
                return Err(invalid(
                    format!("providers.{name}.temperature"),
                    format!("{temperature} is outside 0.0..=2.0"),
                ));
            }
            if provider.max_tokens == Some(0) {
                return Err(invalid(
                    format!("providers.{name}.max_tokens"),
                    "must be greater than 0",
                ));
            }
            if provider.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
                return Err(invalid(format!("providers.{name}.model"), "must not be empty"));
            }
            if provider
                .api_key_env
                .as_deref()
                .is_some_and(|v| v.trim().is_empty())
            {
                return Err(invalid(
                    format!("providers.{name}.api_key_env"),
                    "must name an environment variable",
                ));
            }
        }

        if let Some(retries) = self.http.max_retries
            && retries > MAX_RETRIES_LIMIT
        {
            return Err(invalid(
                "http_max_retries",
                format!("exceeds maximum limit of {MAX_RETRIES_LIMIT}"),
            ));
        }

        if let Some(retries) = self.pipeline.max_retries
            && retries > MAX_RETRIES_LIMIT
        {
            return Err(invalid(
                "pipeline_max_retries",
                format!("exceeds maximum limit of {MAX_RETRIES_LIMIT}"),
            ));
        }

        for (key, stage) in &self.pipeline.stages {
            if !STAGE_KEYS.contains(&key.as_str()) {
                return Err(invalid(
                    format!("pipeline.stages.{key}"),
                    format!("unknown stage. Known stages: {}", STAGE_KEYS.join(", ")),
                ));
            }
            if let Some(retries) = stage.max_retries
                && retries > MAX_RETRIES_LIMIT
            {
                return Err(invalid(
                    format!("pipeline.stages.{key}.max_retries"),
                    format!("exceeds maximum limit of {MAX_RETRIES_LIMIT}"),
                ));
            }
        }

        if self.intent.extra_keywords.iter().any(|k| k.is_empty()) {
            return Err(invalid(
                "intent_extra_keywords",
                "empty keyword would match every input",
            ));
        }

        if self.plans.ttl_secs == Some(0) {
            return Err(invalid("plan_ttl_secs", "must be greater than 0"));
        }
        if self.plans.max_sessions == Some(0) {
            return Err(invalid("max_sessions", "must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StageOverride;

    fn assert_invalid_key(result: Result<(), ConfigError>, expected_key: &str) {
        match result {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("Expected InvalidValue for {expected_key}, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        Config::minimal_for_testing().validate().unwrap();
    }

    #[test]
    fn test_stage_timeout_bounds() {
        let mut config = Config::minimal_for_testing();
        config.defaults.stage_timeout_secs = Some(4);
        assert_invalid_key(config.validate(), "stage_timeout_secs");

        config.defaults.stage_timeout_secs = Some(3601);
        assert_invalid_key(config.validate(), "stage_timeout_secs");

        config.defaults.stage_timeout_secs = Some(5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_temperature_out_of_range() {
        let mut config = Config::minimal_for_testing();
        config.providers.gemini.temperature = Some(2.5);
        assert_invalid_key(config.validate(), "providers.gemini.temperature");
    }

    #[test]
    fn test_zero_max_tokens_rejected() {
        let mut config = Config::minimal_for_testing();
        config.providers.anthropic.max_tokens = Some(0);
        assert_invalid_key(config.validate(), "providers.anthropic.max_tokens");
    }

    #[test]
    fn test_unparsable_bind_rejected() {
        let mut config = Config::minimal_for_testing();
        config.server.bind = Some("localhost".to_string());
        assert_invalid_key(config.validate(), "bind");
    }

    #[test]
    fn test_unknown_stage_override_rejected() {
        let mut config = Config::minimal_for_testing();
        config
            .pipeline
            .stages
            .insert("essay.conclusion".to_string(), StageOverride::default());
        assert_invalid_key(config.validate(), "pipeline.stages.essay.conclusion");
    }

    #[test]
    fn test_retry_limits() {
        let mut config = Config::minimal_for_testing();
        config.http.max_retries = Some(11);
        assert_invalid_key(config.validate(), "http_max_retries");

        let mut config = Config::minimal_for_testing();
        config.pipeline.stages.insert(
            "essay.polish".to_string(),
            StageOverride {
                max_retries: Some(50),
                initial_backoff_ms: None,
            },
        );
        assert_invalid_key(config.validate(), "pipeline.stages.essay.polish.max_retries");
    }

    #[test]
    fn test_zero_plan_limits_rejected() {
        let mut config = Config::minimal_for_testing();
        config.plans.ttl_secs = Some(0);
        assert_invalid_key(config.validate(), "plan_ttl_secs");

        let mut config = Config::minimal_for_testing();
        config.plans.max_sessions = Some(0);
        assert_invalid_key(config.validate(), "max_sessions");
    }

    #[test]
    fn test_empty_extra_keyword_rejected() {
        let mut config = Config::minimal_for_testing();
        config.intent.extra_keywords = vec![String::new()];
        assert_invalid_key(config.validate(), "intent_extra_keywords");
    }
}
