use std::collections::HashMap;

use quartet_utils::types::ProviderRole;

use crate::{Config, ConfigSource};

fn source_label(source: Option<&ConfigSource>) -> String {
    source.unwrap_or(&ConfigSource::Default).to_string()
}

impl Config {
    /// Effective configuration as `key -> (value, source)` pairs.
    ///
    /// API keys are never included; only the names of the variables that hold them.
    #[must_use]
    pub fn effective_config(&self) -> HashMap<String, (String, String)> {
        let mut config = HashMap::new();

        let mut add_config = |key: &str, value: Option<String>| {
            if let Some(val) = value {
                let source = source_label(self.source_attribution.get(key));
                config.insert(key.to_string(), (val, source));
            }
        };

        add_config(
            "stage_timeout_secs",
            self.defaults.stage_timeout_secs.map(|v| v.to_string()),
        );
        add_config("verbose", self.defaults.verbose.map(|v| v.to_string()));
        add_config("bind", self.server.bind.clone());
        add_config("http_max_retries", self.http.max_retries.map(|v| v.to_string()));
        add_config(
            "pipeline_max_retries",
            self.pipeline.max_retries.map(|v| v.to_string()),
        );
        add_config(
            "pipeline_initial_backoff_ms",
            self.pipeline.initial_backoff_ms.map(|v| v.to_string()),
        );
        add_config("plan_ttl_secs", self.plans.ttl_secs.map(|v| v.to_string()));
        add_config("max_sessions", self.plans.max_sessions.map(|v| v.to_string()));

        if !self.intent.extra_keywords.is_empty() {
            add_config(
                "intent_extra_keywords",
                Some(self.intent.extra_keywords.join(", ")),
            );
        }

        for role in ProviderRole::ALL {
            let name = role.provider_name();
            let provider = self.providers.for_role(role);
            let fields = [
                ("api_key_env", provider.api_key_env.clone()),
                ("base_url", provider.base_url.clone()),
                ("model", provider.model.clone()),
                ("max_tokens", provider.max_tokens.map(|v| v.to_string())),
                ("temperature", provider.temperature.map(|v| v.to_string())),
                ("system_prompt", provider.system_prompt.clone()),
            ];
            for (field, value) in fields {
                add_config(&format!("providers.{name}.{field}"), value);
            }
        }

        for key in self.pipeline.stages.keys() {
            let policy = self.retry_policy_for(key);
            add_config(
                &format!("pipeline.stages.{key}"),
                Some(format!(
                    "max_retries={}, initial_backoff_ms={}",
                    policy.max_retries,
                    policy.initial_backoff.as_millis()
                )),
            );
        }

        config
    }
}
