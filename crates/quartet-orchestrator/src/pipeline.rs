//! Linear prompt-chaining pipelines
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s. Each stage renders its
//! template against the request input, the optional stored plan and every
//! earlier stage's output, sends the prompt to the provider bound to its
//! role, and hands the text on. The last stage's text is the answer.

use std::time::Instant;

use tracing::{Instrument, warn};

use quartet_config::RetryPolicy;
use quartet_llm::{LlmError, ProviderSet};
use quartet_prompt_template::{PromptTemplate, StageContext, StageOutput};
use quartet_utils::error::OrchestrationError;
use quartet_utils::logging::{log_stage_complete, log_stage_error, log_stage_start, stage_span};
use quartet_utils::types::ProviderRole;

/// One step of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub id: &'static str,
    pub role: ProviderRole,
    pub template: PromptTemplate,
    pub retry: RetryPolicy,
}

impl Stage {
    #[must_use]
    pub const fn new(id: &'static str, role: ProviderRole, template: PromptTemplate) -> Self {
        Self {
            id,
            role,
            template,
            retry: RetryPolicy::NONE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    id: &'static str,
    stages: Vec<Stage>,
}

impl Pipeline {
    #[must_use]
    pub fn new(id: &'static str, stages: Vec<Stage>) -> Self {
        Self { id, stages }
    }

    #[must_use]
    pub fn id(&self) -> &'static str {
        self.id
    }

    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// `<pipeline>.<stage>` keys in run order, as used by `[pipeline.stages]`.
    pub fn stage_keys(&self) -> impl Iterator<Item = String> + '_ {
        self.stages
            .iter()
            .map(move |stage| format!("{}.{}", self.id, stage.id))
    }

    /// Set each stage's retry policy from its `<pipeline>.<stage>` key.
    #[must_use]
    pub fn with_retry_policies<F>(mut self, policy_for: F) -> Self
    where
        F: Fn(&str) -> RetryPolicy,
    {
        let id = self.id;
        for stage in &mut self.stages {
            stage.retry = policy_for(&format!("{id}.{}", stage.id));
        }
        self
    }

    /// Run every stage in order and return the last stage's output unmodified.
    ///
    /// # Errors
    ///
    /// - `OrchestrationError::Provider` for the first stage whose provider call
    ///   fails after its retries; later stages never run
    /// - `OrchestrationError::Internal` if the pipeline has no stages
    pub async fn run(
        &self,
        providers: &ProviderSet,
        input: &str,
        plan: Option<&str>,
    ) -> Result<String, OrchestrationError> {
        let mut outputs: Vec<StageOutput> = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let ctx = StageContext {
                input,
                plan,
                prior_outputs: &outputs,
            };
            let prompt = stage.template.render(&ctx);

            let span = stage_span(self.id, stage.id, stage.role.as_str());
            let text = self
                .run_stage(stage, providers, &prompt)
                .instrument(span)
                .await?;

            outputs.push(StageOutput::new(stage.template.output_label, text));
        }

        outputs.pop().map(|output| output.text).ok_or_else(|| {
            OrchestrationError::Internal(format!("pipeline '{}' has no stages", self.id))
        })
    }

    async fn run_stage(
        &self,
        stage: &Stage,
        providers: &ProviderSet,
        prompt: &str,
    ) -> Result<String, OrchestrationError> {
        let provider = providers.get(stage.role);
        let started = Instant::now();
        let mut attempt: u32 = 0;

        log_stage_start(self.id, stage.id, stage.role.as_str());

        loop {
            match provider.generate_labelled(self.id, stage.id, prompt).await {
                Ok(text) => {
                    log_stage_complete(
                        self.id,
                        stage.id,
                        started.elapsed().as_millis(),
                        text.chars().count(),
                    );
                    return Ok(text);
                }
                Err(error) if error.is_retryable() && attempt < stage.retry.max_retries => {
                    attempt += 1;
                    let backoff = stage.retry.backoff_for(attempt);
                    warn!(
                        pipeline = self.id,
                        stage = stage.id,
                        attempt = attempt,
                        max_retries = stage.retry.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %quartet_utils::redaction::redact_error_message(&error.to_string()),
                        "Stage failed, will retry"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(error) => {
                    log_stage_error(
                        self.id,
                        stage.id,
                        &error.to_string(),
                        started.elapsed().as_millis(),
                    );
                    return Err(self.provider_error(stage, error));
                }
            }
        }
    }

    fn provider_error(&self, stage: &Stage, source: LlmError) -> OrchestrationError {
        OrchestrationError::Provider {
            pipeline: self.id.to_string(),
            stage: stage.id.to_string(),
            source,
        }
    }
}
