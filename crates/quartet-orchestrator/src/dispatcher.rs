//! Mode dispatch and the inquiry plan/continue branches.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use quartet_config::Config;
use quartet_llm::ProviderSet;
use quartet_prompt_template::MISSING_PLAN_NOTICE;
use quartet_utils::error::OrchestrationError;
use quartet_utils::types::Mode;

use crate::intent::{Intent, IntentClassifier, KeywordClassifier};
use crate::pipelines::{ModePipelines, PipelineCatalog, PipelineId};
use crate::plan_store::{PlanStore, SessionId};

/// One student request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub mode: Mode,
    pub text: String,
    pub session: SessionId,
}

impl ChatRequest {
    /// Request in the default session.
    #[must_use]
    pub fn new(mode: Mode, text: impl Into<String>) -> Self {
        Self {
            mode,
            text: text.into(),
            session: SessionId::default(),
        }
    }

    #[must_use]
    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = session;
        self
    }

    /// Build a request from wire values.
    ///
    /// # Errors
    ///
    /// `OrchestrationError::Validation` for an unknown mode or a blank session id.
    pub fn parse(
        mode: &str,
        text: impl Into<String>,
        session: Option<&str>,
    ) -> Result<Self, OrchestrationError> {
        Ok(Self {
            mode: mode.parse()?,
            text: text.into(),
            session: SessionId::from_optional(session)?,
        })
    }
}

/// Routes requests to pipelines and keeps the inquiry plan store.
pub struct Dispatcher {
    providers: ProviderSet,
    pipelines: PipelineCatalog,
    plans: PlanStore,
    classifier: Arc<dyn IntentClassifier>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        providers: ProviderSet,
        pipelines: PipelineCatalog,
        plans: PlanStore,
        classifier: Arc<dyn IntentClassifier>,
    ) -> Self {
        Self {
            providers,
            pipelines,
            plans,
            classifier,
        }
    }

    /// Retry policies, plan store limits and extra keywords from `config`.
    #[must_use]
    pub fn from_config(config: &Config, providers: ProviderSet) -> Self {
        let classifier = KeywordClassifier::new()
            .with_extra_keywords(config.intent.extra_keywords.iter().cloned());
        Self::new(
            providers,
            PipelineCatalog::from_config(config),
            PlanStore::new(config.plan_ttl(), config.max_sessions()),
            Arc::new(classifier),
        )
    }

    #[must_use]
    pub fn plan_store(&self) -> &PlanStore {
        &self.plans
    }

    /// Produce the answer for `request`.
    ///
    /// Inquiry requests are classified first:
    /// - finalize with no stored plan returns [`MISSING_PLAN_NOTICE`] without
    ///   calling any provider
    /// - finalize with a stored plan runs `inquiry.report`; the plan stays stored
    /// - anything else runs `inquiry.plan` and stores its answer as the plan
    ///
    /// Other modes run their single pipeline and never touch the plan store.
    ///
    /// # Errors
    ///
    /// `OrchestrationError::Provider` if any stage fails. The plan store is
    /// left unchanged on failure.
    pub async fn handle(&self, request: &ChatRequest) -> Result<String, OrchestrationError> {
        let started = Instant::now();
        info!(
            mode = %request.mode,
            session = %request.session,
            input_chars = request.text.chars().count(),
            "Dispatching request"
        );

        let answer = match (request.mode.is_two_phase(), request.mode.pipelines()) {
            (true, &[plan, report]) => self.handle_inquiry(request, plan, report).await?,
            (false, &[single]) => self.run(single, &request.text, None).await?,
            (_, ids) => {
                return Err(OrchestrationError::Internal(format!(
                    "mode '{}' maps to {} pipelines",
                    request.mode,
                    ids.len()
                )));
            }
        };

        info!(
            mode = %request.mode,
            session = %request.session,
            duration_ms = started.elapsed().as_millis() as u64,
            answer_chars = answer.chars().count(),
            "Request completed"
        );
        Ok(answer)
    }

    async fn handle_inquiry(
        &self,
        request: &ChatRequest,
        plan_pipeline: PipelineId,
        report_pipeline: PipelineId,
    ) -> Result<String, OrchestrationError> {
        let intent = self.classifier.classify(&request.text);
        debug!(session = %request.session, intent = ?intent, "Classified inquiry request");

        match intent {
            Intent::Finalize => match self.plans.read(&request.session) {
                None => {
                    info!(session = %request.session, "Write-up requested with no stored plan");
                    Ok(MISSING_PLAN_NOTICE.to_string())
                }
                Some(plan) => {
                    self.run(report_pipeline, &request.text, Some(&plan))
                        .await
                }
            },
            Intent::Plan => {
                let plan = self.run(plan_pipeline, &request.text, None).await?;
                self.plans.write(&request.session, plan.clone());
                Ok(plan)
            }
        }
    }

    async fn run(
        &self,
        id: PipelineId,
        input: &str,
        plan: Option<&str>,
    ) -> Result<String, OrchestrationError> {
        self.pipelines
            .get(id)
            .run(&self.providers, input, plan)
            .await
    }
}
