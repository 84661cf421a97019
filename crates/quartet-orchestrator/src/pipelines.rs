//! The five pipelines and their binding to modes.

use quartet_config::{Config, RetryPolicy};
use quartet_prompt_template::templates;
use quartet_utils::types::{Mode, ProviderRole};

use crate::pipeline::{Pipeline, Stage};

/// Identifies one of the fixed pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineId {
    InquiryPlan,
    InquiryReport,
    Essay,
    Ideas,
    Research,
}

impl PipelineId {
    pub const ALL: [PipelineId; 5] = [
        PipelineId::InquiryPlan,
        PipelineId::InquiryReport,
        PipelineId::Essay,
        PipelineId::Ideas,
        PipelineId::Research,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InquiryPlan => "inquiry.plan",
            Self::InquiryReport => "inquiry.report",
            Self::Essay => "essay",
            Self::Ideas => "ideas",
            Self::Research => "research",
        }
    }

    /// Stage list with no retries.
    #[must_use]
    pub fn build(&self) -> Pipeline {
        use ProviderRole::{LongForm, Reasoning, Search, Synthesis};

        let stages = match self {
            Self::InquiryPlan => vec![
                Stage::new("background", Search, templates::INQUIRY_BACKGROUND),
                Stage::new("directions", Reasoning, templates::INQUIRY_DIRECTIONS),
                Stage::new("recommend", Synthesis, templates::INQUIRY_RECOMMEND),
            ],
            Self::InquiryReport => vec![
                Stage::new("outline", Synthesis, templates::INQUIRY_OUTLINE),
                Stage::new("report", LongForm, templates::INQUIRY_REPORT),
            ],
            Self::Essay => vec![
                Stage::new("facts", Search, templates::ESSAY_FACTS),
                Stage::new("draft", Reasoning, templates::ESSAY_DRAFT),
                Stage::new("logic-check", Synthesis, templates::ESSAY_LOGIC_CHECK),
                Stage::new("polish", LongForm, templates::ESSAY_POLISH),
            ],
            Self::Ideas => vec![
                Stage::new("brainstorm", Reasoning, templates::IDEAS_BRAINSTORM),
                Stage::new("curate", Synthesis, templates::IDEAS_CURATE),
                Stage::new("tidy", LongForm, templates::IDEAS_TIDY),
            ],
            Self::Research => vec![
                Stage::new("gather", Search, templates::RESEARCH_GATHER),
                Stage::new("restructure", Synthesis, templates::RESEARCH_RESTRUCTURE),
            ],
        };

        Pipeline::new(self.as_str(), stages)
    }
}

/// Pipelines each mode may run.
pub trait ModePipelines {
    fn pipelines(&self) -> &'static [PipelineId];
}

impl ModePipelines for Mode {
    fn pipelines(&self) -> &'static [PipelineId] {
        match self {
            Mode::Inquiry => &[PipelineId::InquiryPlan, PipelineId::InquiryReport],
            Mode::Essay => &[PipelineId::Essay],
            Mode::Ideas => &[PipelineId::Ideas],
            Mode::Research => &[PipelineId::Research],
        }
    }
}

/// Every pipeline, built once with retry policies resolved.
#[derive(Debug, Clone)]
pub struct PipelineCatalog {
    inquiry_plan: Pipeline,
    inquiry_report: Pipeline,
    essay: Pipeline,
    ideas: Pipeline,
    research: Pipeline,
}

impl PipelineCatalog {
    pub fn with_retry_policies<F>(policy_for: F) -> Self
    where
        F: Fn(&str) -> RetryPolicy,
    {
        let build = |id: PipelineId| id.build().with_retry_policies(&policy_for);
        Self {
            inquiry_plan: build(PipelineId::InquiryPlan),
            inquiry_report: build(PipelineId::InquiryReport),
            essay: build(PipelineId::Essay),
            ideas: build(PipelineId::Ideas),
            research: build(PipelineId::Research),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::with_retry_policies(|key| config.retry_policy_for(key))
    }

    #[must_use]
    pub fn get(&self, id: PipelineId) -> &Pipeline {
        match id {
            PipelineId::InquiryPlan => &self.inquiry_plan,
            PipelineId::InquiryReport => &self.inquiry_report,
            PipelineId::Essay => &self.essay,
            PipelineId::Ideas => &self.ideas,
            PipelineId::Research => &self.research,
        }
    }
}

impl Default for PipelineCatalog {
    fn default() -> Self {
        Self::with_retry_policies(|_| RetryPolicy::NONE)
    }
}
