use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OrchestrationError;

/// Assignment categories served by quartet.
///
/// Each mode is bound to a fixed set of pipelines. `Inquiry` is the only
/// two-phase mode: a planning pass followed by a write-up pass that consumes
/// the stored plan.
///
/// # Wire format
///
/// Serializes to the lowercase name. Deserialization and [`FromStr`] also
/// accept the single-letter tags `A`-`D` used by the first web client.
///
/// ```rust
/// use quartet_utils::types::Mode;
///
/// assert_eq!("essay".parse::<Mode>().unwrap(), Mode::Essay);
/// assert_eq!("A".parse::<Mode>().unwrap(), Mode::Inquiry);
/// assert!("E".parse::<Mode>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Inquiry-report planning, then the report write-up
    #[serde(alias = "A")]
    Inquiry,
    /// Persuasive essay drafting
    #[serde(alias = "B")]
    Essay,
    /// Creative idea brainstorming
    #[serde(alias = "C")]
    Ideas,
    /// Research gathering and summarisation
    #[serde(alias = "D")]
    Research,
}

impl Mode {
    /// Every mode, in wire-tag order.
    pub const ALL: [Mode; 4] = [Mode::Inquiry, Mode::Essay, Mode::Ideas, Mode::Research];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inquiry => "inquiry",
            Self::Essay => "essay",
            Self::Ideas => "ideas",
            Self::Research => "research",
        }
    }

    /// Single-letter tag accepted for compatibility with the legacy web client.
    #[must_use]
    pub const fn legacy_tag(&self) -> &'static str {
        match self {
            Self::Inquiry => "A",
            Self::Essay => "B",
            Self::Ideas => "C",
            Self::Research => "D",
        }
    }

    /// Whether this mode reads and writes the plan store.
    #[must_use]
    pub const fn is_two_phase(&self) -> bool {
        matches!(self, Self::Inquiry)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = OrchestrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == trimmed || mode.legacy_tag() == trimmed)
            .ok_or_else(|| {
                OrchestrationError::Validation(format!(
                    "Unknown mode '{}'. Expected one of: inquiry (A), essay (B), ideas (C), research (D)",
                    s
                ))
            })
    }
}

/// The four provider roles a pipeline stage can be bound to.
///
/// Each role maps to exactly one configured provider at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderRole {
    /// Search-augmented retrieval (Perplexity)
    Search,
    /// Fast general reasoning and idea generation (OpenAI)
    Reasoning,
    /// Structuring, validation and recommendation (Gemini)
    Synthesis,
    /// Long-form prose writing and polish (Anthropic)
    LongForm,
}

impl ProviderRole {
    pub const ALL: [ProviderRole; 4] = [
        ProviderRole::Search,
        ProviderRole::Reasoning,
        ProviderRole::Synthesis,
        ProviderRole::LongForm,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Reasoning => "reasoning",
            Self::Synthesis => "synthesis",
            Self::LongForm => "long-form",
        }
    }

    /// Name of the provider section (`[providers.<name>]`) serving this role.
    #[must_use]
    pub const fn provider_name(&self) -> &'static str {
        match self {
            Self::Search => "perplexity",
            Self::Reasoning => "openai",
            Self::Synthesis => "gemini",
            Self::LongForm => "anthropic",
        }
    }
}

impl fmt::Display for ProviderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully qualified `<pipeline>.<stage>` keys of every pipeline stage, in run order.
///
/// Configuration uses these to validate `[pipeline.stages."<key>"]` overrides.
pub const STAGE_KEYS: [&str; 14] = [
    "inquiry.plan.background",
    "inquiry.plan.directions",
    "inquiry.plan.recommend",
    "inquiry.report.outline",
    "inquiry.report.report",
    "essay.facts",
    "essay.draft",
    "essay.logic-check",
    "essay.polish",
    "ideas.brainstorm",
    "ideas.curate",
    "ideas.tidy",
    "research.gather",
    "research.restructure",
];

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value loaded from configuration file.
    Config,
    /// Value provided programmatically (e.g., `Config::builder()`).
    Programmatic,
    /// Built-in default value (lowest precedence).
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::Config => write!(f, "config"),
            Self::Programmatic => write!(f, "programmatic"),
            Self::Default => write!(f, "default"),
        }
    }
}
