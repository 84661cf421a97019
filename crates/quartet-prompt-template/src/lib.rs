//! Prompt templates for quartet pipeline stages
//!
//! A [`PromptTemplate`] is fixed text with three interpolation points: the
//! student's input, the stored plan (continue branch only) and the
//! output of every earlier stage in the same pipeline. Rendering is pure:
//! the same [`StageContext`] always yields the same prompt.
//!
//! ```rust
//! use quartet_prompt_template::{StageContext, StageOutput, templates};
//!
//! let prior = vec![StageOutput::new(templates::RESEARCH_GATHER.output_label, "notes")];
//! let ctx = StageContext::new("volcanoes").with_prior_outputs(&prior);
//! let prompt = templates::RESEARCH_RESTRUCTURE.render(&ctx);
//! assert!(prompt.contains("volcanoes"));
//! assert!(prompt.contains("notes"));
//! ```

pub mod templates;

pub use templates::{MISSING_PLAN_NOTICE, PLAN_CALL_TO_ACTION};

/// Output of a finished stage, labelled for embedding into later prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutput {
    pub label: &'static str,
    pub text: String,
}

impl StageOutput {
    #[must_use]
    pub fn new(label: &'static str, text: impl Into<String>) -> Self {
        Self {
            label,
            text: text.into(),
        }
    }
}

/// Everything a stage template may interpolate.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    /// The student's request, verbatim
    pub input: &'a str,
    /// Plan stored by an earlier planning run, when continuing one
    pub plan: Option<&'a str>,
    /// Outputs of the stages that already ran, in run order
    pub prior_outputs: &'a [StageOutput],
}

impl<'a> StageContext<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            plan: None,
            prior_outputs: &[],
        }
    }

    #[must_use]
    pub fn with_plan(mut self, plan: &'a str) -> Self {
        self.plan = Some(plan);
        self
    }

    #[must_use]
    pub fn with_prior_outputs(mut self, prior_outputs: &'a [StageOutput]) -> Self {
        self.prior_outputs = prior_outputs;
        self
    }
}

/// Section heading for the stored plan.
pub const PLAN_LABEL: &str = "Inquiry plan from the previous step";

/// Fixed prompt text for one pipeline stage
///
/// Renders as: persona line, the labelled input, the labelled plan if any,
/// each prior output under its own label, then the instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    /// Opening line setting the model's persona, if the stage uses one
    pub persona: Option<&'static str>,
    /// Heading for the student's input
    pub input_label: &'static str,
    /// Heading later stages use for this stage's output
    pub output_label: &'static str,
    pub instructions: &'static str,
}

impl PromptTemplate {
    #[must_use]
    pub fn render(&self, ctx: &StageContext<'_>) -> String {
        let mut prompt = String::new();

        if let Some(persona) = self.persona {
            prompt.push_str(persona);
            prompt.push_str("\n\n");
        }

        push_section(&mut prompt, self.input_label, ctx.input);

        if let Some(plan) = ctx.plan {
            push_section(&mut prompt, PLAN_LABEL, plan);
        }

        for output in ctx.prior_outputs {
            push_section(&mut prompt, output.label, &output.text);
        }

        prompt.push_str(self.instructions);
        prompt
    }
}

fn push_section(prompt: &mut String, label: &str, body: &str) {
    prompt.push('[');
    prompt.push_str(label);
    prompt.push_str("]\n");
    prompt.push_str(body);
    prompt.push_str("\n\n");
}
