//! Stage templates, one per `<pipeline>.<stage>`.

use crate::PromptTemplate;

macro_rules! call_to_action {
    () => {
        "-> Reply with the number of the direction you chose, for example 'Now write up the inquiry report for direction 2', and the full inquiry report will be written for you."
    };
}

/// Sentence the `inquiry.plan.recommend` stage is told to end with.
pub const PLAN_CALL_TO_ACTION: &str = call_to_action!();

/// Answer to a write-up request when no plan is stored for the session.
pub const MISSING_PLAN_NOTICE: &str = "[Notice] No inquiry plan has been saved yet.\n\
First ask for inquiry directions on your topic in inquiry mode.\n\
\n\
Example:\n\
In inquiry mode,\n  \
first ask \"Design science inquiry directions on microplastics and water pollution\",\n  \
then ask \"Now write up the inquiry report for direction 2 recommended above\".";

// inquiry.plan

pub const INQUIRY_BACKGROUND: PromptTemplate = PromptTemplate {
    persona: None,
    input_label: "Inquiry topic",
    output_label: "Background knowledge",
    instructions: "Summarise the background knowledge needed for the inquiry topic above, \
at a level a high-school student can follow.",
};

pub const INQUIRY_DIRECTIONS: PromptTemplate = PromptTemplate {
    persona: None,
    input_label: "Inquiry topic",
    output_label: "Candidate inquiry directions",
    instructions: "Using the information above, design candidate inquiry projects for a \
high-school performance assessment. For each candidate give:\n\
- the inquiry question or hypothesis\n\
- the method (experiment or survey)\n\
- the difficulty (easy / medium / hard)\n\
\n\
Write 3-5 candidates as a numbered list (1, 2, 3, ...).",
};

pub const INQUIRY_RECOMMEND: PromptTemplate = PromptTemplate {
    persona: Some("You are a teacher supervising high-school inquiry reports."),
    input_label: "Inquiry topic",
    output_label: "Recommended directions",
    instructions: concat!(
        "Based on the material above:\n\
1. Recommend the 1-2 most suitable inquiry directions.\n\
2. For each, use only this format:\n\
\n\
- Direction number (e.g. candidate 2)\n\
- Inquiry title\n\
- Purpose of the inquiry\n\
- Inquiry question / hypothesis\n\
- Brief outline of the method\n\
\n\
Do not write the report body yet. Only settle which direction to investigate.\n\
\n\
End with exactly this sentence on its own line:\n\
\n\
\"",
        call_to_action!(),
        "\""
    ),
};

// inquiry.report

pub const INQUIRY_OUTLINE: PromptTemplate = PromptTemplate {
    persona: Some("You help high-school students write inquiry reports."),
    input_label: "Student's follow-up request",
    output_label: "Report outline",
    instructions: "1. Infer which recommended direction (by number) the student chose.\n\
2. For that direction, first produce an outline of the inquiry report: sections with \
a short summary of each.\n\
\n\
Example outline:\n\
1. Introduction (problem statement, motivation)\n\
2. Theoretical background\n\
3. Method\n\
4. Results\n\
5. Conclusion and reflections\n\
\n\
Under each section, describe in 2-3 sentences what it will contain. \
Do not write full paragraphs yet.",
};

pub const INQUIRY_REPORT: PromptTemplate = PromptTemplate {
    persona: None,
    input_label: "Student's follow-up request",
    output_label: "Inquiry report draft",
    instructions: "Using the outline above, write a draft of the high-school science \
inquiry report.\n\
Requirements:\n\
- the tone of a report a high-school student submits for assessment\n\
- sections in order: introduction, theoretical background, method, results \
(expected results are fine), conclusion and reflections\n\
- at least 2-3 paragraphs per section\n\
- avoid piling up jargon; add a short explanation in brackets where needed\n\
\n\
Make the whole thing read as one continuous report.",
};

// essay

pub const ESSAY_FACTS: PromptTemplate = PromptTemplate {
    persona: None,
    input_label: "Essay topic",
    output_label: "Reference material",
    instructions: "Briefly collect factual material, statistics and real cases related \
to the persuasive-essay topic above.",
};

pub const ESSAY_DRAFT: PromptTemplate = PromptTemplate {
    persona: Some("You are a teacher helping high-school students with persuasive essays."),
    input_label: "Essay topic",
    output_label: "Essay draft",
    instructions: "Requirements:\n\
- introduction / body (2-3 arguments) / conclusion\n\
- formal written register\n\
- length: roughly 500-800 words\n\
\n\
Write a draft of the persuasive essay that meets these requirements.",
};

pub const ESSAY_LOGIC_CHECK: PromptTemplate = PromptTemplate {
    persona: None,
    input_label: "Essay topic",
    output_label: "Logic-checked essay",
    instructions: "The essay draft above will be submitted by a high-school student.\n\
Your job:\n\
1. Check that the argument flows naturally; point out and fix awkward or contradictory passages.\n\
2. Soften overstated claims and anything that may not be factually accurate.\n\
3. Keep the introduction-body-conclusion structure and only tidy the flow of sentences.\n\
\n\
Show only the revised essay.",
};

pub const ESSAY_POLISH: PromptTemplate = PromptTemplate {
    persona: None,
    input_label: "Essay topic",
    output_label: "Polished essay",
    instructions: "The last essay above has already been checked for logic. Please:\n\
- make its sentences more natural and fluent\n\
- smooth the transitions between paragraphs\n\
- keep the tone of a courteous persuasive essay at high-school level\n\
\n\
Show only the final revision.",
};

// ideas

pub const IDEAS_BRAINSTORM: PromptTemplate = PromptTemplate {
    persona: Some("You are a brainstorming assistant for high-school students."),
    input_label: "Student's request",
    output_label: "Brainstormed ideas",
    instructions: "Based on the request above, list at least 20 clearly different ideas \
as bullet points. Write each idea as a one-line summary.",
};

pub const IDEAS_CURATE: PromptTemplate = PromptTemplate {
    persona: Some("You are an expert at picking ideas that are creative yet realistic."),
    input_label: "Student's request",
    output_label: "Curated ideas",
    instructions: "From the ideas above, pick only 10, favouring ones that are\n\
- highly feasible\n\
- educationally meaningful\n\
- reasonably creative\n\
\n\
For each chosen idea give:\n\
- idea title\n\
- feasibility: high / medium / low\n\
- description: 1-2 sentences\n\
- extensions: 1-2 bullets",
};

pub const IDEAS_TIDY: PromptTemplate = PromptTemplate {
    persona: None,
    input_label: "Student's request",
    output_label: "Final idea list",
    instructions: "The curated list above is meant for high-school students. Please:\n\
- make the sentences a little more natural\n\
- tidy the numbering and layout so it is easy to read\n\
Do not change the substance, only the wording.",
};

// research

pub const RESEARCH_GATHER: PromptTemplate = PromptTemplate {
    persona: None,
    input_label: "Research topic",
    output_label: "Web research",
    instructions: "Research the topic above on the web and summarise the core content \
and the key points. Include brief sources where useful.",
};

pub const RESEARCH_RESTRUCTURE: PromptTemplate = PromptTemplate {
    persona: None,
    input_label: "Research topic",
    output_label: "Structured summary",
    instructions: "Reorganise the research above so a high-school student can follow it easily:\n\
- 3-5 headings\n\
- 2-4 bullets under each heading\n\
\n\
Add a short explanation next to any difficult technical term.",
};
