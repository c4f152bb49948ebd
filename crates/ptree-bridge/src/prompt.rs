//! Final prompt text sent to completion backends.

use crate::context::ContextSnapshot;

const PREAMBLE: &str = "You are an expert product management assistant specializing in product \
tree analysis. You help teams understand their product hierarchy (products, goals, jobs and \
work items), identify issues and suggest improvements.";

const FOCUSED_GUIDANCE: &str = "Provide specific, actionable analysis of the selected item: its \
progress, the progress of its children, dependencies on related items, risks and concrete \
recommendations. Reference the items listed above.";

const OVERVIEW_GUIDANCE: &str = "Provide data-driven insights about the tree as a whole: \
patterns, gaps and concrete next steps. Keep the answer under 200 words unless more detail \
is requested.";

/// Compose the prompt for `question`, embedding `context` when present.
#[must_use]
pub fn build_prompt(question: &str, context: Option<&ContextSnapshot>) -> String {
    let question = question.trim();
    let Some(context) = context else {
        return format!("{PREAMBLE}\n\nUSER QUESTION: {question}");
    };
    let guidance = if context.focus.is_some() {
        FOCUSED_GUIDANCE
    } else {
        OVERVIEW_GUIDANCE
    };
    format!(
        "{PREAMBLE}\n\n{}\n\nUSER QUESTION: {question}\n\n{guidance}",
        context.text
    )
}
