//! Prompt templates for the free-text providers.

use super::{QuizParams, SummaryParams};
use crate::normalize::SUMMARY_TAG;

/// System message shared by chat-style providers.
pub(crate) const SYSTEM_PROMPT: &str = "You help students study. You read course documents and write faithful summaries and quiz questions. Never add facts that are not in the document.";

/// Summary prompt asking for the answer inside `<summary>` tags.
pub(crate) fn tagged_summary_prompt(text: &str, params: &SummaryParams) -> String {
    format!(
        "Summarize the document below{length}. Wrap the summary in <{SUMMARY_TAG}></{SUMMARY_TAG}> tags and write nothing outside them.\n\nDocument:\n{text}",
        length = length_hint(params),
    )
}

/// Summary prompt asking for plain prose only.
pub(crate) fn plain_summary_prompt(text: &str, params: &SummaryParams) -> String {
    format!(
        "Summarize the document below{length}. Reply with the summary only, no preamble.\n\nDocument:\n{text}",
        length = length_hint(params),
    )
}

/// Question prompt asking for a fenced JSON block in the canonical item format.
pub(crate) fn question_prompt(text: &str, params: &QuizParams) -> String {
    let types = params
        .question_types
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Write {count} quiz questions about the document below using these question types: {types}.\n\
         Respond with a single ```json fenced block shaped like\n\
         {{\"questions\": [{{\"type\": \"short-answer\", \"question\": \"...\", \"answer\": \"...\"}}, \
         {{\"type\": \"multiple-choice\", \"question\": \"...\", \"choices\": [\"...\"], \"answer\": \"...\"}}]}}\n\n\
         Document:\n{text}",
        count = params.count,
    )
}

fn length_hint(params: &SummaryParams) -> String {
    params
        .word_target
        .map(|words| format!(" in about {words} words"))
        .unwrap_or_default()
}
