//! Parsing of provider payloads into the canonical [`Summary`] and [`QuestionSet`] shapes.
//!
//! Three payload shapes show up across providers:
//!
//! - a direct string (Ollama's `response` field, or a `summary` JSON field);
//! - free text wrapping the payload in a delimited tag pair such as `<summary>…</summary>`;
//! - markdown carrying a fenced JSON document, or a structured JSON body.
//!
//! Everything here is pure and synchronous so it can be tested without a network. A missing
//! required field is always a [`ProviderError::MalformedResponse`]; nothing is padded with
//! empty strings.

use crate::enrichment::{Question, QuestionKind, QuestionSet, Summary};
use crate::providers::{ProviderError, ProviderKind, RawProviderPayload};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Tag pair free-text chat providers are asked to wrap summaries in.
pub const SUMMARY_TAG: &str = "summary";

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```([A-Za-z0-9_-]*)[ \t]*\r?\n?(.*?)```").expect("fenced block pattern")
});

const PROMPT_KEYS: [&str; 3] = ["question", "prompt", "text"];
const KIND_KEYS: [&str; 3] = ["type", "kind", "question_type"];
const CHOICE_KEYS: [&str; 2] = ["choices", "options"];
const ANSWER_KEYS: [&str; 2] = ["answer", "correct_answer"];

/// Return the trimmed contents of the first non-empty `<tag>…</tag>` pair.
///
/// Empty pairs are skipped, so a model echoing the instruction before answering still
/// yields the answer.
pub fn extract_tagged(text: &str, tag: &str) -> Option<String> {
    let pattern = format!(r"(?is)<{0}>(.*?)</{0}>", regex::escape(tag));
    let regex = Regex::new(&pattern).ok()?;
    regex
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|inner| inner.as_str().trim())
        .find(|inner| !inner.is_empty())
        .map(str::to_string)
}

/// Parse the JSON document carried by a fenced code block.
///
/// `json`-tagged fences are tried first, then the remaining fences in order; the first one
/// that parses wins. When no fence is present the whole text, then the outermost `{…}`
/// span, is tried as JSON. Fences that exist but never parse are malformed, with no
/// fallback to the surrounding text.
pub fn extract_fenced_json(text: &str) -> Result<Value, ProviderError> {
    let mut blocks: Vec<(bool, &str)> = FENCED_BLOCK
        .captures_iter(text)
        .filter_map(|captures| {
            let is_json = captures
                .get(1)
                .is_some_and(|lang| lang.as_str().eq_ignore_ascii_case("json"));
            captures.get(2).map(|body| (is_json, body.as_str().trim()))
        })
        .collect();
    if !blocks.is_empty() {
        // Stable sort keeps document order within each group.
        blocks.sort_by_key(|(is_json, _)| !is_json);
        let mut last_error = None;
        for (_, block) in blocks {
            match serde_json::from_str::<Value>(block) {
                Ok(value) => return Ok(value),
                Err(error) => last_error = Some(error),
            }
        }
        return Err(ProviderError::MalformedResponse(match last_error {
            Some(error) => format!("fenced block is not valid JSON: {error}"),
            None => "fenced block is not valid JSON".into(),
        }));
    }

    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() || value.is_array() {
            return Ok(value);
        }
    }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(ProviderError::MalformedResponse(
        "response did not contain a JSON document".into(),
    ))
}

/// Normalize a summary payload according to the shape `kind` is known to produce.
pub fn normalize_summary(
    payload: &RawProviderPayload,
    kind: ProviderKind,
) -> Result<Summary, ProviderError> {
    let body = match (kind, payload) {
        (ProviderKind::OpenAiChat, RawProviderPayload::Text(text)) => {
            extract_tagged(text, SUMMARY_TAG).ok_or_else(|| {
                ProviderError::MalformedResponse(format!(
                    "summary was not wrapped in <{SUMMARY_TAG}> tags"
                ))
            })?
        }
        (_, RawProviderPayload::Text(text)) => text.trim().to_string(),
        (_, RawProviderPayload::Json(value)) => value
            .get("summary")
            .and_then(Value::as_str)
            .map(|summary| summary.trim().to_string())
            .ok_or_else(|| {
                ProviderError::MalformedResponse("response has no `summary` string".into())
            })?,
    };

    if body.is_empty() {
        return Err(ProviderError::MalformedResponse(format!(
            "{} returned an empty summary",
            kind.as_str()
        )));
    }

    Ok(Summary {
        body,
        word_target: None,
    })
}

/// Normalize a question payload into a [`QuestionSet`].
///
/// Items without a recognizable prompt are dropped. An explicitly empty list is a valid,
/// empty set; a non-empty list where every item was dropped is malformed.
pub fn normalize_questions(
    payload: &RawProviderPayload,
    kind: ProviderKind,
) -> Result<QuestionSet, ProviderError> {
    let extracted;
    let document = match payload {
        RawProviderPayload::Text(text) => {
            extracted = extract_fenced_json(text)?;
            &extracted
        }
        RawProviderPayload::Json(value) => value,
    };

    let items = match document {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("questions")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ProviderError::MalformedResponse(format!(
                    "{} response has no `questions` array",
                    kind.as_str()
                ))
            })?,
        _ => {
            return Err(ProviderError::MalformedResponse(format!(
                "{} response is neither an object nor an array",
                kind.as_str()
            )));
        }
    };

    if items.is_empty() {
        return Ok(QuestionSet::default());
    }

    let questions: Vec<Question> = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let parsed = parse_question(item);
            if parsed.is_none() {
                tracing::debug!(
                    provider = kind.as_str(),
                    index,
                    "Dropping question without a usable prompt"
                );
            }
            parsed
        })
        .collect();

    if questions.is_empty() {
        return Err(ProviderError::MalformedResponse(format!(
            "none of the {} questions returned by {} had a usable prompt",
            items.len(),
            kind.as_str()
        )));
    }

    Ok(QuestionSet(questions))
}

fn parse_question(item: &Value) -> Option<Question> {
    let fields = item.as_object()?;
    let prompt = first_field(fields, &PROMPT_KEYS, prompt_text)?;
    let choices = first_field(fields, &CHOICE_KEYS, choice_list);
    let answer = first_field(fields, &ANSWER_KEYS, answer_text);
    let kind = first_field(fields, &KIND_KEYS, |value| {
        value.as_str().and_then(QuestionKind::parse_label)
    })
    .unwrap_or(if choices.is_some() {
        QuestionKind::MultipleChoice
    } else {
        QuestionKind::ShortAnswer
    });

    Some(Question {
        kind,
        prompt,
        answer,
        choices,
    })
}

fn first_field<T>(
    fields: &Map<String, Value>,
    keys: &[&str],
    parse: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find_map(parse)
}

/// Accept a plain string or an array of token fragments joined into one sentence.
fn prompt_text(value: &Value) -> Option<String> {
    let joined = match value {
        Value::String(text) => collapse_whitespace(text),
        Value::Array(fragments) => {
            let parts: Vec<&str> = fragments.iter().filter_map(Value::as_str).collect();
            collapse_whitespace(&parts.join(" "))
        }
        _ => return None,
    };
    (!joined.is_empty()).then_some(joined)
}

fn choice_list(value: &Value) -> Option<Vec<String>> {
    let choices: Vec<String> = value
        .as_array()?
        .iter()
        .filter_map(|choice| match choice {
            Value::String(text) => Some(text.trim().to_string()),
            Value::Object(fields) => fields
                .get("text")
                .and_then(Value::as_str)
                .map(|text| text.trim().to_string()),
            _ => None,
        })
        .filter(|choice| !choice.is_empty())
        .collect();
    (!choices.is_empty()).then_some(choices)
}

fn answer_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
