//! Canonical, provider-agnostic data model for enrichment results.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while validating an incoming enrichment request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Text was empty or contained only whitespace.
    #[error("document text must not be empty")]
    EmptyText,
    /// Caller asked for a zero-length input budget.
    #[error("max input length must be greater than zero")]
    ZeroInputLength,
}

/// Immutable input to a single enrichment run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentRequest {
    text: String,
    max_input_length: usize,
}

impl EnrichmentRequest {
    /// Validate and build a request. Text must contain at least one non-whitespace character.
    pub fn new(text: impl Into<String>, max_input_length: usize) -> Result<Self, RequestError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(RequestError::EmptyText);
        }
        if max_input_length == 0 {
            return Err(RequestError::ZeroInputLength);
        }
        Ok(Self {
            text,
            max_input_length,
        })
    }

    /// Extracted plain text to enrich.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Upper bound, in characters, on what any provider may receive for this request.
    pub fn max_input_length(&self) -> usize {
        self.max_input_length
    }
}

/// Normalized summary of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Summary prose; never empty on success.
    pub body: String,
    /// Word budget the summary was requested with, when one was configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_target: Option<u32>,
}

/// Question formats understood by the canonical schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    /// Free-form answer.
    ShortAnswer,
    /// Pick one of several choices.
    MultipleChoice,
}

impl QuestionKind {
    /// Wire label used in prompts and provider payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ShortAnswer => "short-answer",
            Self::MultipleChoice => "multiple-choice",
        }
    }

    /// Parse the many spellings providers use for question types.
    pub fn parse_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "short-answer" | "short" | "shortanswer" | "open" | "open-ended" => {
                Some(Self::ShortAnswer)
            }
            "multiple-choice" | "multiplechoice" | "mcq" | "multiple" | "choice" => {
                Some(Self::MultipleChoice)
            }
            _ => None,
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QuestionKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_label(s).ok_or(())
    }
}

/// A single quiz question in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Question format.
    pub kind: QuestionKind,
    /// Question text shown to the learner.
    pub prompt: String,
    /// Expected answer, when the provider supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Ordered answer choices for multiple-choice questions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}

/// Ordered questions produced for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionSet(pub Vec<Question>);

impl QuestionSet {
    /// Number of questions in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the provider returned zero questions.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the questions in provider order.
    pub fn iter(&self) -> std::slice::Iter<'_, Question> {
        self.0.iter()
    }
}

/// Classification carried by an [`ErrorMarker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rate limited or temporarily unavailable on the only attempt made.
    Transient,
    /// Rejected outright (credentials, bad request, unsupported configuration).
    Permanent,
    /// Provider answered successfully but the content could not be normalized.
    MalformedResponse,
    /// Transient failures persisted across every allowed attempt.
    RetriesExhausted,
    /// The overall deadline elapsed or the caller cancelled the request.
    Timeout,
    /// The request itself was unusable.
    InvalidRequest,
}

/// Structured failure recorded in place of a path result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMarker {
    /// Failure category.
    pub kind: ErrorKind,
    /// Human-readable reason suitable for end users.
    pub reason: String,
}

impl ErrorMarker {
    /// Build a marker from a kind and reason.
    pub fn new(kind: ErrorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

/// Outcome of one enrichment path: either the normalized value or an error marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum PathOutcome<T> {
    /// The path completed and produced a canonical value.
    Ready(T),
    /// The path failed; the marker explains why.
    Failed(ErrorMarker),
}

impl<T> PathOutcome<T> {
    /// Borrow the value when the path succeeded.
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Failed(_) => None,
        }
    }

    /// Borrow the marker when the path failed.
    pub fn error(&self) -> Option<&ErrorMarker> {
        match self {
            Self::Ready(_) => None,
            Self::Failed(marker) => Some(marker),
        }
    }

    /// Whether the path succeeded.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Final result of an enrichment run, owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    /// Summary path outcome.
    pub summary: PathOutcome<Summary>,
    /// Question path outcome.
    pub questions: PathOutcome<QuestionSet>,
}

impl EnrichmentResult {
    /// Result with both paths failed for the same reason.
    pub fn failed(marker: ErrorMarker) -> Self {
        Self {
            summary: PathOutcome::Failed(marker.clone()),
            questions: PathOutcome::Failed(marker),
        }
    }

    /// Whether both paths produced values.
    pub fn is_complete(&self) -> bool {
        self.summary.is_ready() && self.questions.is_ready()
    }
}
