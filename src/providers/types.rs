//! Shared types used by the provider adapters, retry layer, and normalizer.

use crate::enrichment::{ErrorKind, ErrorMarker, QuestionKind};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Classified failures produced at the adapter boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Retrying may succeed (rate limit, temporary outage, connection failure).
    #[error("provider temporarily unavailable: {reason}")]
    Transient {
        /// Short explanation of the transient condition.
        reason: String,
        /// Server-suggested wait before retrying, when provided.
        retry_after: Option<Duration>,
    },
    /// Retrying will not change the outcome.
    #[error("provider rejected the request: {0}")]
    Permanent(String),
    /// Provider returned 2xx but the content did not match the expected schema.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
    /// Transient failures persisted through every attempt the retry policy allowed.
    #[error("gave up after {attempts} attempts: {last_reason}")]
    RetriesExhausted {
        /// Number of attempts performed.
        attempts: u32,
        /// Reason reported by the final attempt.
        last_reason: String,
    },
    /// The overall deadline elapsed or the caller cancelled the request.
    #[error("timed out: {0}")]
    Timeout(String),
}

impl ProviderError {
    /// Build a transient error without a retry hint.
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient {
            reason: reason.into(),
            retry_after: None,
        }
    }

    /// Whether the retry policy should attempt the operation again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Category used when the error is folded into an [`ErrorMarker`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transient { .. } => ErrorKind::Transient,
            Self::Permanent(_) => ErrorKind::Permanent,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
            Self::Timeout(_) => ErrorKind::Timeout,
        }
    }

    /// Convert into a user-facing marker.
    pub fn to_marker(&self) -> ErrorMarker {
        ErrorMarker::new(self.kind(), self.to_string())
    }
}

impl From<ProviderError> for ErrorMarker {
    fn from(error: ProviderError) -> Self {
        error.to_marker()
    }
}

/// Supported provider backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions endpoint returning free text.
    OpenAiChat,
    /// Local Ollama runtime returning free text through `/api/generate`.
    Ollama,
    /// Structured quiz-generation API returning question objects.
    QuizApi,
}

impl ProviderKind {
    /// Stable label used in logs and configuration.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAiChat => "openai",
            Self::Ollama => "ollama",
            Self::QuizApi => "quiz",
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "openai-chat" | "chat" => Ok(Self::OpenAiChat),
            "ollama" => Ok(Self::Ollama),
            "quiz" | "quiz-api" | "quizapi" => Ok(Self::QuizApi),
            _ => Err(()),
        }
    }
}

/// Provider response before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawProviderPayload {
    /// Free text (plain prose, tagged text, or markdown with a fenced JSON block).
    Text(String),
    /// Structured JSON body.
    Json(Value),
}

/// Parameters forwarded to summary providers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryParams {
    /// Approximate word budget for the summary.
    pub word_target: Option<u32>,
}

/// Quiz configuration forwarded to question providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizParams {
    /// Question formats to request, in order of preference.
    pub question_types: Vec<QuestionKind>,
    /// Number of questions to request.
    pub count: u32,
}

impl Default for QuizParams {
    fn default() -> Self {
        Self {
            question_types: vec![QuestionKind::ShortAnswer, QuestionKind::MultipleChoice],
            count: 5,
        }
    }
}

/// Map a non-success HTTP status onto the provider error taxonomy.
pub(crate) fn classify_status(
    provider: &str,
    status: StatusCode,
    headers: &HeaderMap,
) -> ProviderError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return ProviderError::Transient {
            reason: format!("{provider} rate limited the request"),
            retry_after: parse_retry_after(headers),
        };
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return ProviderError::Permanent(format!("{provider} rejected the credentials ({status})"));
    }
    if status.is_server_error() {
        return ProviderError::transient(format!("{provider} returned {status}"));
    }
    ProviderError::Permanent(format!("{provider} returned {status}"))
}

/// Map a transport-level failure onto the provider error taxonomy.
pub(crate) fn classify_transport(provider: &str, error: &reqwest::Error) -> ProviderError {
    if error.is_timeout() || error.is_connect() {
        ProviderError::transient(format!("failed to reach {provider}: {error}"))
    } else {
        ProviderError::Permanent(format!("request to {provider} failed: {error}"))
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn rate_limit_maps_to_transient_with_hint() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        let error = classify_status("openai", StatusCode::TOO_MANY_REQUESTS, &headers);
        assert_eq!(
            error,
            ProviderError::Transient {
                reason: "openai rate limited the request".into(),
                retry_after: Some(Duration::from_secs(7)),
            }
        );
    }

    #[test]
    fn client_errors_are_permanent_and_server_errors_transient() {
        let headers = HeaderMap::new();
        assert!(matches!(
            classify_status("quiz", StatusCode::UNAUTHORIZED, &headers),
            ProviderError::Permanent(message) if message.contains("credentials")
        ));
        assert!(matches!(
            classify_status("quiz", StatusCode::BAD_REQUEST, &headers),
            ProviderError::Permanent(_)
        ));
        assert!(classify_status("quiz", StatusCode::SERVICE_UNAVAILABLE, &headers).is_transient());
    }

    #[test]
    fn provider_kind_parses_aliases() {
        assert_eq!("OpenAI".parse::<ProviderKind>(), Ok(ProviderKind::OpenAiChat));
        assert_eq!("quiz-api".parse::<ProviderKind>(), Ok(ProviderKind::QuizApi));
        assert_eq!("ollama".parse::<ProviderKind>(), Ok(ProviderKind::Ollama));
        assert!("cohere".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn errors_fold_into_markers() {
        let marker: ErrorMarker = ProviderError::RetriesExhausted {
            attempts: 3,
            last_reason: "rate limited".into(),
        }
        .into();
        assert_eq!(marker.kind, ErrorKind::RetriesExhausted);
        assert!(marker.reason.contains("3 attempts"));
    }
}
