//! Provider adapters translating canonical requests into backend-specific HTTP calls.
//!
//! Each adapter performs exactly one outbound request per invocation and classifies every
//! failure into [`ProviderError`] before returning. Retrying is owned by [`crate::retry`].
//! Capabilities are split into two traits so a backend only implements what it can do:
//! the free-text providers implement both, the structured quiz API only produces questions.

mod chat;
mod ollama;
mod prompts;
mod quiz;
pub mod types;

pub use chat::ChatCompletionsProvider;
pub use ollama::OllamaProvider;
pub use quiz::QuizApiProvider;
pub use types::{ProviderError, ProviderKind, QuizParams, RawProviderPayload, SummaryParams};

use crate::config::ProviderSettings;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use types::{classify_status, classify_transport};

/// Backend able to summarize document text.
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    /// Backend family, used to pick the matching normalizer.
    fn kind(&self) -> ProviderKind;

    /// Maximum number of characters of document text this backend transmits per call.
    fn truncate_at(&self) -> usize;

    /// Request a summary of `text`. Text beyond the adapter's budget is dropped silently.
    async fn summarize(
        &self,
        text: &str,
        params: &SummaryParams,
    ) -> Result<RawProviderPayload, ProviderError>;
}

/// Backend able to generate quiz questions from document text.
#[async_trait]
pub trait QuestionProvider: Send + Sync {
    /// Backend family, used to pick the matching normalizer.
    fn kind(&self) -> ProviderKind;

    /// Maximum number of characters of document text this backend transmits per call.
    fn truncate_at(&self) -> usize;

    /// Request quiz questions for `text`. Text beyond the adapter's budget is dropped silently.
    async fn generate_questions(
        &self,
        text: &str,
        params: &QuizParams,
    ) -> Result<RawProviderPayload, ProviderError>;
}

/// Build the summary backend selected by `settings`.
pub fn build_summary_provider(
    settings: &ProviderSettings,
) -> Result<Arc<dyn SummaryProvider>, ProviderError> {
    match settings.kind {
        ProviderKind::OpenAiChat => Ok(Arc::new(ChatCompletionsProvider::new(settings)?)),
        ProviderKind::Ollama => Ok(Arc::new(OllamaProvider::new(settings)?)),
        ProviderKind::QuizApi => Err(ProviderError::Permanent(
            "the quiz provider cannot produce summaries".into(),
        )),
    }
}

/// Build the question backend selected by `settings`.
pub fn build_question_provider(
    settings: &ProviderSettings,
) -> Result<Arc<dyn QuestionProvider>, ProviderError> {
    match settings.kind {
        ProviderKind::OpenAiChat => Ok(Arc::new(ChatCompletionsProvider::new(settings)?)),
        ProviderKind::Ollama => Ok(Arc::new(OllamaProvider::new(settings)?)),
        ProviderKind::QuizApi => Ok(Arc::new(QuizApiProvider::new(settings)?)),
    }
}

/// Return the prefix of `text` holding at most `max_chars` characters.
///
/// Counts Unicode scalar values, so a multi-byte character is never split.
pub fn truncate_input(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Truncate `text` for `provider`, logging when anything was dropped.
pub(crate) fn prepare_input<'a>(provider: ProviderKind, text: &'a str, max_chars: usize) -> &'a str {
    let truncated = truncate_input(text, max_chars);
    if truncated.len() < text.len() {
        tracing::debug!(
            provider = provider.as_str(),
            max_chars,
            original_bytes = text.len(),
            "Truncated input before transmission"
        );
    }
    truncated
}

pub(crate) fn http_client(settings: &ProviderSettings, agent: &str) -> Result<Client, ProviderError> {
    Client::builder()
        .user_agent(agent)
        .timeout(settings.request_timeout)
        .build()
        .map_err(|error| {
            ProviderError::Permanent(format!("failed to construct HTTP client: {error}"))
        })
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Send `request` and turn transport failures and non-2xx statuses into provider errors.
pub(crate) async fn send_checked(
    provider: ProviderKind,
    request: RequestBuilder,
) -> Result<Response, ProviderError> {
    let response = send(provider, request).await?;
    ensure_success(provider, response).await
}

/// Send `request`, classifying transport failures only.
pub(crate) async fn send(
    provider: ProviderKind,
    request: RequestBuilder,
) -> Result<Response, ProviderError> {
    request
        .send()
        .await
        .map_err(|error| classify_transport(provider.as_str(), &error))
}

/// Read a 2xx body and decode it as JSON.
///
/// Failures while reading the body (timeouts, dropped connections) are transport problems
/// and therefore transient; only a body that arrived intact but does not decode is malformed.
pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: ProviderKind,
    response: Response,
) -> Result<T, ProviderError> {
    let body = response.bytes().await.map_err(|error| {
        ProviderError::transient(format!(
            "failed to read response body from {}: {error}",
            provider.as_str()
        ))
    })?;
    serde_json::from_slice(&body).map_err(|error| {
        ProviderError::MalformedResponse(format!(
            "failed to decode {} response: {error}",
            provider.as_str()
        ))
    })
}

/// Pass 2xx responses through; classify anything else.
pub(crate) async fn ensure_success(
    provider: ProviderKind,
    response: Response,
) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let label = provider.as_str();
    let error = classify_status(label, status, response.headers());
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(
        provider = label,
        %status,
        body = %truncate_input(&body, 200),
        "Provider returned an error status"
    );
    Err(error)
}
