//! Ollama-backed free-text adapter.
//!
//! Issues non-streaming requests directly to `/api/generate`. Summaries come back as the
//! plain `response` string; question prompts ask the model for a fenced JSON block.

use super::prompts::{SYSTEM_PROMPT, plain_summary_prompt, question_prompt};
use super::{
    ProviderError, ProviderKind, QuestionProvider, QuizParams, RawProviderPayload,
    SummaryParams, SummaryProvider, endpoint, ensure_success, http_client, prepare_input,
    read_json, send,
};
use crate::config::ProviderSettings;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

/// Free-text provider backed by a local Ollama runtime.
pub struct OllamaProvider {
    http: Client,
    base_url: String,
    model: String,
    truncate_at: usize,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

impl OllamaProvider {
    /// Build an adapter from provider settings.
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(settings, "docenrich/ollama")?,
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            truncate_at: settings.truncate_at,
        })
    }

    async fn generate(&self, prompt: String) -> Result<RawProviderPayload, ProviderError> {
        let payload = json!({
            "model": self.model,
            "system": SYSTEM_PROMPT,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": 0.1,
            }
        });

        let request = self
            .http
            .post(endpoint(&self.base_url, "api/generate"))
            .json(&payload);
        let response = send(ProviderKind::Ollama, request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProviderError::Permanent(format!(
                "model '{}' is not available on {}",
                self.model, self.base_url
            )));
        }
        let response = ensure_success(ProviderKind::Ollama, response).await?;

        let body: OllamaResponse = read_json(ProviderKind::Ollama, response).await?;

        if !body.done {
            return Err(ProviderError::MalformedResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(RawProviderPayload::Text(body.response))
    }
}

#[async_trait]
impl SummaryProvider for OllamaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn truncate_at(&self) -> usize {
        self.truncate_at
    }

    async fn summarize(
        &self,
        text: &str,
        params: &SummaryParams,
    ) -> Result<RawProviderPayload, ProviderError> {
        let input = prepare_input(ProviderKind::Ollama, text, self.truncate_at);
        self.generate(plain_summary_prompt(input, params)).await
    }
}

#[async_trait]
impl QuestionProvider for OllamaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn truncate_at(&self) -> usize {
        self.truncate_at
    }

    async fn generate_questions(
        &self,
        text: &str,
        params: &QuizParams,
    ) -> Result<RawProviderPayload, ProviderError> {
        let input = prepare_input(ProviderKind::Ollama, text, self.truncate_at);
        self.generate(question_prompt(input, params)).await
    }
}
