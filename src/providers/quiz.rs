//! Structured quiz-generation API adapter.
//!
//! The backend accepts the document text together with the requested question mix and
//! answers with question objects, either as a bare array or under a `questions` key.

use super::{
    ProviderError, ProviderKind, QuestionProvider, QuizParams, RawProviderPayload, endpoint,
    http_client, prepare_input, read_json, send_checked,
};
use crate::config::ProviderSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

const API_KEY_HEADER: &str = "x-api-key";

/// Structured question provider.
pub struct QuizApiProvider {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    truncate_at: usize,
}

#[derive(Debug, Serialize)]
struct QuizRequest<'a> {
    text: &'a str,
    question_types: Vec<&'static str>,
    count: u32,
}

impl QuizApiProvider {
    /// Build an adapter from provider settings.
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        if settings.base_url.trim().is_empty() {
            return Err(ProviderError::Permanent(
                "no base URL configured for the quiz provider".into(),
            ));
        }
        Ok(Self {
            http: http_client(settings, "docenrich/quiz")?,
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
            truncate_at: settings.truncate_at,
        })
    }
}

#[async_trait]
impl QuestionProvider for QuizApiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::QuizApi
    }

    fn truncate_at(&self) -> usize {
        self.truncate_at
    }

    async fn generate_questions(
        &self,
        text: &str,
        params: &QuizParams,
    ) -> Result<RawProviderPayload, ProviderError> {
        let body = QuizRequest {
            text: prepare_input(ProviderKind::QuizApi, text, self.truncate_at),
            question_types: params
                .question_types
                .iter()
                .map(|kind| kind.as_str())
                .collect(),
            count: params.count,
        };

        let mut request = self
            .http
            .post(endpoint(&self.base_url, "generate"))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = send_checked(ProviderKind::QuizApi, request).await?;
        let value: Value = read_json(ProviderKind::QuizApi, response).await?;
        Ok(RawProviderPayload::Json(value))
    }
}
