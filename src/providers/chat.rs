//! OpenAI-compatible chat completions adapter.

use super::prompts::{SYSTEM_PROMPT, question_prompt, tagged_summary_prompt};
use super::{
    ProviderError, ProviderKind, QuestionProvider, QuizParams, RawProviderPayload,
    SummaryParams, SummaryProvider, endpoint, http_client, prepare_input, read_json,
    send_checked,
};
use crate::config::ProviderSettings;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Free-text provider speaking the `/chat/completions` protocol.
pub struct ChatCompletionsProvider {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    truncate_at: usize,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl ChatCompletionsProvider {
    /// Build an adapter from provider settings.
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(settings, "docenrich/chat")?,
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            truncate_at: settings.truncate_at,
        })
    }

    async fn complete(&self, prompt: String) -> Result<RawProviderPayload, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ProviderError::Permanent("no API key configured for the chat provider".into())
        })?;

        let payload = json!({
            "model": self.model,
            "temperature": 0.2,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        });

        let request = self
            .http
            .post(endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(api_key)
            .json(&payload);
        let response = send_checked(ProviderKind::OpenAiChat, request).await?;

        let body: ChatResponse = read_json(ProviderKind::OpenAiChat, response).await?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(RawProviderPayload::Text)
            .ok_or_else(|| {
                ProviderError::MalformedResponse("chat completion contained no message".into())
            })
    }
}

#[async_trait]
impl SummaryProvider for ChatCompletionsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAiChat
    }

    fn truncate_at(&self) -> usize {
        self.truncate_at
    }

    async fn summarize(
        &self,
        text: &str,
        params: &SummaryParams,
    ) -> Result<RawProviderPayload, ProviderError> {
        let input = prepare_input(ProviderKind::OpenAiChat, text, self.truncate_at);
        self.complete(tagged_summary_prompt(input, params)).await
    }
}

#[async_trait]
impl QuestionProvider for ChatCompletionsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAiChat
    }

    fn truncate_at(&self) -> usize {
        self.truncate_at
    }

    async fn generate_questions(
        &self,
        text: &str,
        params: &QuizParams,
    ) -> Result<RawProviderPayload, ProviderError> {
        let input = prepare_input(ProviderKind::OpenAiChat, text, self.truncate_at);
        self.complete(question_prompt(input, params)).await
    }
}
