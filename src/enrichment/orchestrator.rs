//! Enrichment orchestrator: runs the summary and question paths side by side.
//!
//! Each path is `adapter call -> retry -> normalize`, in that order. The two paths share
//! nothing but the cancellation scope, so a failure on one never prevents the other from
//! reporting. Every failure is folded into an [`ErrorMarker`]; `enrich` itself never fails.

use super::types::{
    EnrichmentRequest, EnrichmentResult, ErrorKind, ErrorMarker, PathOutcome, QuestionSet, Summary,
};
use crate::config::EnrichmentConfig;
use crate::normalize::{normalize_questions, normalize_summary};
use crate::providers::{
    ProviderError, QuestionProvider, SummaryProvider, build_question_provider,
    build_summary_provider, truncate_input,
};
use crate::retry::with_retry;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Runs enrichment requests against a fixed pair of provider backends.
pub struct Enricher {
    summary: Result<Arc<dyn SummaryProvider>, ProviderError>,
    questions: Result<Arc<dyn QuestionProvider>, ProviderError>,
    config: EnrichmentConfig,
}

impl Enricher {
    /// Build an enricher around explicit provider instances.
    pub fn new(
        summary: Arc<dyn SummaryProvider>,
        questions: Arc<dyn QuestionProvider>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            summary: Ok(summary),
            questions: Ok(questions),
            config,
        }
    }

    /// Build the providers selected by `config`.
    ///
    /// A provider that cannot be constructed is remembered, and every request reports it as
    /// a failed path instead of aborting.
    pub fn from_config(config: &EnrichmentConfig) -> Self {
        let summary = build_summary_provider(&config.summary);
        if let Err(error) = &summary {
            tracing::warn!(
                provider = config.summary.kind.as_str(),
                error = %error,
                "Summary provider unavailable"
            );
        }
        let questions = build_question_provider(&config.questions);
        if let Err(error) = &questions {
            tracing::warn!(
                provider = config.questions.kind.as_str(),
                error = %error,
                "Question provider unavailable"
            );
        }
        Self {
            summary,
            questions,
            config: config.clone(),
        }
    }

    /// Configuration this enricher was built with.
    pub fn config(&self) -> &EnrichmentConfig {
        &self.config
    }

    /// Enrich `text` using the configured default input budget.
    pub async fn enrich_text(&self, text: &str) -> EnrichmentResult {
        match EnrichmentRequest::new(text, self.config.default_max_input_length) {
            Ok(request) => self.enrich(&request).await,
            Err(error) => EnrichmentResult::failed(ErrorMarker::new(
                ErrorKind::InvalidRequest,
                error.to_string(),
            )),
        }
    }

    /// Enrich a request, bounded by the configured overall timeout.
    pub async fn enrich(&self, request: &EnrichmentRequest) -> EnrichmentResult {
        self.enrich_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Enrich a request, abandoning in-flight work when `cancel` fires or the deadline passes.
    pub async fn enrich_with_cancel(
        &self,
        request: &EnrichmentRequest,
        cancel: CancellationToken,
    ) -> EnrichmentResult {
        let started = Instant::now();
        // A timeout too large to represent as an instant means no deadline at all.
        let deadline = started.checked_add(self.config.overall_timeout);
        let scope = cancel.child_token();
        let text = truncate_input(request.text(), request.max_input_length());

        let (summary, questions) = tokio::join!(
            self.bounded(&cancel, &scope, deadline, self.summary_path(text, &scope)),
            self.bounded(&cancel, &scope, deadline, self.question_path(text, &scope)),
        );

        let result = EnrichmentResult {
            summary: into_outcome("summary", summary),
            questions: into_outcome("questions", questions),
        };
        tracing::info!(
            summary_ready = result.summary.is_ready(),
            questions_ready = result.questions.is_ready(),
            question_count = result.questions.ready().map(QuestionSet::len),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Enrichment finished"
        );
        result
    }

    async fn summary_path(
        &self,
        text: &str,
        scope: &CancellationToken,
    ) -> Result<Summary, ProviderError> {
        let provider = self.summary.as_ref().map_err(Clone::clone)?;
        let params = &self.config.summary_params;
        tracing::debug!(
            provider = provider.kind().as_str(),
            truncate_at = provider.truncate_at(),
            input_chars = text.chars().count(),
            "Starting summary path"
        );
        let payload = with_retry(&self.config.retry, scope, move || {
            provider.summarize(text, params)
        })
        .await?;
        let mut summary = normalize_summary(&payload, provider.kind())?;
        summary.word_target = params.word_target;
        Ok(summary)
    }

    async fn question_path(
        &self,
        text: &str,
        scope: &CancellationToken,
    ) -> Result<QuestionSet, ProviderError> {
        let provider = self.questions.as_ref().map_err(Clone::clone)?;
        let params = &self.config.quiz;
        tracing::debug!(
            provider = provider.kind().as_str(),
            truncate_at = provider.truncate_at(),
            input_chars = text.chars().count(),
            "Starting question path"
        );
        let payload = with_retry(&self.config.retry, scope, move || {
            provider.generate_questions(text, params)
        })
        .await?;
        normalize_questions(&payload, provider.kind())
    }

    /// Race a path against the caller's token and the shared deadline.
    ///
    /// Hitting the deadline cancels `scope`, so the sibling path and any retry wait stop too.
    async fn bounded<T>(
        &self,
        caller: &CancellationToken,
        scope: &CancellationToken,
        deadline: Option<Instant>,
        path: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        let timeout = self.config.overall_timeout;
        let expired = async {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            result = path => result,
            () = scope.cancelled() => Err(if caller.is_cancelled() {
                ProviderError::Timeout("request cancelled by the caller".into())
            } else {
                deadline_error(timeout)
            }),
            () = expired => {
                scope.cancel();
                Err(deadline_error(timeout))
            }
        }
    }
}

/// Enrich `request` with providers built from `config`.
pub async fn enrich(request: &EnrichmentRequest, config: &EnrichmentConfig) -> EnrichmentResult {
    Enricher::from_config(config).enrich(request).await
}

fn deadline_error(timeout: std::time::Duration) -> ProviderError {
    ProviderError::Timeout(format!(
        "no result within {} ms",
        timeout.as_millis()
    ))
}

fn into_outcome<T>(path: &'static str, result: Result<T, ProviderError>) -> PathOutcome<T> {
    match result {
        Ok(value) => PathOutcome::Ready(value),
        Err(error) => {
            tracing::warn!(path, kind = ?error.kind(), error = %error, "Enrichment path failed");
            PathOutcome::Failed(error.to_marker())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderSettings;
    use crate::enrichment::QuestionKind;
    use crate::providers::{ProviderKind, QuizParams, RawProviderPayload, SummaryParams};
    use crate::retry::RetryPolicy;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    type Scripted = Result<RawProviderPayload, ProviderError>;

    /// Fake backend replaying a script; the last entry repeats once the script runs out.
    struct ScriptedProvider {
        kind: ProviderKind,
        script: Vec<Scripted>,
        delay: Duration,
        calls: AtomicU32,
        inputs: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(kind: ProviderKind, script: Vec<Scripted>) -> Arc<Self> {
            Self::slow(kind, script, Duration::ZERO)
        }

        fn slow(kind: ProviderKind, script: Vec<Scripted>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                kind,
                script,
                delay,
                calls: AtomicU32::new(0),
                inputs: Mutex::new(Vec::new()),
            })
        }

        async fn next(&self, text: &str) -> Scripted {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            self.inputs.lock().expect("inputs").push(text.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.script[call.min(self.script.len() - 1)].clone()
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SummaryProvider for ScriptedProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn truncate_at(&self) -> usize {
            usize::MAX
        }

        async fn summarize(&self, text: &str, _params: &SummaryParams) -> Scripted {
            self.next(text).await
        }
    }

    #[async_trait]
    impl QuestionProvider for ScriptedProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn truncate_at(&self) -> usize {
            usize::MAX
        }

        async fn generate_questions(&self, text: &str, _params: &QuizParams) -> Scripted {
            self.next(text).await
        }
    }

    fn test_config() -> EnrichmentConfig {
        EnrichmentConfig {
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
            },
            overall_timeout: Duration::from_secs(5),
            ..EnrichmentConfig::default()
        }
    }

    fn tagged_summary() -> Scripted {
        Ok(RawProviderPayload::Text("<summary>A short summary.</summary>".into()))
    }

    fn quiz_questions() -> Scripted {
        Ok(RawProviderPayload::Json(json!({
            "questions": [
                { "type": "short-answer", "question": "Q1", "answer": "A1" },
                { "type": "multiple-choice", "question": "Q2", "options": ["x", "y"], "answer": "x" }
            ]
        })))
    }

    fn request(text: &str) -> EnrichmentRequest {
        EnrichmentRequest::new(text, 10_000).expect("request")
    }

    #[tokio::test]
    async fn both_paths_succeed() {
        let summary = ScriptedProvider::new(ProviderKind::OpenAiChat, vec![tagged_summary()]);
        let questions = ScriptedProvider::new(ProviderKind::QuizApi, vec![quiz_questions()]);
        let config = EnrichmentConfig {
            summary_params: SummaryParams {
                word_target: Some(150),
            },
            ..test_config()
        };
        let enricher = Enricher::new(summary, questions, config);

        let result = enricher.enrich(&request("Document")).await;

        assert!(result.is_complete());
        let summary = result.summary.ready().expect("summary");
        assert_eq!(summary.body, "A short summary.");
        assert_eq!(summary.word_target, Some(150));
        let questions = result.questions.ready().expect("questions");
        assert_eq!(questions.len(), 2);
        assert_eq!(questions.0[1].kind, QuestionKind::MultipleChoice);
    }

    #[tokio::test]
    async fn summary_failure_does_not_affect_questions() {
        let summary = ScriptedProvider::new(
            ProviderKind::OpenAiChat,
            vec![Err(ProviderError::Permanent("bad credentials".into()))],
        );
        let questions = ScriptedProvider::new(ProviderKind::QuizApi, vec![quiz_questions()]);
        let enricher = Enricher::new(summary.clone(), questions, test_config());

        let result = enricher.enrich(&request("Document")).await;

        let marker = result.summary.error().expect("summary failed");
        assert_eq!(marker.kind, ErrorKind::Permanent);
        assert!(marker.reason.contains("bad credentials"));
        assert_eq!(result.questions.ready().map(QuestionSet::len), Some(2));
        assert_eq!(summary.calls(), 1);
    }

    #[tokio::test]
    async fn malformed_questions_become_a_marker() {
        let summary = ScriptedProvider::new(ProviderKind::OpenAiChat, vec![tagged_summary()]);
        let questions = ScriptedProvider::new(
            ProviderKind::OpenAiChat,
            vec![Ok(RawProviderPayload::Text("```json\n{oops\n```".into()))],
        );
        let enricher = Enricher::new(summary, questions.clone(), test_config());

        let result = enricher.enrich(&request("Document")).await;

        assert!(result.summary.is_ready());
        assert_eq!(
            result.questions.error().map(|marker| marker.kind),
            Some(ErrorKind::MalformedResponse)
        );
        assert_eq!(questions.calls(), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let summary = ScriptedProvider::new(
            ProviderKind::OpenAiChat,
            vec![
                Err(ProviderError::transient("rate limited")),
                tagged_summary(),
            ],
        );
        let questions = ScriptedProvider::new(ProviderKind::QuizApi, vec![quiz_questions()]);
        let enricher = Enricher::new(summary.clone(), questions, test_config());

        let result = enricher.enrich(&request("Document")).await;

        assert!(result.is_complete());
        assert_eq!(summary.calls(), 2);
    }

    #[tokio::test]
    async fn exhausted_retries_are_reported_distinctly() {
        let summary = ScriptedProvider::new(ProviderKind::OpenAiChat, vec![tagged_summary()]);
        let questions = ScriptedProvider::new(
            ProviderKind::QuizApi,
            vec![Err(ProviderError::transient("rate limited"))],
        );
        let enricher = Enricher::new(summary, questions.clone(), test_config());

        let result = enricher.enrich(&request("Document")).await;

        assert_eq!(
            result.questions.error().map(|marker| marker.kind),
            Some(ErrorKind::RetriesExhausted)
        );
        assert_eq!(questions.calls(), 3);
    }

    #[tokio::test]
    async fn identical_requests_produce_identical_results() {
        let summary = ScriptedProvider::new(ProviderKind::OpenAiChat, vec![tagged_summary()]);
        let questions = ScriptedProvider::new(ProviderKind::QuizApi, vec![quiz_questions()]);
        let enricher = Enricher::new(summary, questions, test_config());

        let first = enricher.enrich(&request("Same text")).await;
        let second = enricher.enrich(&request("Same text")).await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn request_budget_caps_what_providers_receive() {
        let summary = ScriptedProvider::new(ProviderKind::OpenAiChat, vec![tagged_summary()]);
        let questions = ScriptedProvider::new(ProviderKind::QuizApi, vec![quiz_questions()]);
        let enricher = Enricher::new(summary.clone(), questions.clone(), test_config());

        let request = EnrichmentRequest::new("abcdefghij", 4).expect("request");
        enricher.enrich(&request).await;

        assert_eq!(*summary.inputs.lock().expect("inputs"), vec!["abcd".to_string()]);
        assert_eq!(*questions.inputs.lock().expect("inputs"), vec!["abcd".to_string()]);
    }

    #[tokio::test]
    async fn slow_path_times_out_without_blocking_the_other() {
        let summary = ScriptedProvider::new(ProviderKind::OpenAiChat, vec![tagged_summary()]);
        let questions = ScriptedProvider::slow(
            ProviderKind::QuizApi,
            vec![quiz_questions()],
            Duration::from_secs(30),
        );
        let config = EnrichmentConfig {
            overall_timeout: Duration::from_millis(100),
            ..test_config()
        };
        let enricher = Enricher::new(summary, questions, config);

        let started = std::time::Instant::now();
        let result = enricher.enrich(&request("Document")).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(result.summary.is_ready());
        assert_eq!(
            result.questions.error().map(|marker| marker.kind),
            Some(ErrorKind::Timeout)
        );
    }

    #[tokio::test]
    async fn caller_cancellation_stops_both_paths() {
        let summary = ScriptedProvider::slow(
            ProviderKind::OpenAiChat,
            vec![tagged_summary()],
            Duration::from_secs(30),
        );
        let questions = ScriptedProvider::slow(
            ProviderKind::QuizApi,
            vec![quiz_questions()],
            Duration::from_secs(30),
        );
        let enricher = Enricher::new(summary, questions, test_config());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = enricher.enrich_with_cancel(&request("Document"), cancel).await;

        for marker in [result.summary.error(), result.questions.error()] {
            let marker = marker.expect("cancelled path");
            assert_eq!(marker.kind, ErrorKind::Timeout);
            assert!(marker.reason.contains("cancelled"));
        }
    }

    #[tokio::test]
    async fn paths_run_concurrently() {
        let delay = Duration::from_millis(300);
        let summary =
            ScriptedProvider::slow(ProviderKind::OpenAiChat, vec![tagged_summary()], delay);
        let questions = ScriptedProvider::slow(ProviderKind::QuizApi, vec![quiz_questions()], delay);
        let enricher = Enricher::new(summary, questions, test_config());

        let started = std::time::Instant::now();
        let result = enricher.enrich(&request("Document")).await;

        assert!(result.is_complete());
        assert!(started.elapsed() < Duration::from_millis(550));
    }

    #[tokio::test]
    async fn blank_text_is_an_invalid_request() {
        let summary = ScriptedProvider::new(ProviderKind::OpenAiChat, vec![tagged_summary()]);
        let questions = ScriptedProvider::new(ProviderKind::QuizApi, vec![quiz_questions()]);
        let enricher = Enricher::new(summary.clone(), questions, test_config());

        let result = enricher.enrich_text("   ").await;

        assert_eq!(
            result.summary.error().map(|marker| marker.kind),
            Some(ErrorKind::InvalidRequest)
        );
        assert_eq!(
            result.questions.error().map(|marker| marker.kind),
            Some(ErrorKind::InvalidRequest)
        );
        assert_eq!(summary.calls(), 0);
    }

    #[tokio::test]
    async fn unbuildable_providers_surface_as_failed_paths() {
        let config = EnrichmentConfig {
            summary: ProviderSettings {
                base_url: "http://127.0.0.1:9".into(),
                ..ProviderSettings::for_kind(ProviderKind::QuizApi, 2048)
            },
            ..test_config()
        };

        // The question path uses the default chat provider without an API key, so it
        // fails before any request is sent.
        let result = enrich(&request("Document"), &config).await;

        assert_eq!(
            result.summary.error().map(|marker| marker.kind),
            Some(ErrorKind::Permanent)
        );
        assert_eq!(
            result.questions.error().map(|marker| marker.kind),
            Some(ErrorKind::Permanent)
        );
    }

    #[tokio::test]
    async fn unrepresentable_timeout_runs_without_a_deadline() {
        let summary = ScriptedProvider::new(ProviderKind::OpenAiChat, vec![tagged_summary()]);
        let questions = ScriptedProvider::new(ProviderKind::QuizApi, vec![quiz_questions()]);
        let config = EnrichmentConfig {
            overall_timeout: Duration::MAX,
            ..test_config()
        };
        let enricher = Enricher::new(summary, questions, config);

        let result = enricher.enrich(&request("Document")).await;

        assert!(result.is_complete());
    }
}
