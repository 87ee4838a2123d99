//! Document service coordinating extraction, enrichment, and storage.

use crate::{
    enrichment::{Enricher, EnrichmentRequest, EnrichmentResult, RequestError},
    extraction::{ExtractionError, FileKind, TextExtractor},
    metrics::{EnrichmentMetrics, MetricsSnapshot},
    store::{DocumentRecord, DocumentStore, NewDocument, StoreError},
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by the document service.
///
/// Provider failures never appear here: they are carried inside [`EnrichmentResult`].
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The request itself is unusable.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),
    /// The uploaded file yielded no text.
    #[error("text extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    /// The document store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Operations exposed to the HTTP surface.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Enrich raw text without storing it.
    async fn enrich_text(
        &self,
        text: String,
        max_input_length: Option<usize>,
    ) -> Result<EnrichmentResult, DocumentError>;

    /// Extract, enrich, and store an uploaded file.
    async fn ingest_upload(
        &self,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Result<DocumentRecord, DocumentError>;

    /// Stored documents, newest first.
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, DocumentError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Default [`DocumentApi`] implementation.
///
/// Construct once near process start and share through an `Arc`.
pub struct DocumentService {
    extractor: Box<dyn TextExtractor>,
    enricher: Enricher,
    store: Arc<dyn DocumentStore>,
    metrics: Arc<EnrichmentMetrics>,
}

impl DocumentService {
    /// Assemble a service from its parts.
    pub fn new(
        extractor: Box<dyn TextExtractor>,
        enricher: Enricher,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            extractor,
            enricher,
            store,
            metrics: Arc::new(EnrichmentMetrics::new()),
        }
    }

    async fn run(&self, request: &EnrichmentRequest) -> EnrichmentResult {
        let result = self.enricher.enrich(request).await;
        self.metrics.record_enrichment(&result);
        result
    }
}

#[async_trait]
impl DocumentApi for DocumentService {
    async fn enrich_text(
        &self,
        text: String,
        max_input_length: Option<usize>,
    ) -> Result<EnrichmentResult, DocumentError> {
        let limit =
            max_input_length.unwrap_or(self.enricher.config().default_max_input_length);
        let request = EnrichmentRequest::new(text, limit)?;
        Ok(self.run(&request).await)
    }

    async fn ingest_upload(
        &self,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Result<DocumentRecord, DocumentError> {
        let kind = FileKind::from_file_name(&file_name);
        let text = self.extractor.extract_text(&bytes, kind).map_err(|error| {
            tracing::warn!(file_name = %file_name, kind = kind.as_str(), error = %error, "Extraction failed");
            error
        })?;
        tracing::debug!(
            file_name = %file_name,
            kind = kind.as_str(),
            chars = text.chars().count(),
            "Extracted document text"
        );

        let request =
            EnrichmentRequest::new(text.as_str(), self.enricher.config().default_max_input_length)?;
        let enrichment = self.run(&request).await;
        let record = self
            .store
            .insert(NewDocument {
                file_name,
                text,
                enrichment,
            })
            .await?;
        self.metrics.record_document();
        tracing::info!(
            id = %record.id,
            file_name = %record.file_name,
            complete = record.enrichment.is_complete(),
            "Document stored"
        );
        Ok(record)
    }

    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, DocumentError> {
        Ok(self.store.list_all().await?)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnrichmentConfig;
    use crate::enrichment::ErrorKind;
    use crate::extraction::PlainTextExtractor;
    use crate::providers::{
        ProviderError, ProviderKind, QuestionProvider, QuizParams, RawProviderPayload,
        SummaryParams, SummaryProvider,
    };
    use crate::store::InMemoryDocumentStore;
    use serde_json::json;

    struct EchoSummary;

    #[async_trait]
    impl SummaryProvider for EchoSummary {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Ollama
        }

        fn truncate_at(&self) -> usize {
            usize::MAX
        }

        async fn summarize(
            &self,
            text: &str,
            _params: &SummaryParams,
        ) -> Result<RawProviderPayload, ProviderError> {
            Ok(RawProviderPayload::Text(format!("About: {text}")))
        }
    }

    struct RejectingQuestions;

    #[async_trait]
    impl QuestionProvider for RejectingQuestions {
        fn kind(&self) -> ProviderKind {
            ProviderKind::QuizApi
        }

        fn truncate_at(&self) -> usize {
            usize::MAX
        }

        async fn generate_questions(
            &self,
            _text: &str,
            _params: &QuizParams,
        ) -> Result<RawProviderPayload, ProviderError> {
            Err(ProviderError::Permanent("quiz quota exceeded".into()))
        }
    }

    struct FixedQuestions;

    #[async_trait]
    impl QuestionProvider for FixedQuestions {
        fn kind(&self) -> ProviderKind {
            ProviderKind::QuizApi
        }

        fn truncate_at(&self) -> usize {
            usize::MAX
        }

        async fn generate_questions(
            &self,
            _text: &str,
            _params: &QuizParams,
        ) -> Result<RawProviderPayload, ProviderError> {
            Ok(RawProviderPayload::Json(json!([
                { "type": "short-answer", "question": "What?", "answer": "That." }
            ])))
        }
    }

    fn service(questions: Arc<dyn QuestionProvider>) -> DocumentService {
        let config = EnrichmentConfig {
            default_max_input_length: 8,
            ..EnrichmentConfig::default()
        };
        DocumentService::new(
            Box::new(PlainTextExtractor),
            Enricher::new(Arc::new(EchoSummary), questions, config),
            Arc::new(InMemoryDocumentStore::new()),
        )
    }

    #[tokio::test]
    async fn upload_stores_partial_enrichment() {
        let service = service(Arc::new(RejectingQuestions));

        let record = service
            .ingest_upload("notes.txt".into(), b"Photosynthesis basics".to_vec())
            .await
            .expect("stored");

        assert_eq!(record.file_name, "notes.txt");
        assert_eq!(
            record.enrichment.summary.ready().map(|summary| summary.body.as_str()),
            Some("About: Photosyn")
        );
        assert_eq!(
            record.enrichment.questions.error().map(|marker| marker.kind),
            Some(ErrorKind::Permanent)
        );
        assert_eq!(service.list_documents().await.expect("list"), vec![record]);

        let snapshot = service.metrics_snapshot();
        assert_eq!(snapshot.requests, 1);
        assert_eq!(snapshot.question_sets_failed, 1);
        assert_eq!(snapshot.documents_stored, 1);
    }

    #[tokio::test]
    async fn extraction_failure_stores_nothing() {
        let service = service(Arc::new(FixedQuestions));

        let error = service
            .ingest_upload("scan.pdf".into(), b"%PDF-1.7".to_vec())
            .await
            .expect_err("unsupported");

        assert!(matches!(
            error,
            DocumentError::Extraction(ExtractionError::UnsupportedKind(_))
        ));
        assert!(service.list_documents().await.expect("list").is_empty());
        assert_eq!(service.metrics_snapshot().requests, 0);
    }

    #[tokio::test]
    async fn enrich_text_honours_explicit_limit() {
        let service = service(Arc::new(FixedQuestions));

        let result = service
            .enrich_text("abcdefghij".into(), Some(3))
            .await
            .expect("result");

        assert!(result.is_complete());
        assert_eq!(
            result.summary.ready().map(|summary| summary.body.as_str()),
            Some("About: abc")
        );
        assert!(service.list_documents().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn blank_text_is_rejected() {
        let service = service(Arc::new(FixedQuestions));

        let error = service
            .enrich_text("  \n".into(), None)
            .await
            .expect_err("invalid");

        assert!(matches!(
            error,
            DocumentError::InvalidRequest(RequestError::EmptyText)
        ));
    }
}
