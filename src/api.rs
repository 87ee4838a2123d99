//! HTTP surface for document enrichment.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /enrich` – Summarize raw text and generate quiz questions without storing anything.
//!   Accepts `{ "text": ..., "max_input_length": optional }` and returns both path outcomes.
//! - `POST /documents?file_name=...` – Upload a file body; its text is extracted, enriched, and
//!   stored. Returns the stored record.
//! - `GET /documents` – List stored documents, newest first.
//! - `GET /metrics` – Observe enrichment counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! A failed summary or question path is still a successful response: the failure is reported
//! as an error marker inside the body. Only unusable input maps to an error status.

use crate::documents::{DocumentApi, DocumentError};
use crate::enrichment::EnrichmentResult;
use crate::metrics::MetricsSnapshot;
use crate::store::DocumentRecord;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the enrichment API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: DocumentApi + 'static,
{
    Router::new()
        .route("/enrich", post(enrich_text::<S>))
        .route(
            "/documents",
            get(list_documents::<S>).post(upload_document::<S>),
        )
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Request body for the `POST /enrich` endpoint.
#[derive(Deserialize)]
struct EnrichRequest {
    /// Plain text to enrich.
    text: String,
    /// Optional cap on characters sent to any provider.
    #[serde(default)]
    max_input_length: Option<usize>,
}

/// Enrich raw text and return both path outcomes.
async fn enrich_text<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<EnrichRequest>,
) -> Result<Json<EnrichmentResult>, AppError>
where
    S: DocumentApi,
{
    let result = service
        .enrich_text(request.text, request.max_input_length)
        .await?;
    tracing::info!(
        summary_ready = result.summary.is_ready(),
        questions_ready = result.questions.is_ready(),
        "Enrich request completed"
    );
    Ok(Json(result))
}

/// Query parameters for `POST /documents`.
#[derive(Deserialize)]
struct UploadParams {
    file_name: String,
}

/// Extract, enrich, and store an uploaded document.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<DocumentRecord>), AppError>
where
    S: DocumentApi,
{
    let record = service
        .ingest_upload(params.file_name, body.to_vec())
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Response body for `GET /documents`.
#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<DocumentRecord>,
}

/// List stored documents, newest first.
async fn list_documents<S>(
    State(service): State<Arc<S>>,
) -> Result<Json<DocumentsResponse>, AppError>
where
    S: DocumentApi,
{
    let documents = service.list_documents().await?;
    Ok(Json(DocumentsResponse { documents }))
}

/// Return the enrichment counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: DocumentApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "enrich",
                method: "POST",
                path: "/enrich",
                description: "Summarize text and generate quiz questions. Each half is returned as { \"status\": \"ready\", \"value\": ... } or { \"status\": \"failed\", \"value\": { \"kind\", \"reason\" } }.",
                request_example: Some(json!({
                    "text": "Document contents",
                    "max_input_length": 4000
                })),
            },
            CommandDescriptor {
                name: "upload_document",
                method: "POST",
                path: "/documents?file_name=notes.txt",
                description: "Upload a document body. Text is extracted, enriched, and stored; the stored record is returned.",
                request_example: None,
            },
            CommandDescriptor {
                name: "list_documents",
                method: "GET",
                path: "/documents",
                description: "Return stored documents with their enrichment, newest first.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return enrichment counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

struct AppError(DocumentError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DocumentError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DocumentError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DocumentError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

impl From<DocumentError> for AppError {
    fn from(inner: DocumentError) -> Self {
        Self(inner)
    }
}
