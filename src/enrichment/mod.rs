//! Canonical enrichment types and the orchestrator that produces them.

mod orchestrator;
mod types;

pub use orchestrator::{Enricher, enrich};
pub use types::{
    EnrichmentRequest, EnrichmentResult, ErrorKind, ErrorMarker, PathOutcome, Question,
    QuestionKind, QuestionSet, RequestError, Summary,
};
