#![deny(missing_docs)]

//! Core library for the document enrichment service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Document service tying extraction, enrichment, and storage together.
pub mod documents;
/// Enrichment data model and orchestrator.
pub mod enrichment;
/// Plain-text extraction from uploaded files.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Enrichment metrics helpers.
pub mod metrics;
/// Normalization of raw provider payloads into canonical types.
pub mod normalize;
/// Provider adapters for summary and question backends.
pub mod providers;
/// Retry policy for provider calls.
pub mod retry;
/// Enriched document storage.
pub mod store;
