use crate::enrichment::EnrichmentResult;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing enrichment activity.
#[derive(Default)]
pub struct EnrichmentMetrics {
    requests: AtomicU64,
    summaries_ready: AtomicU64,
    summaries_failed: AtomicU64,
    question_sets_ready: AtomicU64,
    question_sets_failed: AtomicU64,
    documents_stored: AtomicU64,
}

impl EnrichmentMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one enrichment and the outcome of each path.
    pub fn record_enrichment(&self, result: &EnrichmentResult) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let summary = if result.summary.is_ready() {
            &self.summaries_ready
        } else {
            &self.summaries_failed
        };
        summary.fetch_add(1, Ordering::Relaxed);
        let questions = if result.questions.is_ready() {
            &self.question_sets_ready
        } else {
            &self.question_sets_failed
        };
        questions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a document persisted to the store.
    pub fn record_document(&self) {
        self.documents_stored.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            summaries_ready: self.summaries_ready.load(Ordering::Relaxed),
            summaries_failed: self.summaries_failed.load(Ordering::Relaxed),
            question_sets_ready: self.question_sets_ready.load(Ordering::Relaxed),
            question_sets_failed: self.question_sets_failed.load(Ordering::Relaxed),
            documents_stored: self.documents_stored.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of enrichment counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    /// Enrichment requests handled since startup.
    pub requests: u64,
    /// Requests whose summary path produced a summary.
    pub summaries_ready: u64,
    /// Requests whose summary path ended in an error marker.
    pub summaries_failed: u64,
    /// Requests whose question path produced a question set.
    pub question_sets_ready: u64,
    /// Requests whose question path ended in an error marker.
    pub question_sets_failed: u64,
    /// Documents persisted after enrichment.
    pub documents_stored: u64,
}
