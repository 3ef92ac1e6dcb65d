//! Analysis Engine
//!
//! Orchestrates the pipeline: pulls events from the source, indexes
//! failure vectors, runs similarity queries, extracts recurrence
//! patterns and renders recommendations. One engine instance owns a
//! shared embedder and index and moves from unindexed to indexed once;
//! re-indexing is additive (repeated loads re-insert, no dedup key).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::embedding::{Embedder, HashEmbedder, RemoteEmbedder};
use crate::error::{AnalysisError, Result};
use crate::event::{EventStatus, TestEvent};
use crate::ingestion::EventSource;
use crate::patterns::PatternSummary;
use crate::rules;
use crate::summary::{summarize, SummaryReport};
use crate::vector_store::{
    FailurePayload, InMemoryIndex, IndexedFailure, SimilarityIndex, SimilarityResult,
};

/// Counts returned by [`AnalysisEngine::load_and_index`].
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub total_events: usize,
    pub failures_indexed: usize,
    pub passed: usize,
    pub started: usize,
    /// Events whose individual embed/upsert attempt failed; the rest of
    /// the batch is unaffected.
    pub index_errors: usize,
}

/// Full analysis of one failure event. Ephemeral, not persisted.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub test_name: String,
    pub class_name: String,
    pub error_message: String,
    pub similar_failures: Vec<SimilarityResult>,
    pub patterns: PatternSummary,
    pub recommendation: String,
}

pub struct AnalysisEngine {
    config: AnalysisConfig,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn SimilarityIndex>,
    source: Arc<dyn EventSource>,
    indexed: AtomicBool,
}

impl AnalysisEngine {
    /// Engine over an in-memory index. The embedder is constructed once by
    /// the caller and shared into the engine.
    pub fn new(
        config: AnalysisConfig,
        embedder: Arc<dyn Embedder>,
        source: Arc<dyn EventSource>,
    ) -> Self {
        let index = Arc::new(InMemoryIndex::new(config.collection_name.clone()));
        Self::with_index(config, embedder, index, source)
    }

    /// Engine over a caller-supplied index backend.
    pub fn with_index(
        config: AnalysisConfig,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn SimilarityIndex>,
        source: Arc<dyn EventSource>,
    ) -> Self {
        Self {
            config,
            embedder,
            index,
            source,
            indexed: AtomicBool::new(false),
        }
    }

    /// Engine with the embedder chosen from config: the remote client when
    /// an endpoint is configured, the deterministic hash embedder otherwise.
    pub fn from_config(config: AnalysisConfig, source: Arc<dyn EventSource>) -> Self {
        let embedder: Arc<dyn Embedder> = match &config.embedding_endpoint {
            Some(endpoint) => Arc::new(RemoteEmbedder::new(
                endpoint.clone(),
                config.embedding_model.clone(),
                config.embedding_dimension,
            )),
            None => Arc::new(HashEmbedder::new(config.embedding_dimension)),
        };
        info!(model = embedder.model_name(), dimension = embedder.dimension(), "embedder ready");
        Self::new(config, embedder, source)
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Load all events from the source and index every failure.
    ///
    /// Each failure's embed-and-upsert attempt is independent: an error is
    /// logged and counted, and never aborts the remaining batch. Repeated
    /// calls re-insert; entry counts in the returned stats reflect this
    /// call only.
    pub async fn load_and_index(&self) -> Result<IndexStats> {
        let events = self.source.events()?;
        self.index
            .ensure_collection(self.embedder.dimension())
            .await?;

        let mut failures_indexed = 0_usize;
        let mut index_errors = 0_usize;

        for event in events.iter().filter(|e| e.is_failure()) {
            match self.index_failure(event).await {
                Ok(_) => failures_indexed += 1,
                Err(e) => {
                    index_errors += 1;
                    warn!(
                        test = %event.test_name,
                        error = %e,
                        "failed to index failure event"
                    );
                }
            }
        }

        self.indexed.store(true, Ordering::SeqCst);

        let stats = IndexStats {
            total_events: events.len(),
            failures_indexed,
            passed: events
                .iter()
                .filter(|e| e.status == EventStatus::Passed)
                .count(),
            started: events
                .iter()
                .filter(|e| e.status == EventStatus::Started)
                .count(),
            index_errors,
        };

        info!(
            total = stats.total_events,
            indexed = stats.failures_indexed,
            errors = stats.index_errors,
            "indexed failure history"
        );
        Ok(stats)
    }

    async fn index_failure(&self, event: &TestEvent) -> Result<uuid::Uuid> {
        let text = event.embedding_text();
        let vector = self.embedder.embed(&text).await?;
        let payload = FailurePayload::from_event(event, text);
        self.index.upsert(IndexedFailure::new(vector, payload)).await
    }

    /// Retrieve past failures similar to a free-text query.
    ///
    /// Lazily indexes on first use: the first query pays the load cost.
    /// `top_k` falls back to the configured default, as does the score
    /// threshold.
    pub async fn find_similar(
        &self,
        query_text: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<SimilarityResult>> {
        if !self.indexed.load(Ordering::SeqCst) {
            self.load_and_index().await?;
        }

        let vector = self.embedder.embed(query_text).await?;
        self.index
            .query(
                &vector,
                top_k.unwrap_or(self.config.top_k),
                self.config.similarity_threshold,
            )
            .await
    }

    /// Analyze a single failure event: similar failures, recurrence
    /// patterns, recommendation. Fails with `NotAFailure` for anything
    /// else, without touching the index.
    pub async fn analyze(&self, event: &TestEvent) -> Result<AnalysisReport> {
        if !event.is_failure() {
            return Err(AnalysisError::NotAFailure(format!(
                "{} ({:?})",
                event.test_name, event.status
            )));
        }

        let similar = self.find_similar(&event.embedding_text(), None).await?;
        let patterns = PatternSummary::from_matches(&similar);
        let recommendation = rules::recommend(&event.message, &patterns);

        Ok(AnalysisReport {
            test_name: event.test_name.clone(),
            class_name: event.class_name.clone(),
            error_message: event.message.clone(),
            similar_failures: similar,
            patterns,
            recommendation,
        })
    }

    /// Corpus-wide statistics, computed from the event source independently
    /// of the vector index.
    pub async fn summary(&self) -> Result<SummaryReport> {
        let events = self.source.events()?;
        let info = self.index.collection_info().await?;
        Ok(summarize(&events, info))
    }
}
