//! Similarity Index
//!
//! Stores (vector, payload) pairs for indexed failures and answers
//! k-nearest-neighbor queries under cosine similarity. Vectors are
//! L2-normalized at write and query time, so similarity is a plain dot
//! product and the score thresholds (0.3 retrieval floor, 0.85
//! recurring, 0.9 very-high) stay calibrated against the [0, 1] cosine
//! range.
//!
//! The backend is a pluggable trait; [`InMemoryIndex`] is the bundled
//! implementation. A server-backed implementation maps the same
//! operations onto its client and surfaces transport failures as
//! `BackendUnavailable`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AnalysisError, Result};
use crate::event::TestEvent;

/// Payload copy of the originating event's display fields, stored next to
/// the vector. Includes the exact text the vector was produced from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailurePayload {
    pub event_id: String,
    pub test_id: String,
    pub test_name: String,
    pub class_name: String,
    pub suite: String,
    pub message: String,
    pub stacktrace: String,
    pub timestamp: String,
    pub duration_ms: u64,
    pub embedding_text: String,
}

impl FailurePayload {
    pub fn from_event(event: &TestEvent, embedding_text: String) -> Self {
        Self {
            event_id: event.event_id.clone(),
            test_id: event.test_id.clone(),
            test_name: event.test_name.clone(),
            class_name: event.class_name.clone(),
            suite: event.suite.clone(),
            message: event.message.clone(),
            stacktrace: event.stacktrace.clone().unwrap_or_default(),
            timestamp: event.timestamp.clone(),
            duration_ms: event.duration_ms,
            embedding_text,
        }
    }
}

/// One persisted unit in the index: generated key, normalized vector, and
/// the payload snapshot. Created once at index time, never mutated.
#[derive(Debug, Clone)]
pub struct IndexedFailure {
    pub id: Uuid,
    pub vector: Vec<f32>,
    pub payload: FailurePayload,
}

impl IndexedFailure {
    pub fn new(vector: Vec<f32>, payload: FailurePayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            vector,
            payload,
        }
    }
}

/// One query hit: similarity score plus the matched payload's display
/// fields. Ordered descending by score.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityResult {
    pub score: f32,
    pub test_name: String,
    pub class_name: String,
    pub suite: String,
    pub message: String,
    pub stacktrace: String,
    pub timestamp: String,
}

impl SimilarityResult {
    fn from_payload(score: f32, payload: &FailurePayload) -> Self {
        Self {
            score,
            test_name: payload.test_name.clone(),
            class_name: payload.class_name.clone(),
            suite: payload.suite.clone(),
            message: payload.message.clone(),
            stacktrace: payload.stacktrace.clone(),
            timestamp: payload.timestamp.clone(),
        }
    }
}

/// Collection name and entry count, for observability only.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub points_count: usize,
}

/// Vector storage with k-nearest-neighbor retrieval under cosine
/// similarity.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Create the backing collection if absent; no-op when it already
    /// exists. An existing collection's dimension is not re-validated
    /// here; a mismatch surfaces on the next upsert.
    async fn ensure_collection(&self, dimension: usize) -> Result<()>;

    /// Insert or replace a point by id. No uniqueness constraint on
    /// payload content: indexing the same failure twice yields two
    /// distinct entries.
    async fn upsert(&self, point: IndexedFailure) -> Result<Uuid>;

    /// Return up to `top_k` entries with similarity >= `score_threshold`,
    /// descending by score. An empty list is a normal outcome.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<SimilarityResult>>;

    async fn collection_info(&self) -> Result<CollectionInfo>;
}

#[derive(Debug, Default)]
struct IndexState {
    dimension: Option<usize>,
    points: Vec<IndexedFailure>,
}

/// In-memory similarity index. Linear scan over normalized vectors;
/// adequate for failure corpora in the tens of thousands.
pub struct InMemoryIndex {
    name: String,
    state: RwLock<IndexState>,
}

impl InMemoryIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(IndexState::default()),
        }
    }
}

#[async_trait]
impl SimilarityIndex for InMemoryIndex {
    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let mut state = self.state.write().await;
        if state.dimension.is_none() {
            state.dimension = Some(dimension);
            tracing::info!(collection = %self.name, dimension, "created collection");
        }
        Ok(())
    }

    async fn upsert(&self, point: IndexedFailure) -> Result<Uuid> {
        let mut state = self.state.write().await;

        let dimension = state.dimension.unwrap_or(point.vector.len());
        if point.vector.len() != dimension {
            return Err(AnalysisError::DimensionMismatch {
                expected: dimension,
                found: point.vector.len(),
            });
        }
        if state.dimension.is_none() {
            state.dimension = Some(dimension);
        }

        let id = point.id;
        match state.points.iter_mut().find(|p| p.id == id) {
            Some(existing) => *existing = point,
            None => state.points.push(point),
        }
        Ok(id)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<SimilarityResult>> {
        let state = self.state.read().await;

        if let Some(dimension) = state.dimension {
            if vector.len() != dimension {
                return Err(AnalysisError::DimensionMismatch {
                    expected: dimension,
                    found: vector.len(),
                });
            }
        }

        let mut results: Vec<SimilarityResult> = state
            .points
            .iter()
            .filter_map(|point| {
                let score = dot(vector, &point.vector).clamp(0.0, 1.0);
                if score >= score_threshold {
                    Some(SimilarityResult::from_payload(score, &point.payload))
                } else {
                    None
                }
            })
            .collect();

        // Stable sort keeps insertion order on tied scores
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        tracing::debug!(
            collection = %self.name,
            hits = results.len(),
            threshold = score_threshold,
            "similarity query"
        );
        Ok(results)
    }

    async fn collection_info(&self) -> Result<CollectionInfo> {
        let state = self.state.read().await;
        Ok(CollectionInfo {
            name: self.name.clone(),
            points_count: state.points.len(),
        })
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
