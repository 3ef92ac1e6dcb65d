//! failsight: test-failure similarity search and pattern analysis.
//!
//! Ingests typed test-execution events, turns failures into normalized
//! embedding vectors, retrieves similar past failures under cosine
//! similarity, and derives recommendations from the retrieved set.

pub mod analysis;
pub mod config;
pub mod embedding;
pub mod error;
pub mod event;
pub mod ingestion;
pub mod patterns;
pub mod rules;
pub mod summary;
pub mod vector_store;

pub use analysis::{AnalysisEngine, AnalysisReport, IndexStats};
pub use config::AnalysisConfig;
pub use embedding::{Embedder, HashEmbedder, RemoteEmbedder};
pub use error::{AnalysisError, Result};
pub use event::{EventStatus, Severity, TestEvent};
pub use ingestion::{EventSource, JsonlLogSource, StaticEvents};
pub use patterns::PatternSummary;
pub use summary::SummaryReport;
pub use vector_store::{CollectionInfo, InMemoryIndex, SimilarityIndex, SimilarityResult};
