//! Engine configuration.
//!
//! Read once at engine construction and immutable for the engine's
//! lifetime. Values come from defaults, environment variables
//! (`FAILSIGHT_*`), or a deserialized config file.

use serde::Deserialize;
use std::env;

use crate::error::{AnalysisError, Result};

pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
pub const DEFAULT_COLLECTION_NAME: &str = "test_failures";
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.3;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Identity of the embedding model, recorded for observability.
    pub embedding_model: String,
    /// Fixed length of embedding vectors.
    pub embedding_dimension: usize,
    /// Name of the backing index collection.
    pub collection_name: String,
    /// Default number of results a similarity query returns.
    pub top_k: usize,
    /// Default minimum cosine similarity for a result to be included.
    pub similarity_threshold: f32,
    /// Optional URL of a remote embedding inference endpoint. When unset,
    /// the deterministic hash embedder is used.
    pub embedding_endpoint: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            top_k: DEFAULT_TOP_K,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            embedding_endpoint: None,
        }
    }
}

impl AnalysisConfig {
    /// Build a config from `FAILSIGHT_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(model) = env::var("FAILSIGHT_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Ok(dim) = env::var("FAILSIGHT_EMBEDDING_DIMENSION") {
            config.embedding_dimension = dim.parse().map_err(|_| {
                AnalysisError::Config(format!("invalid FAILSIGHT_EMBEDDING_DIMENSION: {dim}"))
            })?;
        }
        if let Ok(name) = env::var("FAILSIGHT_COLLECTION") {
            config.collection_name = name;
        }
        if let Ok(top_k) = env::var("FAILSIGHT_TOP_K") {
            config.top_k = top_k
                .parse()
                .map_err(|_| AnalysisError::Config(format!("invalid FAILSIGHT_TOP_K: {top_k}")))?;
        }
        if let Ok(threshold) = env::var("FAILSIGHT_SIMILARITY_THRESHOLD") {
            config.similarity_threshold = threshold.parse().map_err(|_| {
                AnalysisError::Config(format!(
                    "invalid FAILSIGHT_SIMILARITY_THRESHOLD: {threshold}"
                ))
            })?;
        }
        if let Ok(endpoint) = env::var("FAILSIGHT_EMBEDDING_ENDPOINT") {
            if !endpoint.is_empty() {
                config.embedding_endpoint = Some(endpoint);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedding_dimension == 0 {
            return Err(AnalysisError::Config(
                "embedding_dimension must be > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(AnalysisError::Config(format!(
                "similarity_threshold must be in [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        Ok(())
    }
}
