//! Embedding Provider
//!
//! Maps failure text to fixed-length normalized vectors. The provider is
//! constructed once at process start and shared by reference into every
//! request-handling context; embedding itself is a pure function call, so
//! a shared provider is safe for concurrent use.
//!
//! Two implementations:
//! - [`HashEmbedder`]: deterministic bag-of-tokens FNV-1a embedding. No
//!   model files, no network. Captures lexical overlap only, which is
//!   enough for near-duplicate failure wording, and is the test double
//!   for the whole pipeline.
//! - [`RemoteEmbedder`]: client for a sentence-transformers style
//!   inference endpoint, for deployments with a real model server.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// FNV-1a 64-bit offset basis.
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a 64-bit prime.
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Tokens shorter than this are dropped before hashing.
const MIN_TOKEN_LEN: usize = 2;

/// Text-to-vector provider shared across the engine.
///
/// Implementations must return L2-normalized vectors of exactly
/// `dimension()` length so the index can compare them with a plain dot
/// product.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts. The default embeds one at a time;
    /// implementations with a cheaper batch path should override.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Fixed output vector length.
    fn dimension(&self) -> usize;

    /// Model identity, for logging and collection metadata.
    fn model_name(&self) -> &str;
}

/// L2-normalize a vector in place and return it.
///
/// A zero vector stays zero rather than dividing by zero; its dot product
/// against anything is 0, which reads as "no similarity".
pub fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}

fn fnv1a_hash(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Deterministic hash-based embedder.
///
/// Lowercased alphanumeric tokens are counted into `dimension` buckets via
/// FNV-1a, then L2-normalized. Same text, same vector, on every machine.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
    model_name: String,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_name: format!("fnv1a-{dimension}"),
        }
    }

    /// Embedding is pure computation; the sync path avoids async overhead
    /// for callers that do not need it.
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        let lowered = text.to_lowercase();

        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() >= MIN_TOKEN_LEN)
        {
            let hash = fnv1a_hash(token.as_bytes());
            let index = (hash % self.dimension as u64) as usize;
            vector[index] += 1.0;
        }

        l2_normalize(vector)
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_EMBEDDING_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    normalize: bool,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Client for a remote embedding inference endpoint.
///
/// Posts `{"texts": [...], "normalize": true}` and expects
/// `{"embeddings": [[...]]}` back, the contract of a
/// sentence-transformers serving shim. Normalization is requested from
/// the server so cosine similarity reduces to a dot product downstream.
///
/// Call-time failures (transport, non-2xx status, bad body) surface as
/// `BackendUnavailable`; `NotReady` is reserved for a provider that was
/// never usable to begin with.
pub struct RemoteEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model_name: String,
    dimension: usize,
    normalize: bool,
}

impl RemoteEmbedder {
    pub fn new(endpoint: String, model_name: String, dimension: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            model_name,
            dimension,
            normalize: true,
        }
    }

    /// Whether to ask the server for L2-normalized vectors. Defaults to
    /// true; turning it off breaks the dot-product similarity contract
    /// downstream, so only do so for callers handling raw vectors.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = EmbedRequest {
            texts,
            normalize: self.normalize,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::BackendUnavailable(format!("embedding endpoint: {e}")))?;

        if !response.status().is_success() {
            return Err(AnalysisError::BackendUnavailable(format!(
                "embedding endpoint returned {}",
                response.status()
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::BackendUnavailable(format!("embedding response: {e}")))?;

        for vector in &parsed.embeddings {
            if vector.len() != self.dimension {
                return Err(AnalysisError::DimensionMismatch {
                    expected: self.dimension,
                    found: vector.len(),
                });
            }
        }

        Ok(parsed.embeddings)
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let mut vectors = self.request(&texts).await?;
        vectors.pop().ok_or_else(|| {
            AnalysisError::BackendUnavailable("empty embedding response".to_string())
        })
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.request(texts).await?;
        if vectors.len() != texts.len() {
            return Err(AnalysisError::BackendUnavailable(format!(
                "embedding response count {} != request count {}",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
