use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Embedding provider not ready: {0}")]
    NotReady(String),

    #[error("Index backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Dimension mismatch: collection expects {expected}, vector has {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Not a failure event: {0}")]
    NotAFailure(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
