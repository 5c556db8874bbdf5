use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RiskError>;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("model training failed: {0}")]
    Training(String),

    #[error("no persisted model found in {0}")]
    PersistenceMissing(PathBuf),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("feature count mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("model artifact (pair {model}) and scaler artifact (pair {scaler}) come from different training runs")]
    MismatchedPair { model: u64, scaler: u64 },

    #[error("no trained model is available")]
    ModelUnavailable,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl RiskError {
    /// True for the expected "nothing on disk yet" case that should lead to training.
    pub fn is_missing(&self) -> bool {
        matches!(self, RiskError::PersistenceMissing(_))
    }
}
