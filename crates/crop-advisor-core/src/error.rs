//! Error kinds surfaced by training, artifact handling, and prediction.
//!
//! The three kinds the serving layer must be able to tell apart are
//! [`PredictorError::CorpusRead`], [`PredictorError::ArtifactLoad`] and
//! [`PredictorError::ModelUnavailable`]. None of them is ever turned into
//! an empty recommendation list.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictorError {
    /// The training corpus is missing, unreadable, or malformed.
    #[error("failed to read training corpus {}: {reason}", path.display())]
    CorpusRead { path: PathBuf, reason: String },

    /// A persisted model or encoder artifact is missing or corrupt.
    #[error("failed to load model artifact {}: {reason}", path.display())]
    ArtifactLoad { path: PathBuf, reason: String },

    /// Trained artifacts could not be written.
    #[error("failed to write model artifact {}: {reason}", path.display())]
    ArtifactWrite { path: PathBuf, reason: String },

    /// Neither loading nor training produced a usable model.
    #[error("model unavailable (load: {load}; train: {train})")]
    ModelUnavailable { load: String, train: String },

    /// The feature vector contains a non-finite value.
    #[error("invalid features: {0}")]
    InvalidFeatures(String),

    /// The loaded model could not score a valid feature vector.
    #[error("prediction failed: {0}")]
    Inference(String),
}

impl PredictorError {
    pub(crate) fn corpus(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PredictorError::CorpusRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PredictorError::ArtifactLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PredictorError::ArtifactWrite {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PredictorError::CorpusRead { .. } => "corpus_read",
            PredictorError::ArtifactLoad { .. } => "artifact_load",
            PredictorError::ArtifactWrite { .. } => "artifact_write",
            PredictorError::ModelUnavailable { .. } => "model_unavailable",
            PredictorError::InvalidFeatures(_) => "invalid_features",
            PredictorError::Inference(_) => "inference",
        }
    }
}
