//! The loaded model and the prediction path.
//!
//! [`PredictorState`] is immutable once built. The server constructs one
//! at startup with [`PredictorState::initialize`] and shares it behind an
//! `Arc`; requests never load or train anything.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::artifact::{ArtifactSet, ModelArtifact};
use crate::dataset::Corpus;
use crate::encoder::LabelEncoder;
use crate::error::PredictorError;
use crate::explain::explain;
use crate::features::FeatureVector;
use crate::forest::ForestParams;
use crate::train::train;

/// Maximum number of crops returned per prediction.
pub const TOP_K: usize = 3;

/// One ranked crop candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub crop: String,
    pub score: f64,
    pub reason: String,
}

#[derive(Debug)]
pub struct PredictorState {
    model: ModelArtifact,
    encoder: LabelEncoder,
}

impl PredictorState {
    pub(crate) fn new(model: ModelArtifact, encoder: LabelEncoder) -> Self {
        Self { model, encoder }
    }

    /// Loads a previously saved model/encoder pair.
    pub fn load(artifacts: &ArtifactSet) -> Result<Self, PredictorError> {
        let (model, encoder) = artifacts.load()?;
        Ok(Self::new(model, encoder))
    }

    /// Loads the artifacts in `artifact_dir`, or trains from `corpus_path`
    /// and saves them when loading fails. Fails with
    /// [`PredictorError::ModelUnavailable`] when neither works.
    ///
    /// A model that trains but cannot be saved is still returned.
    pub fn initialize(
        artifact_dir: &Path,
        corpus_path: &Path,
        params: &ForestParams,
        test_fraction: f64,
    ) -> Result<Self, PredictorError> {
        let artifacts = ArtifactSet::new(artifact_dir);
        let load_err = match Self::load(&artifacts) {
            Ok(state) => return Ok(state),
            Err(e) => e,
        };
        tracing::warn!(error = %load_err, "no usable model artifacts, training from corpus");

        let trained = Corpus::from_csv(corpus_path).and_then(|corpus| train(&corpus, params, test_fraction));
        let (state, report) = match trained {
            Ok(pair) => pair,
            Err(train_err) => {
                tracing::error!(error = %train_err, "training fallback failed");
                return Err(PredictorError::ModelUnavailable {
                    load: load_err.to_string(),
                    train: train_err.to_string(),
                });
            }
        };

        if let Err(e) = artifacts.save(state.model(), state.encoder()) {
            tracing::warn!(error = %e, "trained model could not be saved; serving it from memory");
        }
        tracing::info!(
            training_id = %report.training_id,
            accuracy = report.accuracy,
            "model trained at startup"
        );
        Ok(state)
    }

    pub fn training_id(&self) -> &str {
        &self.model.training_id
    }

    pub fn model(&self) -> &ModelArtifact {
        &self.model
    }

    pub fn encoder(&self) -> &LabelEncoder {
        &self.encoder
    }

    pub fn classes(&self) -> &[String] {
        self.encoder.classes()
    }

    pub fn feature_importances(&self) -> &[f64] {
        self.model.forest.feature_importances()
    }

    /// Probability of every known class, in class-index order.
    pub fn class_probabilities(&self, features: &FeatureVector) -> Result<Vec<f64>, PredictorError> {
        self.model
            .forest
            .predict_proba(&features.to_array())
            .map_err(|e| PredictorError::Inference(e.to_string()))
    }

    /// Up to [`TOP_K`] crops, highest score first. Equal scores keep
    /// ascending class order and classes with zero probability are never
    /// returned. Every entry carries the same reason text.
    pub fn predict(&self, features: &FeatureVector) -> Result<Vec<Recommendation>, PredictorError> {
        features.check_finite()?;

        let proba = self.class_probabilities(features)?;
        let mut ranked: Vec<usize> = (0..proba.len()).collect();
        ranked.sort_by(|&a, &b| proba[b].total_cmp(&proba[a]));

        let reason = explain(features, self.feature_importances());
        ranked
            .into_iter()
            .filter(|&c| proba[c] > 0.0)
            .take(TOP_K)
            .map(|c| -> Result<Recommendation, PredictorError> {
                let crop = self.encoder.inverse(c).ok_or_else(|| {
                    PredictorError::Inference(format!(
                        "class {} has no label among {} known crops",
                        c,
                        self.encoder.len()
                    ))
                })?;
                Ok(Recommendation {
                    crop: crop.to_string(),
                    score: proba[c],
                    reason: reason.clone(),
                })
            })
            .collect()
    }
}
