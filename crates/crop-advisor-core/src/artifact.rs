//! Persisted model artifacts.
//!
//! A trained model is stored as two JSON files in one directory:
//!
//! - `model.json`: the forest plus training metadata.
//! - `label_encoder.json`: the class list the forest indexes into.
//!
//! Both carry the same `format_version` and `training_id`. The forest's
//! class indices are positional over the encoder's classes, so the pair
//! is only ever loaded together and only when the ids match.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::encoder::LabelEncoder;
use crate::error::PredictorError;
use crate::features::{feature_names, FEATURE_COUNT};
use crate::forest::{ForestParams, RandomForest};

/// Bumped whenever the on-disk layout changes incompatibly.
pub const FORMAT_VERSION: u32 = 1;

pub const MODEL_FILE: &str = "model.json";
pub const ENCODER_FILE: &str = "label_encoder.json";

/// Contents of `model.json`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub training_id: String,
    pub created_at: DateTime<Utc>,
    pub feature_names: Vec<String>,
    pub params: ForestParams,
    /// SHA-256 of the corpus file the forest was trained on.
    pub corpus_fingerprint: String,
    pub forest: RandomForest,
}

/// Contents of `label_encoder.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct EncoderArtifact {
    format_version: u32,
    training_id: String,
    classes: Vec<String>,
}

/// The directory holding one model/encoder pair.
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    dir: PathBuf,
}

impl ArtifactSet {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn encoder_path(&self) -> PathBuf {
        self.dir.join(ENCODER_FILE)
    }

    /// True when both files are present. Says nothing about validity.
    pub fn exists(&self) -> bool {
        self.model_path().is_file() && self.encoder_path().is_file()
    }

    /// Writes both artifacts. Each is serialized to a `.tmp` sibling
    /// first; the real files are only replaced once both temporaries are
    /// complete.
    ///
    /// The two renames are not one atomic step. A crash between them
    /// leaves a new `model.json` next to the previous `label_encoder.json`.
    /// [`ArtifactSet::load`] rejects that pair because the training ids
    /// differ, and [`crate::PredictorState::initialize`] then retrains and
    /// saves a consistent pair.
    pub fn save(&self, model: &ModelArtifact, encoder: &LabelEncoder) -> Result<(), PredictorError> {
        fs::create_dir_all(&self.dir).map_err(|e| PredictorError::write(&self.dir, e))?;

        let encoder_artifact = EncoderArtifact {
            format_version: model.format_version,
            training_id: model.training_id.clone(),
            classes: encoder.classes().to_vec(),
        };

        let model_path = self.model_path();
        let encoder_path = self.encoder_path();
        let model_tmp = tmp_path(&model_path);
        let encoder_tmp = tmp_path(&encoder_path);

        let model_bytes =
            serde_json::to_vec(model).map_err(|e| PredictorError::write(&model_path, e))?;
        let encoder_bytes = serde_json::to_vec_pretty(&encoder_artifact)
            .map_err(|e| PredictorError::write(&encoder_path, e))?;

        let staged = fs::write(&model_tmp, model_bytes)
            .map_err(|e| PredictorError::write(&model_tmp, e))
            .and_then(|_| {
                fs::write(&encoder_tmp, encoder_bytes)
                    .map_err(|e| PredictorError::write(&encoder_tmp, e))
            });
        if let Err(e) = staged {
            let _ = fs::remove_file(&model_tmp);
            let _ = fs::remove_file(&encoder_tmp);
            return Err(e);
        }

        fs::rename(&model_tmp, &model_path).map_err(|e| PredictorError::write(&model_path, e))?;
        fs::rename(&encoder_tmp, &encoder_path)
            .map_err(|e| PredictorError::write(&encoder_path, e))?;

        tracing::info!(
            dir = %self.dir.display(),
            training_id = %model.training_id,
            "saved model artifacts"
        );
        Ok(())
    }

    /// Reads and cross-checks both artifacts.
    pub fn load(&self) -> Result<(ModelArtifact, LabelEncoder), PredictorError> {
        let model_path = self.model_path();
        let encoder_path = self.encoder_path();

        let model: ModelArtifact = read_json(&model_path)?;
        let encoder_artifact: EncoderArtifact = read_json(&encoder_path)?;

        if model.format_version != FORMAT_VERSION {
            return Err(PredictorError::load(
                &model_path,
                format!("unsupported format_version {}", model.format_version),
            ));
        }
        if encoder_artifact.format_version != FORMAT_VERSION {
            return Err(PredictorError::load(
                &encoder_path,
                format!("unsupported format_version {}", encoder_artifact.format_version),
            ));
        }
        if model.training_id != encoder_artifact.training_id {
            return Err(PredictorError::load(
                &encoder_path,
                format!(
                    "training_id {} does not match model training_id {}",
                    encoder_artifact.training_id, model.training_id
                ),
            ));
        }
        if model.feature_names != feature_names() {
            return Err(PredictorError::load(
                &model_path,
                format!("unexpected feature names {:?}", model.feature_names),
            ));
        }
        if model.forest.n_features() != FEATURE_COUNT {
            return Err(PredictorError::load(
                &model_path,
                format!("forest expects {} features", model.forest.n_features()),
            ));
        }
        model
            .forest
            .validate()
            .map_err(|e| PredictorError::load(&model_path, e))?;

        let encoder = LabelEncoder::from_classes(encoder_artifact.classes)
            .ok_or_else(|| PredictorError::load(&encoder_path, "classes are not strictly sorted"))?;
        if encoder.len() != model.forest.n_classes() {
            return Err(PredictorError::load(
                &encoder_path,
                format!(
                    "{} classes but the forest predicts {}",
                    encoder.len(),
                    model.forest.n_classes()
                ),
            ));
        }

        tracing::info!(
            dir = %self.dir.display(),
            training_id = %model.training_id,
            classes = encoder.len(),
            "loaded model artifacts"
        );
        Ok((model, encoder))
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PredictorError> {
    let bytes = fs::read(path).map_err(|e| PredictorError::load(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| PredictorError::load(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> (ModelArtifact, LabelEncoder) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..12 {
            let class = i % 2;
            let mut row = vec![0.0; FEATURE_COUNT];
            row[0] = class as f64 * 100.0 + i as f64;
            x.push(row);
            y.push(class);
        }
        let params = ForestParams {
            n_trees: 3,
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&x, &y, 2, &params).unwrap();
        let model = ModelArtifact {
            format_version: FORMAT_VERSION,
            training_id: "run-1".into(),
            created_at: Utc::now(),
            feature_names: feature_names(),
            params,
            corpus_fingerprint: "abc".into(),
            forest,
        };
        (model, LabelEncoder::fit(["maize", "rice"]))
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let set = ArtifactSet::new(tmp.path().join("model"));
        assert!(!set.exists());

        let (model, encoder) = sample();
        set.save(&model, &encoder).unwrap();
        assert!(set.exists());
        assert!(!tmp_path(&set.model_path()).exists());

        let (loaded, loaded_encoder) = set.load().unwrap();
        assert_eq!(loaded.training_id, model.training_id);
        assert_eq!(
            serde_json::to_value(&loaded.forest).unwrap(),
            serde_json::to_value(&model.forest).unwrap()
        );
        assert_eq!(loaded_encoder, encoder);
    }

    #[test]
    fn test_missing_artifacts() {
        let tmp = TempDir::new().unwrap();
        let err = ArtifactSet::new(tmp.path()).load().unwrap_err();
        assert!(matches!(err, PredictorError::ArtifactLoad { .. }));
    }

    #[test]
    fn test_corrupt_model() {
        let tmp = TempDir::new().unwrap();
        let set = ArtifactSet::new(tmp.path());
        let (model, encoder) = sample();
        set.save(&model, &encoder).unwrap();
        fs::write(set.model_path(), b"{not json").unwrap();
        let err = set.load().unwrap_err();
        assert!(matches!(err, PredictorError::ArtifactLoad { .. }));
    }

    #[test]
    fn test_mismatched_training_ids() {
        let tmp = TempDir::new().unwrap();
        let set = ArtifactSet::new(tmp.path());
        let (mut model, encoder) = sample();
        set.save(&model, &encoder).unwrap();

        // Replace only the model with one from another run.
        model.training_id = "run-2".into();
        fs::write(set.model_path(), serde_json::to_vec(&model).unwrap()).unwrap();

        let err = set.load().unwrap_err();
        assert!(err.to_string().contains("does not match"), "{}", err);
    }

    #[test]
    fn test_interrupted_save_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let set = ArtifactSet::new(tmp.path());
        let (mut model, encoder) = sample();
        set.save(&model, &encoder).unwrap();

        // Second save stops after the model rename.
        model.training_id = "run-2".into();
        let staged = tmp_path(&set.model_path());
        fs::write(&staged, serde_json::to_vec(&model).unwrap()).unwrap();
        fs::rename(&staged, set.model_path()).unwrap();

        let err = set.load().unwrap_err();
        assert!(matches!(err, PredictorError::ArtifactLoad { .. }));
        assert!(err.to_string().contains("run-1"), "{}", err);
    }

    #[test]
    fn test_class_count_mismatch() {
        let tmp = TempDir::new().unwrap();
        let set = ArtifactSet::new(tmp.path());
        let (model, _) = sample();
        set.save(&model, &LabelEncoder::fit(["maize", "rice", "wheat"]))
            .unwrap();
        let err = set.load().unwrap_err();
        assert!(err.to_string().contains("classes"), "{}", err);
    }

    #[test]
    fn test_unsupported_version() {
        let tmp = TempDir::new().unwrap();
        let set = ArtifactSet::new(tmp.path());
        let (mut model, encoder) = sample();
        model.format_version = FORMAT_VERSION + 1;
        set.save(&model, &encoder).unwrap();
        let err = set.load().unwrap_err();
        assert!(err.to_string().contains("format_version"), "{}", err);
    }
}
