//! Training: corpus → stratified split → forest → held-out report.

use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::artifact::{ArtifactSet, ModelArtifact, FORMAT_VERSION};
use crate::dataset::{stratified_split, Corpus};
use crate::encoder::LabelEncoder;
use crate::error::PredictorError;
use crate::features::{feature_names, Feature};
use crate::forest::{ForestParams, RandomForest};
use crate::predictor::PredictorState;

/// Held-out metrics for one crop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub crop: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Diagnostic summary of a training run. Informational only; nothing
/// downstream depends on these numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub training_id: String,
    pub corpus_fingerprint: String,
    pub train_size: usize,
    pub test_size: usize,
    pub accuracy: f64,
    pub per_class: Vec<ClassMetrics>,
    pub feature_importances: Vec<(String, f64)>,
}

/// Fits a forest on the training partition of `corpus` and scores it on
/// the held-out partition.
pub fn train(
    corpus: &Corpus,
    params: &ForestParams,
    test_fraction: f64,
) -> Result<(PredictorState, TrainingReport), PredictorError> {
    let encoder = LabelEncoder::fit(&corpus.labels);
    let targets: Vec<usize> = corpus
        .labels
        .iter()
        .map(|label| {
            encoder
                .transform(label)
                .ok_or_else(|| PredictorError::corpus(&corpus.source, format!("unknown label '{}'", label)))
        })
        .collect::<Result<_, _>>()?;

    let split = stratified_split(&targets, encoder.len(), test_fraction, params.seed);
    tracing::info!(
        rows = corpus.len(),
        classes = encoder.len(),
        train = split.train.len(),
        test = split.test.len(),
        n_trees = params.n_trees,
        "training random forest"
    );

    let x_train: Vec<Vec<f64>> = split.train.iter().map(|&i| corpus.rows[i].to_vec()).collect();
    let y_train: Vec<usize> = split.train.iter().map(|&i| targets[i]).collect();
    let forest = RandomForest::fit(&x_train, &y_train, encoder.len(), params)
        .map_err(|e| PredictorError::corpus(&corpus.source, e))?;

    let actual: Vec<usize> = split.test.iter().map(|&i| targets[i]).collect();
    let predicted: Vec<usize> = split
        .test
        .iter()
        .map(|&i| forest.predict(&corpus.rows[i]))
        .collect::<anyhow::Result<_>>()
        .map_err(|e| PredictorError::corpus(&corpus.source, e))?;
    let (accuracy, per_class) = evaluate(&actual, &predicted, &encoder);

    let feature_importances = Feature::ALL
        .iter()
        .zip(forest.feature_importances())
        .map(|(f, v)| (f.name().to_string(), *v))
        .collect();

    let model = ModelArtifact {
        format_version: FORMAT_VERSION,
        training_id: Uuid::new_v4().to_string(),
        created_at: Utc::now(),
        feature_names: feature_names(),
        params: *params,
        corpus_fingerprint: corpus.fingerprint.clone(),
        forest,
    };

    let report = TrainingReport {
        training_id: model.training_id.clone(),
        corpus_fingerprint: corpus.fingerprint.clone(),
        train_size: split.train.len(),
        test_size: split.test.len(),
        accuracy,
        per_class,
        feature_importances,
    };
    tracing::info!(
        training_id = %report.training_id,
        accuracy = report.accuracy,
        "training finished"
    );

    Ok((PredictorState::new(model, encoder), report))
}

/// Reads the corpus, trains, and persists the artifacts. A corpus or
/// training failure returns before anything is written, so existing
/// artifacts stay in place.
pub fn train_and_save(
    corpus_path: &Path,
    artifacts: &ArtifactSet,
    params: &ForestParams,
    test_fraction: f64,
) -> Result<(PredictorState, TrainingReport), PredictorError> {
    let corpus = Corpus::from_csv(corpus_path)?;
    let (state, report) = train(&corpus, params, test_fraction)?;
    artifacts.save(state.model(), state.encoder())?;
    Ok((state, report))
}

/// Accuracy plus per-class precision/recall/F1. A ratio with a zero
/// denominator is reported as 0.
fn evaluate(actual: &[usize], predicted: &[usize], encoder: &LabelEncoder) -> (f64, Vec<ClassMetrics>) {
    let n_classes = encoder.len();
    let mut true_pos = vec![0usize; n_classes];
    let mut predicted_count = vec![0usize; n_classes];
    let mut support = vec![0usize; n_classes];

    for (&a, &p) in actual.iter().zip(predicted) {
        support[a] += 1;
        predicted_count[p] += 1;
        if a == p {
            true_pos[a] += 1;
        }
    }

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    let correct: usize = true_pos.iter().sum();
    let accuracy = ratio(correct, actual.len());

    let per_class = encoder
        .classes()
        .iter()
        .enumerate()
        .map(|(c, crop)| {
            let precision = ratio(true_pos[c], predicted_count[c]);
            let recall = ratio(true_pos[c], support[c]);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                crop: crop.clone(),
                precision,
                recall,
                f1,
                support: support[c],
            }
        })
        .collect();

    (accuracy, per_class)
}
