//! `crop train`: fit a forest on the labelled corpus and persist it.

use std::path::Path;

use anyhow::{Context, Result};

use crop_advisor_core::artifact::ArtifactSet;
use crop_advisor_core::train::{train_and_save, TrainingReport};

use crate::config::Config;

/// Trains from `corpus` (or the configured corpus) and writes the model
/// and encoder into the configured artifact directory.
pub fn run_train(config: &Config, corpus: Option<&Path>) -> Result<TrainingReport> {
    let corpus_path = corpus.unwrap_or(&config.model.corpus_path);
    let artifacts = ArtifactSet::new(&config.model.artifact_dir);

    let (_, report) = train_and_save(
        corpus_path,
        &artifacts,
        &config.model.forest_params(),
        config.model.test_fraction,
    )
    .with_context(|| format!("Training from {} failed", corpus_path.display()))?;

    print_report(&report, &artifacts);
    Ok(report)
}

fn print_report(report: &TrainingReport, artifacts: &ArtifactSet) {
    println!("Model trained successfully.");
    println!("  training_id:  {}", report.training_id);
    println!("  corpus:       {}", report.corpus_fingerprint);
    println!("  train rows:   {}", report.train_size);
    println!("  test rows:    {}", report.test_size);
    println!("  accuracy:     {:.4}", report.accuracy);
    println!("  artifacts:    {}", artifacts.dir().display());
    println!();

    println!("{:<14} {:>9} {:>9} {:>9} {:>8}", "crop", "precision", "recall", "f1", "support");
    for class in &report.per_class {
        println!(
            "{:<14} {:>9.3} {:>9.3} {:>9.3} {:>8}",
            class.crop, class.precision, class.recall, class.f1, class.support
        );
    }
    println!();

    println!("Feature importances:");
    for (name, importance) in &report.feature_importances {
        println!("  {:<12} {:.4}", name, importance);
    }
}
