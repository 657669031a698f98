//! `crop predict`: one-off recommendation from the command line.

use anyhow::{bail, Result};

use crop_advisor_core::assess::Assessment;
use crop_advisor_core::{FeatureVector, PredictorState};

use crate::config::Config;

/// Loads (or trains) the model, then prints the ranked crops and the
/// derived field assessment for `input`.
pub fn run_predict(config: &Config, input: &FeatureVector) -> Result<()> {
    if let Err(msg) = input.validate_ranges() {
        bail!("Invalid input: {}", msg);
    }

    let state = PredictorState::initialize(
        &config.model.artifact_dir,
        &config.model.corpus_path,
        &config.model.forest_params(),
        config.model.test_fraction,
    )?;
    let recommendations = state.predict(input)?;
    let assessment = Assessment::of(input);

    println!("Recommended crops:");
    for (rank, rec) in recommendations.iter().enumerate() {
        println!("  {}. {:<12} {:.4}", rank + 1, rec.crop, rec.score);
    }
    if let Some(first) = recommendations.first() {
        println!();
        println!("{}", first.reason);
    }
    println!();
    println!("Soil health:          {}", assessment.soil_health.as_str());
    println!("Weather suitability:  {}", assessment.weather_suitability.as_str());
    println!("Risk level:           {}", assessment.risk_level.as_str());

    Ok(())
}
