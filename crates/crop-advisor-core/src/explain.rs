//! Human-readable justification for a recommendation.
//!
//! The text is built from the two globally most important features and
//! the qualitative band the *input* value falls in for each. It does not
//! depend on which crop is being described, so every recommendation in a
//! single response carries the same reason.

use crate::features::{Feature, FeatureVector};

/// Qualitative band of a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    High,
    Low,
    Moderate,
}

/// `(high_above, low_below)` thresholds per feature.
fn thresholds(feature: Feature) -> (f64, f64) {
    match feature {
        Feature::Nitrogen => (80.0, 40.0),
        Feature::Phosphorus => (50.0, 20.0),
        Feature::Potassium => (40.0, 20.0),
        Feature::Temperature => (30.0, 20.0),
        Feature::Humidity => (70.0, 40.0),
        Feature::Ph => (7.5, 6.0),
        Feature::Rainfall => (200.0, 100.0),
    }
}

pub fn band(feature: Feature, value: f64) -> Band {
    let (high, low) = thresholds(feature);
    if value > high {
        Band::High
    } else if value < low {
        Band::Low
    } else {
        Band::Moderate
    }
}

pub fn phrase(feature: Feature, band: Band) -> &'static str {
    match (feature, band) {
        (Feature::Nitrogen, Band::High) => "high nitrogen content",
        (Feature::Nitrogen, Band::Low) => "low nitrogen requirement",
        (Feature::Nitrogen, Band::Moderate) => "moderate nitrogen levels",
        (Feature::Phosphorus, Band::High) => "high phosphorus availability",
        (Feature::Phosphorus, Band::Low) => "low phosphorus requirement",
        (Feature::Phosphorus, Band::Moderate) => "adequate phosphorus levels",
        (Feature::Potassium, Band::High) => "high potassium content",
        (Feature::Potassium, Band::Low) => "low potassium requirement",
        (Feature::Potassium, Band::Moderate) => "suitable potassium levels",
        (Feature::Temperature, Band::High) => "warm climate preference",
        (Feature::Temperature, Band::Low) => "cool climate suitability",
        (Feature::Temperature, Band::Moderate) => "moderate temperature range",
        (Feature::Humidity, Band::High) => "high humidity tolerance",
        (Feature::Humidity, Band::Low) => "low humidity adaptation",
        (Feature::Humidity, Band::Moderate) => "moderate humidity conditions",
        (Feature::Ph, Band::High) => "alkaline soil preference",
        (Feature::Ph, Band::Low) => "acidic soil tolerance",
        (Feature::Ph, Band::Moderate) => "neutral pH suitability",
        (Feature::Rainfall, Band::High) => "high rainfall requirement",
        (Feature::Rainfall, Band::Low) => "drought tolerance",
        (Feature::Rainfall, Band::Moderate) => "moderate water needs",
    }
}

/// The `count` features with the highest importance, most important first.
/// Equal importances keep training order.
pub fn top_features(importances: &[f64], count: usize) -> Vec<Feature> {
    let mut ranked: Vec<Feature> = Feature::ALL
        .iter()
        .copied()
        .filter(|f| f.index() < importances.len())
        .collect();
    ranked.sort_by(|a, b| importances[b.index()].total_cmp(&importances[a.index()]));
    ranked.truncate(count);
    ranked
}

/// `"Suitable due to <phrase> and <phrase>"` for the two most important features.
pub fn explain(features: &FeatureVector, importances: &[f64]) -> String {
    let reasons: Vec<&str> = top_features(importances, 2)
        .into_iter()
        .map(|f| phrase(f, band(f, features.get(f))))
        .collect();
    format!("Suitable due to {}", reasons.join(" and "))
}
