//! Soil and weather feature model.
//!
//! A [`FeatureVector`] holds the seven measurements the classifier is
//! trained on. Their order is fixed by [`Feature::ALL`] and must match the
//! column order used at training time.

use serde::{Deserialize, Serialize};

use crate::error::PredictorError;

/// Number of input features.
pub const FEATURE_COUNT: usize = 7;

/// One of the seven soil/weather measurements, in training order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Nitrogen,
    Phosphorus,
    Potassium,
    Temperature,
    Humidity,
    Ph,
    Rainfall,
}

impl Feature {
    /// All features in training order.
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Nitrogen,
        Feature::Phosphorus,
        Feature::Potassium,
        Feature::Temperature,
        Feature::Humidity,
        Feature::Ph,
        Feature::Rainfall,
    ];

    /// Column name in the training CSV and field name on the wire.
    pub fn name(self) -> &'static str {
        match self {
            Feature::Nitrogen => "N",
            Feature::Phosphorus => "P",
            Feature::Potassium => "K",
            Feature::Temperature => "temperature",
            Feature::Humidity => "humidity",
            Feature::Ph => "ph",
            Feature::Rainfall => "rainfall",
        }
    }

    /// Position of this feature in a training row.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Inclusive range accepted at the API boundary.
    pub fn valid_range(self) -> (f64, f64) {
        match self {
            Feature::Nitrogen => (0.0, 300.0),
            Feature::Phosphorus => (0.0, 150.0),
            Feature::Potassium => (0.0, 100.0),
            Feature::Temperature => (-10.0, 50.0),
            Feature::Humidity => (0.0, 100.0),
            Feature::Ph => (3.0, 10.0),
            Feature::Rainfall => (0.0, 500.0),
        }
    }

    pub fn from_index(idx: usize) -> Option<Feature> {
        Feature::ALL.get(idx).copied()
    }
}

/// Names of all features in training order.
pub fn feature_names() -> Vec<String> {
    Feature::ALL.iter().map(|f| f.name().to_string()).collect()
}

/// Soil and weather measurements for one field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Nitrogen content in soil (kg/ha).
    #[serde(rename = "N")]
    pub n: f64,
    /// Phosphorus content in soil (kg/ha).
    #[serde(rename = "P")]
    pub p: f64,
    /// Potassium content in soil (kg/ha).
    #[serde(rename = "K")]
    pub k: f64,
    /// Average temperature (°C).
    pub temperature: f64,
    /// Relative humidity (%).
    pub humidity: f64,
    /// Soil pH.
    pub ph: f64,
    /// Rainfall (mm).
    pub rainfall: f64,
}

impl FeatureVector {
    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Nitrogen => self.n,
            Feature::Phosphorus => self.p,
            Feature::Potassium => self.k,
            Feature::Temperature => self.temperature,
            Feature::Humidity => self.humidity,
            Feature::Ph => self.ph,
            Feature::Rainfall => self.rainfall,
        }
    }

    /// Values in training order.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.n,
            self.p,
            self.k,
            self.temperature,
            self.humidity,
            self.ph,
            self.rainfall,
        ]
    }

    pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            n: values[0],
            p: values[1],
            k: values[2],
            temperature: values[3],
            humidity: values[4],
            ph: values[5],
            rainfall: values[6],
        }
    }

    /// Rejects NaN and infinite values.
    pub fn check_finite(&self) -> Result<(), PredictorError> {
        for feature in Feature::ALL {
            let value = self.get(feature);
            if !value.is_finite() {
                return Err(PredictorError::InvalidFeatures(format!(
                    "{} must be a finite number, got {}",
                    feature.name(),
                    value
                )));
            }
        }
        Ok(())
    }

    /// Checks every value against [`Feature::valid_range`] and reports the
    /// first violation.
    pub fn validate_ranges(&self) -> Result<(), String> {
        for feature in Feature::ALL {
            let value = self.get(feature);
            let (lo, hi) = feature.valid_range();
            if !value.is_finite() || value < lo || value > hi {
                return Err(format!(
                    "{} must be between {} and {}, got {}",
                    feature.name(),
                    lo,
                    hi,
                    value
                ));
            }
        }
        Ok(())
    }
}
