//! Rule-based field assessments computed straight from the raw input.
//!
//! These are independent of the classifier and are attached to
//! prediction responses by the serving layer.

use serde::Serialize;

use crate::features::FeatureVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SoilHealth {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WeatherSuitability {
    Excellent,
    Good,
    Moderate,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    #[serde(rename = "Very Low")]
    VeryLow,
    Low,
    Medium,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl SoilHealth {
    pub fn as_str(self) -> &'static str {
        match self {
            SoilHealth::Excellent => "Excellent",
            SoilHealth::Good => "Good",
            SoilHealth::Fair => "Fair",
            SoilHealth::Poor => "Poor",
        }
    }
}

impl WeatherSuitability {
    pub fn as_str(self) -> &'static str {
        match self {
            WeatherSuitability::Excellent => "Excellent",
            WeatherSuitability::Good => "Good",
            WeatherSuitability::Moderate => "Moderate",
            WeatherSuitability::Poor => "Poor",
        }
    }
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "Very Low",
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::VeryHigh => "Very High",
        }
    }
}

fn within(value: f64, lo: f64, hi: f64) -> bool {
    (lo..=hi).contains(&value)
}

/// Share of N, P, K and pH that sit in their optimal ranges.
pub fn soil_health(f: &FeatureVector) -> SoilHealth {
    let checks = [
        within(f.n, 40.0, 120.0),
        within(f.p, 20.0, 60.0),
        within(f.k, 20.0, 60.0),
        within(f.ph, 6.0, 7.5),
    ];
    let score = checks.iter().filter(|ok| **ok).count() as f64;
    let percentage = score / checks.len() as f64 * 100.0;

    if percentage >= 80.0 {
        SoilHealth::Excellent
    } else if percentage >= 60.0 {
        SoilHealth::Good
    } else if percentage >= 40.0 {
        SoilHealth::Fair
    } else {
        SoilHealth::Poor
    }
}

/// Full point inside the optimal range, half a point inside the tolerable one.
fn graded(value: f64, optimal: (f64, f64), tolerable: (f64, f64)) -> f64 {
    if within(value, optimal.0, optimal.1) {
        1.0
    } else if within(value, tolerable.0, tolerable.1) {
        0.5
    } else {
        0.0
    }
}

pub fn weather_suitability(f: &FeatureVector) -> WeatherSuitability {
    let score = graded(f.temperature, (20.0, 30.0), (15.0, 35.0))
        + graded(f.humidity, (50.0, 80.0), (40.0, 90.0))
        + graded(f.rainfall, (100.0, 300.0), (50.0, 400.0));
    let percentage = score / 3.0 * 100.0;

    if percentage >= 80.0 {
        WeatherSuitability::Excellent
    } else if percentage >= 60.0 {
        WeatherSuitability::Good
    } else if percentage >= 40.0 {
        WeatherSuitability::Moderate
    } else {
        WeatherSuitability::Poor
    }
}

pub fn risk_level(soil: SoilHealth, weather: WeatherSuitability) -> RiskLevel {
    use RiskLevel::*;
    use WeatherSuitability as W;

    match (soil, weather) {
        (SoilHealth::Excellent, W::Excellent) => VeryLow,
        (SoilHealth::Excellent, W::Good) => Low,
        (SoilHealth::Excellent, W::Moderate) => Low,
        (SoilHealth::Excellent, W::Poor) => Medium,
        (SoilHealth::Good, W::Excellent) => Low,
        (SoilHealth::Good, W::Good) => Low,
        (SoilHealth::Good, W::Moderate) => Medium,
        (SoilHealth::Good, W::Poor) => Medium,
        (SoilHealth::Fair, W::Excellent) => Medium,
        (SoilHealth::Fair, W::Good) => Medium,
        (SoilHealth::Fair, W::Moderate) => Medium,
        (SoilHealth::Fair, W::Poor) => High,
        (SoilHealth::Poor, W::Excellent) => Medium,
        (SoilHealth::Poor, W::Good) => High,
        (SoilHealth::Poor, W::Moderate) => High,
        (SoilHealth::Poor, W::Poor) => VeryHigh,
    }
}

/// All three assessments for one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Assessment {
    pub soil_health: SoilHealth,
    pub weather_suitability: WeatherSuitability,
    pub risk_level: RiskLevel,
}

impl Assessment {
    pub fn of(features: &FeatureVector) -> Self {
        let soil = soil_health(features);
        let weather = weather_suitability(features);
        Self {
            soil_health: soil,
            weather_suitability: weather,
            risk_level: risk_level(soil, weather),
        }
    }
}
