//! Persistent records for farms, soil reports, stored recommendations, and
//! feedback.
//!
//! Ids are UUID v4 strings assigned at construction; timestamps are UTC.
//! The `farm_id` on every record is the caller-chosen farm identifier,
//! not the farm's internal `id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::features::FeatureVector;
use crate::predictor::Recommendation;

/// A registered farm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Farm {
    pub id: String,
    pub farm_id: String,
    pub owner_name: String,
    pub location: String,
    pub area_hectares: f64,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when registering a farm.
#[derive(Debug, Clone, Deserialize)]
pub struct NewFarm {
    pub farm_id: String,
    pub owner_name: String,
    pub location: String,
    #[serde(alias = "area")]
    pub area_hectares: f64,
}

impl Farm {
    pub fn new(new: NewFarm) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            farm_id: new.farm_id,
            owner_name: new.owner_name,
            location: new.location,
            area_hectares: new.area_hectares,
            created_at: Utc::now(),
        }
    }
}

/// A laboratory soil test for one farm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilReport {
    pub id: String,
    pub farm_id: String,
    #[serde(rename = "N")]
    pub n: f64,
    #[serde(rename = "P")]
    pub p: f64,
    #[serde(rename = "K")]
    pub k: f64,
    pub ph: f64,
    pub organic_matter: Option<f64>,
    pub test_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSoilReport {
    #[serde(rename = "N")]
    pub n: f64,
    #[serde(rename = "P")]
    pub p: f64,
    #[serde(rename = "K")]
    pub k: f64,
    pub ph: f64,
    #[serde(default)]
    pub organic_matter: Option<f64>,
}

impl SoilReport {
    pub fn new(farm_id: &str, new: NewSoilReport) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            farm_id: farm_id.to_string(),
            n: new.n,
            p: new.p,
            k: new.k,
            ph: new.ph,
            organic_matter: new.organic_matter,
            test_date: Utc::now(),
        }
    }
}

/// A prediction stored against a farm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub id: String,
    pub farm_id: String,
    pub input: FeatureVector,
    pub recommendations: Vec<Recommendation>,
    pub season: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RecommendationRecord {
    pub fn new(farm_id: &str, input: FeatureVector, recommendations: Vec<Recommendation>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            farm_id: farm_id.to_string(),
            input,
            recommendations,
            season: None,
            created_at: Utc::now(),
        }
    }
}

/// A farmer's verdict on a recommended crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub farm_id: String,
    pub recommendation_id: Option<String>,
    pub crop: String,
    pub accepted: bool,
    /// 1 to 5 when given.
    pub rating: Option<u8>,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFeedback {
    pub farm_id: String,
    #[serde(default)]
    pub recommendation_id: Option<String>,
    pub crop: String,
    pub accepted: bool,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub comments: Option<String>,
}

impl Feedback {
    pub fn new(new: NewFeedback) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            farm_id: new.farm_id,
            recommendation_id: new.recommendation_id,
            crop: new.crop,
            accepted: new.accepted,
            rating: new.rating,
            comments: new.comments,
            created_at: Utc::now(),
        }
    }
}

/// Aggregate over a set of feedback records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackStats {
    pub total_feedback: u64,
    pub accepted_count: u64,
    /// Fraction in `[0, 1]`; 0 when there is no feedback.
    pub acceptance_rate: f64,
    /// Mean over rated feedback only.
    pub average_rating: Option<f64>,
    /// Distinct crops with feedback, sorted.
    pub crops: Vec<String>,
}

impl FeedbackStats {
    pub fn from_feedback<'a, I>(feedback: I) -> Self
    where
        I: IntoIterator<Item = &'a Feedback>,
    {
        let mut total = 0u64;
        let mut accepted = 0u64;
        let mut rating_sum = 0u64;
        let mut rated = 0u64;
        let mut crops = Vec::new();

        for fb in feedback {
            total += 1;
            if fb.accepted {
                accepted += 1;
            }
            if let Some(r) = fb.rating {
                rating_sum += u64::from(r);
                rated += 1;
            }
            crops.push(fb.crop.clone());
        }
        crops.sort();
        crops.dedup();

        Self {
            total_feedback: total,
            accepted_count: accepted,
            acceptance_rate: if total == 0 {
                0.0
            } else {
                accepted as f64 / total as f64
            },
            average_rating: if rated == 0 {
                None
            } else {
                Some(rating_sum as f64 / rated as f64)
            },
            crops,
        }
    }
}
