//! In-memory [`Store`] implementation for tests.
//!
//! Each collection is a `Vec` in insertion order behind `std::sync::RwLock`.

use std::sync::RwLock;

use anyhow::anyhow;
use async_trait::async_trait;

use crate::models::{Farm, Feedback, FeedbackStats, RecommendationRecord, SoilReport};

use super::{Store, StoreError, StoreResult};

pub struct InMemoryStore {
    farms: RwLock<Vec<Farm>>,
    soil_reports: RwLock<Vec<SoilReport>>,
    recommendations: RwLock<Vec<RecommendationRecord>>,
    feedback: RwLock<Vec<Feedback>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            farms: RwLock::new(Vec::new()),
            soil_reports: RwLock::new(Vec::new()),
            recommendations: RwLock::new(Vec::new()),
            feedback: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend(anyhow!("store lock poisoned"))
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_farm(&self, farm: &Farm) -> StoreResult<()> {
        let mut farms = self.farms.write().map_err(|_| poisoned())?;
        if farms.iter().any(|f| f.farm_id == farm.farm_id) {
            return Err(StoreError::Conflict(format!(
                "farm {} already exists",
                farm.farm_id
            )));
        }
        farms.push(farm.clone());
        Ok(())
    }

    async fn get_farm(&self, farm_id: &str) -> StoreResult<Option<Farm>> {
        let farms = self.farms.read().map_err(|_| poisoned())?;
        Ok(farms.iter().find(|f| f.farm_id == farm_id).cloned())
    }

    async fn create_soil_report(&self, report: &SoilReport) -> StoreResult<()> {
        let mut reports = self.soil_reports.write().map_err(|_| poisoned())?;
        reports.push(report.clone());
        Ok(())
    }

    async fn latest_soil_report(&self, farm_id: &str) -> StoreResult<Option<SoilReport>> {
        let reports = self.soil_reports.read().map_err(|_| poisoned())?;
        // max_by_key keeps the last of equal maxima, i.e. the newest insert
        Ok(reports
            .iter()
            .filter(|r| r.farm_id == farm_id)
            .max_by_key(|r| r.test_date)
            .cloned())
    }

    async fn create_recommendation(&self, record: &RecommendationRecord) -> StoreResult<()> {
        let mut recs = self.recommendations.write().map_err(|_| poisoned())?;
        recs.push(record.clone());
        Ok(())
    }

    async fn latest_recommendation(&self, farm_id: &str) -> StoreResult<Option<RecommendationRecord>> {
        let recs = self.recommendations.read().map_err(|_| poisoned())?;
        Ok(recs
            .iter()
            .filter(|r| r.farm_id == farm_id)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn recommendation_history(
        &self,
        farm_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<RecommendationRecord>> {
        let recs = self.recommendations.read().map_err(|_| poisoned())?;
        let mut history: Vec<RecommendationRecord> = recs
            .iter()
            .rev()
            .filter(|r| r.farm_id == farm_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        history.truncate(limit);
        Ok(history)
    }

    async fn create_feedback(&self, feedback: &Feedback) -> StoreResult<()> {
        let mut all = self.feedback.write().map_err(|_| poisoned())?;
        all.push(feedback.clone());
        Ok(())
    }

    async fn feedback_stats(&self, crop: Option<&str>) -> StoreResult<FeedbackStats> {
        let all = self.feedback.read().map_err(|_| poisoned())?;
        Ok(FeedbackStats::from_feedback(
            all.iter().filter(|f| crop.map_or(true, |c| f.crop == c)),
        ))
    }
}
