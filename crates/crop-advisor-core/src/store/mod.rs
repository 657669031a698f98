//! Storage abstraction for farm records.
//!
//! The [`Store`] trait covers every persistence operation the serving
//! layer needs. The SQLite backend lives in the application crate;
//! [`memory::InMemoryStore`] backs tests.
//!
//! Implementations must be `Send + Sync` to be shared across request
//! handlers.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Farm, Feedback, FeedbackStats, RecommendationRecord, SoilReport};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same unique key already exists.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Abstract storage backend.
///
/// "Latest" means greatest timestamp; records with equal timestamps are
/// ordered by insertion, newest last.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create_farm`](Store::create_farm) | Register a farm, unique by `farm_id` |
/// | [`get_farm`](Store::get_farm) | Look a farm up by `farm_id` |
/// | [`create_soil_report`](Store::create_soil_report) | Append a soil test |
/// | [`latest_soil_report`](Store::latest_soil_report) | Most recent soil test |
/// | [`create_recommendation`](Store::create_recommendation) | Append a stored prediction |
/// | [`latest_recommendation`](Store::latest_recommendation) | Most recent stored prediction |
/// | [`recommendation_history`](Store::recommendation_history) | Newest-first stored predictions |
/// | [`create_feedback`](Store::create_feedback) | Append feedback |
/// | [`feedback_stats`](Store::feedback_stats) | Aggregate feedback, optionally for one crop |
#[async_trait]
pub trait Store: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when `farm.farm_id` is taken.
    async fn create_farm(&self, farm: &Farm) -> StoreResult<()>;

    async fn get_farm(&self, farm_id: &str) -> StoreResult<Option<Farm>>;

    async fn create_soil_report(&self, report: &SoilReport) -> StoreResult<()>;

    async fn latest_soil_report(&self, farm_id: &str) -> StoreResult<Option<SoilReport>>;

    async fn create_recommendation(&self, record: &RecommendationRecord) -> StoreResult<()>;

    async fn latest_recommendation(&self, farm_id: &str) -> StoreResult<Option<RecommendationRecord>>;

    async fn recommendation_history(
        &self,
        farm_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<RecommendationRecord>>;

    async fn create_feedback(&self, feedback: &Feedback) -> StoreResult<()>;

    async fn feedback_stats(&self, crop: Option<&str>) -> StoreResult<FeedbackStats>;
}
