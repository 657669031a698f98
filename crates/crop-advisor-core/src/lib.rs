//! # Crop Advisor Core
//!
//! Pure logic for Crop Advisor: the soil/weather feature model, label
//! encoding, corpus loading, a seeded random forest, persisted artifacts,
//! the predictor with its explanation text, derived field assessments,
//! persistence record types with the [`store::Store`] trait, and the
//! static FAQ knowledge base.
//!
//! This crate contains no tokio, sqlx, or HTTP dependencies. The serving
//! application wires it to SQLite and axum.

pub mod artifact;
pub mod assess;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod explain;
pub mod features;
pub mod forest;
pub mod knowledge;
pub mod models;
pub mod predictor;
pub mod store;
pub mod train;

pub use error::PredictorError;
pub use features::{Feature, FeatureVector};
pub use predictor::{PredictorState, Recommendation};
