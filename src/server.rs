//! HTTP API server.
//!
//! Serves crop predictions, farm records, feedback, and the FAQ chatbot
//! as JSON over HTTP. The predictor is built once before the listener is
//! bound and shared read-only by every handler.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Service info and endpoint map |
//! | `GET`  | `/health` | Liveness check (returns version) |
//! | `POST` | `/api/predict` | Top-3 crops plus field analysis; `?farm_id=` stores the result |
//! | `GET`  | `/api/predict/health` | Runs a sample prediction |
//! | `POST` | `/api/feedback` | Record a verdict on a recommended crop |
//! | `GET`  | `/api/feedback/stats` | Feedback aggregate, optionally `?crop=` |
//! | `GET`  | `/api/recommendation/{farm_id}` | Latest stored recommendation |
//! | `GET`  | `/api/recommendation/{farm_id}/history` | Newest-first, `?limit=` 1 to 50 |
//! | `POST` | `/api/farms` | Register a farm |
//! | `GET`  | `/api/farms/{farm_id}` | Farm details |
//! | `POST` | `/api/farms/{farm_id}/soil-report` | Add a soil test |
//! | `GET`  | `/api/farms/{farm_id}/soil-report/latest` | Latest soil test |
//! | `GET`  | `/api/farms/{farm_id}/profile` | Farm plus latest records and feedback |
//! | `POST` | `/api/chatbot` | Answer a farming question |
//! | `GET`  | `/api/chatbot/topics` | Topics the chatbot knows |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "ph must be between 3 and 10, got 15" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `conflict` (409),
//! `model_unavailable` (503), `internal` (500).

use anyhow::Context;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crop_advisor_core::assess::{Assessment, RiskLevel, SoilHealth, WeatherSuitability};
use crop_advisor_core::knowledge::{self, ChatReply, Topics};
use crop_advisor_core::models::{
    Farm, Feedback, FeedbackStats, NewFarm, NewFeedback, NewSoilReport, RecommendationRecord,
    SoilReport,
};
use crop_advisor_core::store::{Store, StoreError};
use crop_advisor_core::{FeatureVector, PredictorError, PredictorState, Recommendation};

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

const SERVICE_NAME: &str = "crop-advisor";
const DEFAULT_HISTORY_LIMIT: usize = 10;
const MAX_HISTORY_LIMIT: usize = 50;

/// Input used by `GET /api/predict/health`.
const HEALTH_CHECK_INPUT: FeatureVector = FeatureVector {
    n: 90.0,
    p: 42.0,
    k: 43.0,
    temperature: 25.0,
    humidity: 80.0,
    ph: 6.5,
    rainfall: 200.0,
};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<PredictorState>,
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
}

/// Builds the API router without binding it. Used by [`run_server`] and
/// by tests that serve it on an ephemeral port.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api/predict", post(handle_predict))
        .route("/api/predict/health", get(handle_predict_health))
        .route("/api/feedback", post(handle_create_feedback))
        .route("/api/feedback/stats", get(handle_feedback_stats))
        .route("/api/recommendation/{farm_id}", get(handle_latest_recommendation))
        .route(
            "/api/recommendation/{farm_id}/history",
            get(handle_recommendation_history),
        )
        .route("/api/farms", post(handle_create_farm))
        .route("/api/farms/{farm_id}", get(handle_get_farm))
        .route("/api/farms/{farm_id}/soil-report", post(handle_create_soil_report))
        .route(
            "/api/farms/{farm_id}/soil-report/latest",
            get(handle_latest_soil_report),
        )
        .route("/api/farms/{farm_id}/profile", get(handle_farm_profile))
        .route("/api/chatbot", post(handle_chatbot))
        .route("/api/chatbot/topics", get(handle_chatbot_topics))
        .with_state(state)
}

/// Starts the HTTP server.
///
/// Loads or trains the model first; if neither works the server never
/// binds and the error is returned. Then opens the database, applies
/// migrations, and serves on `[server].bind` until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let config = Arc::new(config.clone());

    let model_config = config.model.clone();
    let predictor = tokio::task::spawn_blocking(move || {
        PredictorState::initialize(
            &model_config.artifact_dir,
            &model_config.corpus_path,
            &model_config.forest_params(),
            model_config.test_fraction,
        )
    })
    .await
    .context("predictor initialisation panicked")??;
    tracing::info!(
        training_id = %predictor.training_id(),
        classes = predictor.classes().len(),
        "predictor ready"
    );

    let pool = db::connect(&config).await?;
    migrate::apply(&pool).await?;

    let cors = cors_layer(&config.server.cors_origins)?;
    let state = AppState {
        predictor: Arc::new(predictor),
        store: Arc::new(SqliteStore::new(pool)),
        config,
    };
    let app = router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    tracing::info!(addr = %bind_addr, "listening");
    println!("Crop Advisor API listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// An empty origin list allows any origin.
fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let values = origins
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .with_context(|| format!("Invalid CORS origin: {}", o))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        AllowOrigin::list(values)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn app_error(status: StatusCode, code: &str, message: impl Into<String>) -> AppError {
    AppError {
        status,
        code: code.to_string(),
        message: message.into(),
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    app_error(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn not_found(message: impl Into<String>) -> AppError {
    app_error(StatusCode::NOT_FOUND, "not_found", message)
}

fn conflict(message: impl Into<String>) -> AppError {
    app_error(StatusCode::CONFLICT, "conflict", message)
}

fn internal(message: impl Into<String>) -> AppError {
    app_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => conflict(msg),
            StoreError::Backend(e) => {
                tracing::error!(error = %e, "storage failure");
                internal("storage failure")
            }
        }
    }
}

impl From<PredictorError> for AppError {
    fn from(err: PredictorError) -> Self {
        match err {
            PredictorError::InvalidFeatures(msg) => bad_request(msg),
            PredictorError::ModelUnavailable { .. } | PredictorError::ArtifactLoad { .. } => {
                app_error(StatusCode::SERVICE_UNAVAILABLE, "model_unavailable", err.to_string())
            }
            other => {
                tracing::error!(error = %other, kind = other.kind(), "prediction failed");
                internal(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(bad_request(format!("{} must not be empty", field)));
    }
    Ok(())
}

// ============ GET / and GET /health ============

async fn handle_root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Crop Advisor API",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "predict": "/api/predict",
            "feedback": "/api/feedback",
            "recommendations": "/api/recommendation/{farm_id}",
            "farms": "/api/farms",
            "chatbot": "/api/chatbot",
            "health": "/health"
        }
    }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/predict ============

#[derive(Deserialize)]
struct PredictQuery {
    farm_id: Option<String>,
    season: Option<String>,
}

#[derive(Serialize)]
struct Analysis {
    soil_health: SoilHealth,
    weather_suitability: WeatherSuitability,
    risk_level: RiskLevel,
    recommendations_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    recommendation_id: Option<String>,
}

#[derive(Serialize)]
struct PredictResponse {
    recommendations: Vec<Recommendation>,
    analysis: Analysis,
}

/// Ranks crops for one soil/weather reading. When `farm_id` is given the
/// result is stored; a storage failure is logged and the prediction is
/// still returned, just without `recommendation_id`.
async fn handle_predict(
    State(state): State<AppState>,
    query: Result<Query<PredictQuery>, QueryRejection>,
    payload: Result<Json<FeatureVector>, JsonRejection>,
) -> Result<Json<PredictResponse>, AppError> {
    let Query(query) = query?;
    let Json(input) = payload?;
    input.validate_ranges().map_err(bad_request)?;

    let recommendations = state.predictor.predict(&input)?;
    let assessment = Assessment::of(&input);

    let mut recommendation_id = None;
    if let Some(farm_id) = query.farm_id.filter(|f| !f.trim().is_empty()) {
        let mut record = RecommendationRecord::new(&farm_id, input, recommendations.clone());
        record.season = query.season;
        match state.store.create_recommendation(&record).await {
            Ok(()) => recommendation_id = Some(record.id),
            Err(e) => tracing::warn!(farm_id = %farm_id, error = %e, "failed to store recommendation"),
        }
    }

    Ok(Json(PredictResponse {
        analysis: Analysis {
            soil_health: assessment.soil_health,
            weather_suitability: assessment.weather_suitability,
            risk_level: assessment.risk_level,
            recommendations_count: recommendations.len(),
            recommendation_id,
        },
        recommendations,
    }))
}

// ============ GET /api/predict/health ============

async fn handle_predict_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let timestamp = Utc::now().to_rfc3339();
    match state.predictor.predict(&HEALTH_CHECK_INPUT) {
        Ok(recs) => Json(serde_json::json!({
            "status": "healthy",
            "model_loaded": true,
            "training_id": state.predictor.training_id(),
            "classes": state.predictor.classes().len(),
            "artifact_dir": state.config.model.artifact_dir,
            "test_prediction_count": recs.len(),
            "timestamp": timestamp,
        })),
        Err(e) => {
            tracing::error!(error = %e, "health check prediction failed");
            Json(serde_json::json!({
                "status": "unhealthy",
                "model_loaded": true,
                "error": e.to_string(),
                "timestamp": timestamp,
            }))
        }
    }
}

// ============ Feedback ============

#[derive(Serialize)]
struct FeedbackCreated {
    message: String,
    feedback_id: String,
}

async fn handle_create_feedback(
    State(state): State<AppState>,
    payload: Result<Json<NewFeedback>, JsonRejection>,
) -> Result<Json<FeedbackCreated>, AppError> {
    let Json(new) = payload?;
    require_non_empty("farm_id", &new.farm_id)?;
    require_non_empty("crop", &new.crop)?;
    if let Some(rating) = new.rating {
        if !(1..=5).contains(&rating) {
            return Err(bad_request(format!("rating must be between 1 and 5, got {}", rating)));
        }
    }

    let feedback = Feedback::new(new);
    state.store.create_feedback(&feedback).await?;
    tracing::info!(farm_id = %feedback.farm_id, crop = %feedback.crop, "feedback recorded");

    Ok(Json(FeedbackCreated {
        message: "Feedback saved successfully".to_string(),
        feedback_id: feedback.id,
    }))
}

#[derive(Deserialize)]
struct StatsQuery {
    crop: Option<String>,
}

/// Feedback aggregate as served over HTTP: rates are percentages and
/// averages are rounded to two decimals.
#[derive(Serialize)]
struct FeedbackStatsResponse {
    total_feedback: u64,
    accepted_count: u64,
    acceptance_rate: f64,
    average_rating: Option<f64>,
    crops_with_feedback: Vec<String>,
    filtered_by_crop: Option<String>,
}

impl FeedbackStatsResponse {
    fn new(stats: FeedbackStats, crop: Option<String>) -> Self {
        Self {
            total_feedback: stats.total_feedback,
            accepted_count: stats.accepted_count,
            acceptance_rate: round2(stats.acceptance_rate * 100.0),
            average_rating: stats.average_rating.map(round2),
            crops_with_feedback: stats.crops,
            filtered_by_crop: crop,
        }
    }
}

async fn handle_feedback_stats(
    State(state): State<AppState>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> Result<Json<FeedbackStatsResponse>, AppError> {
    let Query(query) = query?;
    let crop = query.crop.filter(|c| !c.trim().is_empty());
    let stats = state.store.feedback_stats(crop.as_deref()).await?;
    Ok(Json(FeedbackStatsResponse::new(stats, crop)))
}

// ============ Stored recommendations ============

async fn handle_latest_recommendation(
    State(state): State<AppState>,
    Path(farm_id): Path<String>,
) -> Result<Json<RecommendationRecord>, AppError> {
    state
        .store
        .latest_recommendation(&farm_id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(format!("No recommendations found for farm {}", farm_id)))
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct HistoryResponse {
    farm_id: String,
    recommendations: Vec<RecommendationRecord>,
    total_count: usize,
}

async fn handle_recommendation_history(
    State(state): State<AppState>,
    Path(farm_id): Path<String>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryResponse>, AppError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(bad_request(format!(
            "limit must be between 1 and {}, got {}",
            MAX_HISTORY_LIMIT, limit
        )));
    }

    let recommendations = state.store.recommendation_history(&farm_id, limit).await?;
    Ok(Json(HistoryResponse {
        total_count: recommendations.len(),
        farm_id,
        recommendations,
    }))
}

// ============ Farms ============

#[derive(Serialize)]
struct FarmCreated {
    message: String,
    farm_id: String,
    record_id: String,
}

async fn handle_create_farm(
    State(state): State<AppState>,
    payload: Result<Json<NewFarm>, JsonRejection>,
) -> Result<(StatusCode, Json<FarmCreated>), AppError> {
    let Json(new) = payload?;
    require_non_empty("farm_id", &new.farm_id)?;
    if !new.area_hectares.is_finite() || new.area_hectares <= 0.0 {
        return Err(bad_request(format!(
            "area_hectares must be a positive number, got {}",
            new.area_hectares
        )));
    }

    let farm = Farm::new(new);
    state.store.create_farm(&farm).await?;
    tracing::info!(farm_id = %farm.farm_id, "farm created");

    Ok((
        StatusCode::CREATED,
        Json(FarmCreated {
            message: "Farm created successfully".to_string(),
            farm_id: farm.farm_id,
            record_id: farm.id,
        }),
    ))
}

async fn find_farm(state: &AppState, farm_id: &str) -> Result<Farm, AppError> {
    state
        .store
        .get_farm(farm_id)
        .await?
        .ok_or_else(|| not_found(format!("Farm {} not found", farm_id)))
}

async fn handle_get_farm(
    State(state): State<AppState>,
    Path(farm_id): Path<String>,
) -> Result<Json<Farm>, AppError> {
    Ok(Json(find_farm(&state, &farm_id).await?))
}

#[derive(Serialize)]
struct SoilReportCreated {
    message: String,
    farm_id: String,
    report_id: String,
}

fn validate_soil_report(new: &NewSoilReport) -> Result<(), AppError> {
    for (name, value) in [("N", new.n), ("P", new.p), ("K", new.k)] {
        if !value.is_finite() || value < 0.0 {
            return Err(bad_request(format!("{} must be a non-negative number, got {}", name, value)));
        }
    }
    if !new.ph.is_finite() || !(0.0..=14.0).contains(&new.ph) {
        return Err(bad_request(format!("ph must be between 0 and 14, got {}", new.ph)));
    }
    if let Some(om) = new.organic_matter {
        if !om.is_finite() || om < 0.0 {
            return Err(bad_request(format!(
                "organic_matter must be a non-negative number, got {}",
                om
            )));
        }
    }
    Ok(())
}

async fn handle_create_soil_report(
    State(state): State<AppState>,
    Path(farm_id): Path<String>,
    payload: Result<Json<NewSoilReport>, JsonRejection>,
) -> Result<(StatusCode, Json<SoilReportCreated>), AppError> {
    let Json(new) = payload?;
    validate_soil_report(&new)?;
    find_farm(&state, &farm_id).await?;

    let report = SoilReport::new(&farm_id, new);
    state.store.create_soil_report(&report).await?;
    tracing::info!(farm_id = %farm_id, "soil report created");

    Ok((
        StatusCode::CREATED,
        Json(SoilReportCreated {
            message: "Soil report created successfully".to_string(),
            farm_id,
            report_id: report.id,
        }),
    ))
}

async fn handle_latest_soil_report(
    State(state): State<AppState>,
    Path(farm_id): Path<String>,
) -> Result<Json<SoilReport>, AppError> {
    state
        .store
        .latest_soil_report(&farm_id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(format!("No soil reports found for farm {}", farm_id)))
}

#[derive(Serialize)]
struct FarmProfile {
    farm_details: Farm,
    latest_soil_report: Option<SoilReport>,
    latest_recommendation: Option<RecommendationRecord>,
    has_soil_data: bool,
    has_recommendations: bool,
    /// Aggregated over all farms.
    feedback_stats: FeedbackStatsResponse,
}

async fn handle_farm_profile(
    State(state): State<AppState>,
    Path(farm_id): Path<String>,
) -> Result<Json<FarmProfile>, AppError> {
    let farm = find_farm(&state, &farm_id).await?;
    let latest_soil_report = state.store.latest_soil_report(&farm_id).await?;
    let latest_recommendation = state.store.latest_recommendation(&farm_id).await?;
    let stats = state.store.feedback_stats(None).await?;

    Ok(Json(FarmProfile {
        farm_details: farm,
        has_soil_data: latest_soil_report.is_some(),
        has_recommendations: latest_recommendation.is_some(),
        latest_soil_report,
        latest_recommendation,
        feedback_stats: FeedbackStatsResponse::new(stats, None),
    }))
}

// ============ Chatbot ============

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    #[serde(flatten)]
    reply: ChatReply,
    timestamp: String,
}

async fn handle_chatbot(
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) = payload?;
    let reply = knowledge::answer(&request.message).map_err(|e| bad_request(e.to_string()))?;
    Ok(Json(ChatResponse {
        reply,
        timestamp: Utc::now().to_rfc3339(),
    }))
}

async fn handle_chatbot_topics() -> Json<Topics> {
    Json(knowledge::topics())
}
