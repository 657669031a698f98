//! HTTP API tests against a router served on an ephemeral port.

mod common;

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

use crop_advisor::config::Config;
use crop_advisor::server::{router, AppState};
use crop_advisor::sqlite_store::SqliteStore;
use crop_advisor::{db, migrate};
use crop_advisor_core::dataset::Corpus;
use crop_advisor_core::train::train;

use common::{config_toml, write_corpus, RICE_READING};

struct TestApp {
    _tmp: TempDir,
    base: String,
    client: Client,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }
}

async fn spawn_app() -> TestApp {
    let tmp = TempDir::new().unwrap();
    let corpus = write_corpus(tmp.path());
    let config: Config = toml::from_str(&config_toml(tmp.path(), &corpus)).unwrap();

    let (predictor, _) = train(
        &Corpus::from_csv(&corpus).unwrap(),
        &config.model.forest_params(),
        config.model.test_fraction,
    )
    .unwrap();

    let pool = db::connect(&config).await.unwrap();
    migrate::apply(&pool).await.unwrap();

    let state = AppState {
        predictor: Arc::new(predictor),
        store: Arc::new(SqliteStore::new(pool)),
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });

    TestApp {
        _tmp: tmp,
        base: format!("http://{}", addr),
        client: Client::new(),
    }
}

fn rice_reading() -> Value {
    let [n, p, k, temperature, humidity, ph, rainfall] = RICE_READING;
    json!({
        "N": n, "P": p, "K": k,
        "temperature": temperature, "humidity": humidity,
        "ph": ph, "rainfall": rainfall
    })
}

async fn create_farm(app: &TestApp, farm_id: &str) -> (StatusCode, Value) {
    app.post(
        "/api/farms",
        json!({
            "farm_id": farm_id,
            "owner_name": "Asha",
            "location": "Nashik",
            "area_hectares": 2.5
        }),
    )
    .await
}

#[tokio::test]
async fn test_health_and_root() {
    let app = spawn_app().await;

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "crop-advisor");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoints"]["predict"], "/api/predict");
}

#[tokio::test]
async fn test_predict_returns_ranked_crops_with_analysis() {
    let app = spawn_app().await;

    let (status, body) = app.post("/api/predict", rice_reading()).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let recs = body["recommendations"].as_array().unwrap();
    assert!(!recs.is_empty() && recs.len() <= 3);
    assert_eq!(recs[0]["crop"], "rice");
    let scores: Vec<f64> = recs.iter().map(|r| r["score"].as_f64().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert!(recs.iter().all(|r| r["reason"] == recs[0]["reason"]));

    let analysis = &body["analysis"];
    assert_eq!(analysis["recommendations_count"], recs.len());
    assert!(analysis["soil_health"].is_string());
    assert!(analysis["weather_suitability"].is_string());
    assert!(analysis["risk_level"].is_string());
    assert!(analysis.get("recommendation_id").is_none());
}

#[tokio::test]
async fn test_predict_rejects_bad_input() {
    let app = spawn_app().await;

    let mut body = rice_reading();
    body["ph"] = json!(11.5);
    let (status, body) = app.post("/api/predict", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(body["error"]["message"].as_str().unwrap().contains("ph"));

    let (status, body) = app.post("/api/predict", json!({ "N": 90 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_out_of_range_message_matches_error_contract() {
    let app = spawn_app().await;

    let mut body = rice_reading();
    body["ph"] = json!(15);
    let (status, body) = app.post("/api/predict", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": { "code": "bad_request", "message": "ph must be between 3 and 10, got 15" } })
    );
}

#[tokio::test]
async fn test_predict_health_runs_sample_prediction() {
    let app = spawn_app().await;

    let (status, body) = app.get("/api/predict/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_loaded"], true);
    assert!(body["training_id"].is_string());
    assert!(body["test_prediction_count"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn test_stored_recommendations_and_history() {
    let app = spawn_app().await;

    let (status, _) = app.get("/api/recommendation/farm_1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut ids = Vec::new();
    for _ in 0..3 {
        let (status, body) = app.post("/api/predict?farm_id=farm_1", rice_reading()).await;
        assert_eq!(status, StatusCode::OK);
        ids.push(body["analysis"]["recommendation_id"].as_str().unwrap().to_string());
    }

    let (status, latest) = app.get("/api/recommendation/farm_1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["id"], ids[2]);
    assert_eq!(latest["farm_id"], "farm_1");
    assert_eq!(latest["recommendations"][0]["crop"], "rice");

    let (status, history) = app.get("/api/recommendation/farm_1/history?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["farm_id"], "farm_1");
    assert_eq!(history["total_count"], 2);
    let got: Vec<&str> = history["recommendations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(got, vec![ids[2].as_str(), ids[1].as_str()]);

    let (_, history) = app.get("/api/recommendation/farm_1/history").await;
    assert_eq!(history["total_count"], 3);

    for limit in ["0", "51", "many"] {
        let (status, body) = app
            .get(&format!("/api/recommendation/farm_1/history?limit={}", limit))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "limit={}", limit);
        assert_eq!(body["error"]["code"], "bad_request");
    }
}

#[tokio::test]
async fn test_farm_lifecycle() {
    let app = spawn_app().await;

    let (status, body) = create_farm(&app, "farm_7").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Farm created successfully");
    assert_eq!(body["farm_id"], "farm_7");

    let (status, body) = create_farm(&app, "farm_7").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");

    let (status, farm) = app.get("/api/farms/farm_7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(farm["owner_name"], "Asha");
    assert_eq!(farm["area_hectares"], 2.5);

    let (status, body) = app.get("/api/farms/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, body) = app
        .post(
            "/api/farms",
            json!({ "farm_id": "farm_8", "owner_name": "B", "location": "C", "area": 1.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let (status, _) = app
        .post("/api/farms", json!({ "farm_id": " ", "owner_name": "B", "location": "C", "area_hectares": 1.0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_soil_reports_and_profile() {
    let app = spawn_app().await;
    let report = json!({ "N": 80, "P": 40, "K": 40, "ph": 6.8, "organic_matter": 1.2 });

    let (status, _) = app.post("/api/farms/ghost/soil-report", report.clone()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    create_farm(&app, "farm_3").await;

    let (status, profile) = app.get("/api/farms/farm_3/profile").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["has_soil_data"], false);
    assert_eq!(profile["has_recommendations"], false);
    assert!(profile["latest_soil_report"].is_null());

    let (status, _) = app.get("/api/farms/farm_3/soil-report/latest").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, created) = app.post("/api/farms/farm_3/soil-report", report).await;
    assert_eq!(status, StatusCode::CREATED);
    let report_id = created["report_id"].as_str().unwrap().to_string();

    let (status, latest) = app.get("/api/farms/farm_3/soil-report/latest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["id"], report_id);
    assert_eq!(latest["N"], 80.0);
    assert_eq!(latest["organic_matter"], 1.2);

    let (status, _) = app
        .post("/api/farms/farm_3/soil-report", json!({ "N": 1, "P": 1, "K": 1, "ph": 20 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.post("/api/predict?farm_id=farm_3", rice_reading()).await;
    let (_, profile) = app.get("/api/farms/farm_3/profile").await;
    assert_eq!(profile["farm_details"]["farm_id"], "farm_3");
    assert_eq!(profile["has_soil_data"], true);
    assert_eq!(profile["has_recommendations"], true);
    assert_eq!(profile["latest_soil_report"]["id"], report_id);
    assert_eq!(profile["feedback_stats"]["total_feedback"], 0);

    let (status, _) = app.get("/api/farms/ghost/profile").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_feedback_and_stats() {
    let app = spawn_app().await;

    let (status, body) = app
        .post("/api/feedback", json!({ "farm_id": "farm_1", "crop": "rice", "accepted": true, "rating": 6 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (_, empty) = app.get("/api/feedback/stats").await;
    assert_eq!(empty["total_feedback"], 0);
    assert_eq!(empty["acceptance_rate"], 0.0);
    assert!(empty["average_rating"].is_null());

    for (crop, accepted, rating) in [
        ("rice", true, json!(4)),
        ("rice", false, Value::Null),
        ("maize", true, json!(5)),
    ] {
        let (status, body) = app
            .post(
                "/api/feedback",
                json!({ "farm_id": "farm_1", "crop": crop, "accepted": accepted, "rating": rating }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["message"], "Feedback saved successfully");
        assert!(body["feedback_id"].is_string());
    }

    let (_, all) = app.get("/api/feedback/stats").await;
    assert_eq!(all["total_feedback"], 3);
    assert_eq!(all["accepted_count"], 2);
    assert_eq!(all["acceptance_rate"], 66.67);
    assert_eq!(all["average_rating"], 4.5);
    assert_eq!(all["crops_with_feedback"], json!(["maize", "rice"]));
    assert!(all["filtered_by_crop"].is_null());

    let (_, rice) = app.get("/api/feedback/stats?crop=rice").await;
    assert_eq!(rice["total_feedback"], 2);
    assert_eq!(rice["acceptance_rate"], 50.0);
    assert_eq!(rice["average_rating"], 4.0);
    assert_eq!(rice["filtered_by_crop"], "rice");
}

#[tokio::test]
async fn test_chatbot() {
    let app = spawn_app().await;

    let (status, reply) = app.post("/api/chatbot", json!({ "message": "How do I grow rice?" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["category"], "Crop Information - Rice");
    assert!(reply["response"].as_str().unwrap().contains("Rice"));
    assert!(!reply["suggestions"].as_array().unwrap().is_empty());
    assert!(reply["timestamp"].is_string());

    let (_, reply) = app.post("/api/chatbot", json!({ "message": "what is the price today" })).await;
    assert_eq!(reply["category"], "Market Intelligence");

    let (status, body) = app.post("/api/chatbot", json!({ "message": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, topics) = app.get("/api/chatbot/topics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(topics["total_topics"], 20);
    assert!(topics["crops"].as_array().unwrap().contains(&json!("rice")));
}
