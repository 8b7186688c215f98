//! Integration tests for the prediction service endpoints

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use twin_api::api::{create_router, AppState};
use twin_lib::{
    health::{components, HealthRegistry},
    predictor::{FeatureScaler, ModelRegistry, PredictionService, Regressor},
    Result, TwinError,
};

struct Constant(f32);

impl Regressor for Constant {
    fn predict(&self, _features: &[f32; 5]) -> Result<f32> {
        Ok(self.0)
    }
}

struct Failing;

impl Regressor for Failing {
    fn predict(&self, _features: &[f32; 5]) -> Result<f32> {
        Err(TwinError::Inference {
            model: "soh".to_string(),
            reason: "unexpected tensor rank".to_string(),
        })
    }
}

fn registry(soh: Arc<dyn Regressor>) -> Arc<ModelRegistry> {
    Arc::new(ModelRegistry::from_parts(
        soh,
        Arc::new(Constant(1000.0)),
        Arc::new(Constant(1100.0)),
        Arc::new(Constant(1200.0)),
        FeatureScaler::identity(),
    ))
}

async fn setup_app(soh: Arc<dyn Regressor>) -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.set_healthy(components::MODEL_REGISTRY).await;
    health_registry.set_healthy(components::PREDICTOR).await;

    let service = Arc::new(PredictionService::server(registry(soh)));
    let state = Arc::new(AppState::new(service, health_registry));
    (create_router(state.clone()), state)
}

async fn setup_test_app() -> (Router, Arc<AppState>) {
    setup_app(Arc::new(Constant(82.5))).await
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn post(app: Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_health_reports_models() {
    let (app, _state) = setup_test_app().await;

    let (status, health) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["models_loaded"], 4);
    assert_eq!(
        health["available_models"],
        json!(["soh", "rul_gru", "rul_gru_norm", "rul_lstm"])
    );
    assert!(health["timestamp"].is_string());
    // registries built in memory read no artifacts from disk
    assert_eq!(health["artifacts"], json!([]));
    assert_eq!(health["components"]["predictor"]["status"], "healthy");
}

#[tokio::test]
async fn test_health_returns_503_when_unhealthy() {
    let (app, state) = setup_test_app().await;
    state
        .health_registry
        .set_unhealthy(components::MODEL_REGISTRY, "artifact missing")
        .await;

    let (status, health) = get(app, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_follows_registry_state() {
    let (app, state) = setup_test_app().await;

    let (status, readiness) = get(app.clone(), "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);

    state.health_registry.set_ready(true).await;
    let (status, readiness) = get(app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_predict_soh_with_documented_defaults() {
    let (app, _state) = setup_test_app().await;

    let body = json!({
        "voltage": 3.7,
        "current": 2.0,
        "temperature": 25.0,
        "capacity": 2.5,
        "cycle_count": 100
    });
    let (status, response) = post(app, "/predict/soh", body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    let soh = response["soh_percentage"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&soh));
    assert_eq!(soh, 82.5);
    assert_eq!(response["health_status"], "good");
    assert_eq!(response["model_used"], "random_forest");
    assert!(response["timestamp"].is_string());
}

#[tokio::test]
async fn test_predict_soh_defaults_invalid_fields() {
    let (app, _state) = setup_test_app().await;

    let (status, response) =
        post(app, "/predict/soh", r#"{"voltage": "high", "cycle_count": null}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["soh_percentage"], 82.5);
}

#[tokio::test]
async fn test_predict_rul_selects_model() {
    let (app, _state) = setup_test_app().await;

    let (status, response) = post(app.clone(), "/predict/rul", r#"{"model": "lstm"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["rul_cycles"], 1200.0);
    assert_eq!(response["rul_days"], 800.0);
    assert_eq!(response["rul_months"], 26.7);
    assert_eq!(response["model_used"], "lstm");

    let (_, response) = post(app, "/predict/rul", r#"{"model": "bogus"}"#).await;
    assert_eq!(response["rul_cycles"], 1000.0);
    assert_eq!(response["model_used"], "gru");
}

#[tokio::test]
async fn test_predict_battery_combines_results() {
    let (app, _state) = setup_test_app().await;

    let (status, response) = post(
        app,
        "/predict/battery",
        r#"{"voltage": 3.8, "current": 1.5, "temperature": 30.0, "soc": 50.0}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let analysis = &response["battery_analysis"];
    assert_eq!(analysis["soh"]["percentage"], 82.5);
    assert_eq!(analysis["soh"]["status"], "good");
    assert_eq!(analysis["rul"]["cycles"], 1000.0);
    assert_eq!(analysis["current_metrics"]["voltage"], 3.8);
    assert_eq!(analysis["current_metrics"]["soc"], 50.0);
    assert_eq!(analysis["current_metrics"]["estimated_range_km"], 165.0);
    assert!(analysis["timestamp"].is_string());
}

#[tokio::test]
async fn test_simulate_highway_trip() {
    let (app, _state) = setup_test_app().await;

    let (status, response) = post(
        app,
        "/simulate/trip",
        r#"{"duration_minutes": 60, "type": "highway"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let trip = &response["trip_simulation"];
    assert_eq!(trip["data_points"], 12);
    assert_eq!(trip["readings"].as_array().unwrap().len(), 12);
    assert_eq!(trip["trip_type"], "highway");

    let initial = trip["summary"]["initial_soc"].as_f64().unwrap();
    let last = trip["summary"]["final_soc"].as_f64().unwrap();
    assert!(last < initial);
    assert_eq!(trip["readings"][0]["phase"], "highway");
}

#[tokio::test]
async fn test_inference_failure_is_500_with_error_body() {
    let (app, state) = setup_app(Arc::new(Failing)).await;

    let (status, response) = post(app.clone(), "/predict/soh", "{}").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response["error"]
        .as_str()
        .unwrap()
        .contains("unexpected tensor rank"));
    assert!(response.get("soh_percentage").is_none());

    let snapshot = state.health_registry.components().await;
    assert_eq!(
        snapshot[components::PREDICTOR].status,
        twin_lib::ComponentStatus::Degraded
    );

    let (status, health) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
}

#[tokio::test]
async fn test_malformed_json_is_client_error() {
    let (app, _state) = setup_test_app().await;

    let (status, _) = post(app, "/predict/soh", "{\"voltage\": ").await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_metrics_exposition() {
    let (app, _state) = setup_test_app().await;

    let (status, _) = post(app.clone(), "/predict/soh", "{}").await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("battery_twin_predictions_total"));
    assert!(text.contains("battery_twin_prediction_latency_seconds"));
}
