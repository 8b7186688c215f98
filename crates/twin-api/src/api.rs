//! HTTP API for predictions, health checks and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};
use twin_lib::{
    health::{components, ComponentHealth, ComponentStatus, HealthRegistry},
    predictor::{
        BatteryAnalysisResponse, BatteryInput, ModelArtifact, PredictionService, RulResponse, SohResponse,
        TripRequest, TripSimulationResponse,
    },
    TwinError,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(service: Arc<PredictionService>, health_registry: HealthRegistry) -> Self {
        Self {
            service,
            health_registry,
        }
    }

    /// Reflect the outcome of a prediction in the predictor's health
    async fn track<T>(&self, result: &Result<T, ApiError>) {
        match result {
            Ok(_) => self.health_registry.set_healthy(components::PREDICTOR).await,
            Err(e) => {
                self.health_registry
                    .set_degraded(components::PREDICTOR, e.to_string())
                    .await
            }
        }
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDocument {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub models_loaded: usize,
    pub available_models: Vec<String>,
    /// SHA-256 fingerprint of every artifact read at startup
    pub artifacts: Vec<ModelArtifact>,
    pub components: BTreeMap<String, ComponentHealth>,
}

/// A prediction that could not be served
#[derive(Debug)]
pub enum ApiError {
    Prediction(TwinError),
    Task(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Prediction(e) => write!(f, "{e}"),
            ApiError::Task(reason) => write!(f, "prediction task failed: {reason}"),
        }
    }
}

impl From<TwinError> for ApiError {
    fn from(e: TwinError) -> Self {
        ApiError::Prediction(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            ApiError::Prediction(TwinError::ModelUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!(status = status_code.as_u16(), error = %self, "Prediction request failed");
        (status_code, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Inference is CPU bound; keep it off the async workers
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> twin_lib::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Task(e.to_string()))?
        .map_err(ApiError::from)
}

/// Service health - returns 200 unless a component is unhealthy
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let components = state.health_registry.components().await;
    let status = twin_lib::health::overall_status(&components);
    let registry = state.service.registry();

    let document = HealthDocument {
        status: status.as_health_str().to_string(),
        timestamp: Utc::now(),
        models_loaded: registry.map_or(0, |r| r.models_loaded()),
        available_models: registry.map(|r| r.available_models()).unwrap_or_default(),
        artifacts: registry.map(|r| r.artifacts().to_vec()).unwrap_or_default(),
        components,
    };

    let status_code = match status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(document))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn predict_soh(
    State(state): State<Arc<AppState>>,
    Json(input): Json<BatteryInput>,
) -> Result<Json<SohResponse>, ApiError> {
    let service = state.service.clone();
    let features = input.soh_features();

    let result = run_blocking(move || service.predict_soh(&features)).await;
    state.track(&result).await;
    Ok(Json(SohResponse::new(result?)))
}

async fn predict_rul(
    State(state): State<Arc<AppState>>,
    Json(input): Json<BatteryInput>,
) -> Result<Json<RulResponse>, ApiError> {
    let service = state.service.clone();
    let features = input.rul_features();
    let variant = input.rul_variant();

    let result = run_blocking(move || service.predict_rul(&features, variant)).await;
    state.track(&result).await;
    Ok(Json(RulResponse::new(result?, variant.as_str())))
}

async fn predict_battery(
    State(state): State<Arc<AppState>>,
    Json(input): Json<BatteryInput>,
) -> Result<Json<BatteryAnalysisResponse>, ApiError> {
    let service = state.service.clone();

    let result = run_blocking(move || service.predict_complete(&input)).await;
    state.track(&result).await;
    Ok(Json(BatteryAnalysisResponse {
        battery_analysis: result?,
    }))
}

async fn simulate_trip(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TripRequest>,
) -> Result<Json<TripSimulationResponse>, ApiError> {
    let service = state.service.clone();

    let result =
        run_blocking(move || service.simulate_trip(&request, &mut rand::thread_rng())).await;
    state.track(&result).await;
    Ok(Json(TripSimulationResponse {
        trip_simulation: result?,
    }))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/predict/soh", post(predict_soh))
        .route("/predict/rul", post(predict_rul))
        .route("/predict/battery", post(predict_battery))
        .route("/simulate/trip", post(simulate_trip))
        .with_state(state)
}

/// Serve until `shutdown` completes
pub async fn serve(
    addr: &str,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
