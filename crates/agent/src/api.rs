//! HTTP API over the forecast pipeline, plus health checks and Prometheus
//! metrics

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use forecast_lib::{
    health::{ComponentStatus, HealthRegistry},
    predictor::TrainingConfig,
    PipelineError, PipelineOrchestrator,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>, health_registry: HealthRegistry) -> Self {
        Self {
            orchestrator,
            health_registry,
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Errors returned by API handlers
#[derive(Debug)]
pub enum ApiError {
    Pipeline(PipelineError),
    BadRequest(String),
    Internal(String),
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        ApiError::Pipeline(e)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Pipeline(e) => match e {
                PipelineError::AlreadyInProgress(_) => {
                    (StatusCode::CONFLICT, "already_in_progress")
                }
                PipelineError::ModelNotTrained => (StatusCode::CONFLICT, "model_not_trained"),
                PipelineError::EmptyTrainingSet => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "empty_training_set")
                }
                PipelineError::InvalidConfig(_) => (StatusCode::BAD_REQUEST, "invalid_config"),
                PipelineError::MalformedRecord(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "malformed_record")
                }
                PipelineError::TrainingFailed(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "training_failed")
                }
                PipelineError::PredictionUnavailable(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "prediction_unavailable")
                }
                PipelineError::CatalogUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "catalog_unavailable")
                }
            },
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match self {
            ApiError::Pipeline(e) => e.to_string(),
            ApiError::BadRequest(m) | ApiError::Internal(m) => m,
        };
        if status.is_server_error() {
            warn!(error = code, message = %message, "Request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: code.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

/// Run a pipeline operation on its own task so a dropped request cannot
/// cancel it halfway through
async fn detached<T, F>(operation: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: Future<Output = forecast_lib::error::Result<T>> + Send + 'static,
{
    tokio::spawn(operation)
        .await
        .map_err(|e| ApiError::Internal(format!("pipeline task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
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
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(format!("failed to encode metrics: {}", e)))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.orchestrator.snapshot())
}

async fn load_catalog(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let orchestrator = Arc::clone(&state.orchestrator);
    let outcome = detached(async move { orchestrator.load_catalog().await }).await?;
    info!(
        records = outcome.count(),
        degraded = outcome.is_degraded(),
        "Catalog load requested via API"
    );
    Ok(Json(outcome))
}

/// An empty body trains with the default config
async fn train(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let config = if body.iter().all(u8::is_ascii_whitespace) {
        TrainingConfig::default()
    } else {
        serde_json::from_slice::<TrainingConfig>(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid training config: {}", e)))?
    };

    let orchestrator = Arc::clone(&state.orchestrator);
    let summary = detached(async move { orchestrator.train(config).await }).await?;
    Ok(Json(summary))
}

async fn predictions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.orchestrator.predict_all())
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/status", get(status))
        .route("/api/v1/catalog/load", post(load_catalog))
        .route("/api/v1/train", post(train))
        .route("/api/v1/predictions", get(predictions))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_errors_map_to_status_codes() {
        let cases = [
            (PipelineError::ModelNotTrained, StatusCode::CONFLICT),
            (PipelineError::EmptyTrainingSet, StatusCode::UNPROCESSABLE_ENTITY),
            (
                PipelineError::TrainingFailed("diverged".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PipelineError::PredictionUnavailable("nan".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(ApiError::from(error).status_and_code().0, expected);
        }
    }

    #[test]
    fn test_prediction_error_has_its_own_code() {
        let error = ApiError::from(PipelineError::PredictionUnavailable("nan".to_string()));
        assert_eq!(error.status_and_code().1, "prediction_unavailable");
    }
}
