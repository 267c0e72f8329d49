//! Integration tests for the agent API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use forecast_agent::api::{create_router, AppState};
use forecast_lib::{
    catalog::{async_trait, CatalogAccessor, CatalogEntry, StaticCatalogAccessor},
    health::{components, HealthRegistry},
    OrchestratorConfig, PipelineOrchestrator,
};
use std::sync::Arc;
use tower::ServiceExt;

const CATALOG: &str = r#"[
    {"id": 1, "name": "Bolts", "inventory": 5, "avg_sales": 10, "lead_time": 2},
    {"id": 2, "name": "Nuts", "inventory": 80, "avg_sales": 4, "lead_time": 3},
    {"id": 3, "name": "Washers", "inventory": 1, "avg_sales": 6, "lead_time": 4}
]"#;

struct UnreachableCatalog;

#[async_trait]
impl CatalogAccessor for UnreachableCatalog {
    async fn fetch(&self) -> anyhow::Result<Vec<CatalogEntry>> {
        anyhow::bail!("connection refused")
    }

    fn describe(&self) -> String {
        "unreachable".to_string()
    }
}

async fn setup_app(accessor: impl CatalogAccessor + 'static) -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register_all().await;

    let config = OrchestratorConfig {
        synthetic_catalog_size: 12,
        synthetic_seed: Some(9),
        ..Default::default()
    };
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        Arc::new(accessor),
        config,
        health_registry.clone(),
    ));
    let state = Arc::new(AppState::new(orchestrator, health_registry));
    (create_router(state.clone()), state)
}

async fn setup_test_app() -> (Router, Arc<AppState>) {
    setup_app(StaticCatalogAccessor::from_json(CATALOG).unwrap()).await
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app().await;

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health = json_body(response).await;
    assert_eq!(health["status"], "healthy");
    assert!(health["components"]["catalog"].is_object());
    assert!(health["components"]["trainer"].is_object());
    assert!(health["components"]["predictor"].is_object());
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state) = setup_test_app().await;
    state
        .health_registry
        .set_unhealthy(components::TRAINER, "worker panicked")
        .await;

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_follows_registry() {
    let (app, state) = setup_test_app().await;

    let response = app.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["ready"], false);

    state.health_registry.set_ready(true).await;
    let response = app.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_status_starts_idle() {
    let (app, _state) = setup_test_app().await;

    let response = app.oneshot(get("/api/v1/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let status = json_body(response).await;
    assert_eq!(status["status"], "idle");
    assert_eq!(status["record_count"], 0);
    assert!(status["classifier"].is_null());
}

#[tokio::test]
async fn test_load_train_predict_flow() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .clone()
        .oneshot(post("/api/v1/catalog/load", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = json_body(response).await;
    assert_eq!(outcome["outcome"], "live");
    assert_eq!(outcome["count"], 3);

    let response = app
        .clone()
        .oneshot(post("/api/v1/train", r#"{"epochs": 40, "seed": 7}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary = json_body(response).await;
    assert_eq!(summary["state"], "trained");
    assert_eq!(summary["generation"], 1);
    assert_eq!(summary["report"]["epochs"], 40);

    let response = app.clone().oneshot(get("/api/v1/predictions")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["generation"], 1);
    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 3);
    assert_eq!(predictions[0]["name"], "Bolts");
    for p in predictions {
        let probability = p["probability"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&probability));
    }

    let status = json_body(app.oneshot(get("/api/v1/status")).await.unwrap()).await;
    assert_eq!(status["status"], "ready");
    assert_eq!(status["message"], "Model trained!");
}

#[tokio::test]
async fn test_predictions_before_training_are_unavailable() {
    let (app, _state) = setup_test_app().await;
    app.clone()
        .oneshot(post("/api/v1/catalog/load", ""))
        .await
        .unwrap();

    let body = json_body(app.oneshot(get("/api/v1/predictions")).await.unwrap()).await;
    assert!(body["generation"].is_null());
    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 3);
    assert!(predictions.iter().all(|p| p["probability"].is_null()));
}

#[tokio::test]
async fn test_train_without_catalog_is_unprocessable() {
    let (app, _state) = setup_test_app().await;

    let response = app.clone().oneshot(post("/api/v1/train", "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["error"], "empty_training_set");

    let status = json_body(app.oneshot(get("/api/v1/status")).await.unwrap()).await;
    assert_eq!(status["message"], "No products to train on. Load products first.");
}

#[tokio::test]
async fn test_invalid_training_config_is_bad_request() {
    let (app, _state) = setup_test_app().await;
    app.clone()
        .oneshot(post("/api/v1/catalog/load", ""))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(post("/api/v1/train", r#"{"epochs": 0}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "invalid_config");

    let response = app
        .oneshot(post("/api/v1/train", "{not json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "bad_request");
}

#[tokio::test]
async fn test_failed_training_is_server_error() {
    let (app, _state) = setup_test_app().await;
    app.clone()
        .oneshot(post("/api/v1/catalog/load", ""))
        .await
        .unwrap();

    let body = format!(
        r#"{{"optimizer": "sgd", "learningRate": {:e}, "seed": 1}}"#,
        f64::MAX
    );
    let response = app.clone().oneshot(post("/api/v1/train", &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "training_failed");

    let status = json_body(app.oneshot(get("/api/v1/status")).await.unwrap()).await;
    assert_eq!(status["status"], "error");
    assert!(status["classifier"].is_null());
}

#[tokio::test]
async fn test_unreachable_catalog_degrades() {
    let (app, state) = setup_app(UnreachableCatalog).await;

    let response = app
        .clone()
        .oneshot(post("/api/v1/catalog/load", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = json_body(response).await;
    assert_eq!(outcome["outcome"], "degraded");
    assert_eq!(outcome["count"], 12);

    let status = json_body(app.clone().oneshot(get("/api/v1/status")).await.unwrap()).await;
    assert_eq!(status["status"], "catalogLoaded");
    assert_eq!(status["degraded"], true);
    assert!(status["message"].as_str().unwrap().contains("degraded"));

    let health = state.health_registry.health().await;
    assert_eq!(
        serde_json::to_value(health.status).unwrap(),
        serde_json::json!("degraded")
    );
    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, _state) = setup_test_app().await;
    app.clone()
        .oneshot(post("/api/v1/catalog/load", ""))
        .await
        .unwrap();

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("reorder_forecast_catalog_load_seconds_bucket"));
    assert!(metrics_text.contains("reorder_forecast_catalog_load_seconds_count"));
    assert!(metrics_text.contains("reorder_forecast_catalog_records"));
}
