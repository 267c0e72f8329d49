//! API client for the forecast service

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Training runs synchronously behind `POST /api/v1/train`
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// API client for the forecast service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }
}

// API response types not shared with the service library

/// Error body returned by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_lib::{CatalogPredictions, LoadOutcome, PipelineSnapshot, PipelineStatus};

    #[tokio::test]
    async fn test_get_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/status")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status": "catalogLoaded", "message": "Loaded 2 products.", "degraded": false,
                    "record_count": 2, "records": [], "classifier": null}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let snapshot: PipelineSnapshot = client.get("api/v1/status").await.unwrap();

        mock.assert_async().await;
        assert_eq!(snapshot.status, PipelineStatus::CatalogLoaded);
        assert_eq!(snapshot.record_count, 2);
    }

    #[tokio::test]
    async fn test_post_load() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/catalog/load")
            .with_status(200)
            .with_body(r#"{"outcome": "degraded", "count": 50, "cause": "connection refused"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let outcome: LoadOutcome = client
            .post("api/v1/catalog/load", &serde_json::json!({}))
            .await
            .unwrap();
        assert!(outcome.is_degraded());
        assert_eq!(outcome.count(), 50);
    }

    #[tokio::test]
    async fn test_error_body_message_surfaces() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/train")
            .with_status(409)
            .with_body(r#"{"error": "already_in_progress", "message": "training already in progress"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .post::<serde_json::Value, _>("api/v1/train", &serde_json::json!({}))
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("409"), "{}", text);
        assert!(text.contains("training already in progress"), "{}", text);
    }

    #[tokio::test]
    async fn test_predictions_decode() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/predictions")
            .with_status(200)
            .with_body(
                r#"{"generation": 3, "predictions": [
                    {"id": 1, "name": "Bolts", "inventory_level": 5.0, "average_sales": 10.0,
                     "lead_time_days": 2.0, "probability": 0.91, "decision": "reorder"},
                    {"id": "sku-2", "name": "Nuts", "inventory_level": null, "average_sales": null,
                     "lead_time_days": null, "probability": null, "decision": null}
                ]}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let list: CatalogPredictions = client.get("api/v1/predictions").await.unwrap();
        assert_eq!(list.generation, Some(3));
        assert_eq!(list.predictions.len(), 2);
        assert_eq!(list.predictions[1].id.to_string(), "sku-2");
        assert!(list.predictions[1].probability.is_none());
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
