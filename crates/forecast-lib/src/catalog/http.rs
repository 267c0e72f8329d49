//! HTTP adapter for the catalog service

use super::{async_trait, decode_entries, CatalogAccessor, CatalogEntry};
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Listing endpoint of the catalog service, relative to its base URL
pub const PRODUCTS_PATH: &str = "api/products";

/// Page size requested from the catalog service
const DEFAULT_PER_PAGE: u32 = 200;

/// Fetches the catalog from the catalog service's REST listing
pub struct HttpCatalogAccessor {
    client: Client,
    products_url: Url,
    per_page: u32,
}

impl HttpCatalogAccessor {
    /// Create an accessor without a request timeout
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, None)
    }

    /// Create an accessor; `timeout` bounds each request when set
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid catalog URL")?;
        let products_url = base_url.join(PRODUCTS_PATH).context("Invalid catalog path")?;

        Ok(Self {
            client,
            products_url,
            per_page: DEFAULT_PER_PAGE,
        })
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.max(1);
        self
    }
}

#[async_trait]
impl CatalogAccessor for HttpCatalogAccessor {
    async fn fetch(&self) -> Result<Vec<CatalogEntry>> {
        debug!(url = %self.products_url, per_page = self.per_page, "Fetching catalog");

        let response = self
            .client
            .get(self.products_url.clone())
            .query(&[("per_page", self.per_page)])
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Catalog API error ({}): {}", status, body);
        }

        let values = response
            .json::<Vec<Value>>()
            .await
            .context("Failed to parse catalog response")?;

        Ok(decode_entries(values))
    }

    fn describe(&self) -> String {
        self.products_url.to_string()
    }
}
