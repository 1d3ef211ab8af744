use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use lineage_common::api::catalog::{ResolveAssetsRequest, ResolveAssetsResponse};
use lineage_common::types::AssetStub;
use lineage_common::{AssetId, LineageError, Result};

use super::AssetCatalog;

/// Catalog client speaking to the catalog service over HTTP.
pub struct HttpCatalog {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("lineage-engine/0.1")
            .timeout(request_timeout)
            .build()
            .map_err(|e| LineageError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AssetCatalog for HttpCatalog {
    async fn exists(&self, id: AssetId) -> Result<bool> {
        let url = format!("{}/assets/{}", self.base_url, id);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| LineageError::Catalog(format!("Catalog request failed: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(LineageError::Catalog(format!(
                    "Catalog returned {}: {}",
                    status, body
                )))
            }
        }
    }

    async fn resolve(&self, ids: &[AssetId]) -> Result<HashMap<AssetId, AssetStub>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let start = std::time::Instant::now();
        let url = format!("{}/assets/resolve", self.base_url);
        let request = ResolveAssetsRequest { ids: ids.to_vec() };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LineageError::Catalog(format!("Catalog request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LineageError::Catalog(format!(
                "Catalog returned {}: {}",
                status, body
            )));
        }

        let resolved: ResolveAssetsResponse = response
            .json()
            .await
            .map_err(|e| {
                LineageError::Catalog(format!("Failed to parse catalog response: {}", e))
            })?;

        metrics::histogram!("lineage.catalog.resolve.latency")
            .record(start.elapsed().as_secs_f64());

        Ok(resolved
            .assets
            .into_iter()
            .map(|stub| (stub.id, stub))
            .collect())
    }
}
