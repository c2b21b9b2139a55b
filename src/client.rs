use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::ScrapeResult;
use crate::utils::get_random_user_agent;

/// Body of `POST /scrape` on the scraping service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
    #[serde(rename = "usePlaywright", default)]
    pub use_playwright: bool,
}

/// Error body the scraping service returns with a non-2xx status.
#[derive(Debug, Deserialize)]
pub struct UpstreamError {
    pub error: String,
}

/// Client for the remote scraping service. The service does the
/// actual page fetch and parse; this side only speaks the JSON
/// contract and surfaces upstream errors verbatim.
pub struct ScrapeClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ScrapeClient {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create scrape client")?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Submit one scrape and wait for the full result. Upstream
    /// failures come back as errors carrying the service's own
    /// message; no partial data is ever returned.
    pub async fn scrape(&self, url: &str, use_playwright: bool) -> Result<ScrapeResult> {
        log::info!("Forwarding scrape request for {}", url);

        let response = self
            .client
            .post(&self.endpoint)
            .header("User-Agent", get_random_user_agent())
            .json(&ScrapeRequest {
                url: url.to_string(),
                use_playwright,
            })
            .send()
            .await
            .context("Failed to reach scraping service")?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<UpstreamError>().await {
                Ok(body) => body.error,
                Err(_) => format!("Scraping service returned {}", status),
            };
            anyhow::bail!("{}", message);
        }

        response
            .json::<ScrapeResult>()
            .await
            .context("Invalid JSON response from scraping service")
    }
}
