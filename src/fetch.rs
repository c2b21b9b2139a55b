use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::utils::get_random_user_agent;

/// Bytes of a fetched image plus the declared media type, which drives
/// file extension inference before the URL suffix is consulted.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Seam between the export pipeline and the network. Fetches within
/// one archive pass run sequentially in selection order; a failure is
/// a soft, per-entry error the pipeline aggregates.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, src: &str) -> Result<FetchedImage>;

    /// Declared size in bytes via a HEAD request, if the server says.
    async fn probe_size(&self, src: &str) -> Result<Option<u64>>;
}

/// reqwest-backed fetcher for arbitrary third-party image URLs.
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create image fetch client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, src: &str) -> Result<FetchedImage> {
        let response = self
            .client
            .get(src)
            .header("User-Agent", get_random_user_agent())
            .send()
            .await
            .with_context(|| format!("Failed to fetch image {}", src))?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP error {} fetching {}", response.status(), src);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read image body {}", src))?;

        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    async fn probe_size(&self, src: &str) -> Result<Option<u64>> {
        let response = self
            .client
            .head(src)
            .header("User-Agent", get_random_user_agent())
            .send()
            .await
            .with_context(|| format!("Failed to probe image {}", src))?;

        Ok(response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok()))
    }
}
