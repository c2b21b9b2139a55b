use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Runtime configuration, loadable from a TOML file. Every field has
/// a default so a partial file (or none at all) works.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Scrape endpoint of the scraping service.
    #[serde(default = "default_scrape_url")]
    pub scrape_url: String,
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Turning this off runs the server without archive support and
    /// exercises the download fallbacks end to end.
    #[serde(default = "default_true")]
    pub archive_enabled: bool,
    #[serde(default = "default_image_timeout")]
    pub image_fetch_timeout_secs: u64,
    /// Pause between individual downloads on the no-archive fallback.
    #[serde(default = "default_fallback_delay")]
    pub fallback_delay_ms: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_scrape_url() -> String {
    "http://127.0.0.1:5000/scrape".to_string()
}

fn default_upstream_timeout() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_image_timeout() -> u64 {
    30
}

fn default_fallback_delay() -> u64 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            scrape_url: default_scrape_url(),
            timeout_secs: default_upstream_timeout(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            archive_enabled: default_true(),
            image_fetch_timeout_secs: default_image_timeout(),
            fallback_delay_ms: default_fallback_delay(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}
