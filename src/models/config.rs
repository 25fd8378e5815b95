//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::RowSelectors;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP, retry and pacing behavior
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Upstream endpoints
    #[serde(default)]
    pub source: SourceConfig,

    /// Markup extraction chains
    #[serde(default)]
    pub selectors: RowSelectors,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_attempts == 0 {
            return Err(AppError::validation("crawler.max_attempts must be > 0"));
        }
        if self.crawler.page_delay_min_ms > self.crawler.page_delay_max_ms {
            return Err(AppError::validation(
                "crawler.page_delay_min_ms must not exceed crawler.page_delay_max_ms",
            ));
        }
        if self.crawler.max_empty_pages == 0 || self.crawler.max_fetch_failures == 0 {
            return Err(AppError::validation(
                "crawler.max_empty_pages and crawler.max_fetch_failures must be > 0",
            ));
        }
        for (name, value) in [
            ("source.base_url", &self.source.base_url),
            ("source.listing_url", &self.source.listing_url),
            ("source.api_url", &self.source.api_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| AppError::validation(format!("{name} is not a valid URL: {e}")))?;
        }
        if !self.source.detail_path.contains("{id}") {
            return Err(AppError::validation(
                "source.detail_path must contain an {id} placeholder",
            ));
        }
        if self.selectors.rows.is_empty() || self.selectors.title.is_empty() {
            return Err(AppError::validation(
                "selectors.rows and selectors.title must not be empty",
            ));
        }
        Ok(())
    }
}

/// Browser identity presented by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrowserFamily {
    #[default]
    Chrome,
    Firefox,
    Safari,
    /// Rotate across every known family
    Any,
}

/// HTTP client, retry and pacing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Browser identity for header sets
    #[serde(default)]
    pub browser: BrowserFamily,

    /// Ask for TLS/HTTP fingerprint impersonation (degrades to standard TLS when unavailable)
    #[serde(default = "defaults::impersonate_tls")]
    pub impersonate_tls: bool,

    /// Per-attempt timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum redirects followed per request
    #[serde(default = "defaults::max_redirects")]
    pub max_redirects: usize,

    /// Attempts per fetch
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Minimum plausible markup body in bytes
    #[serde(default = "defaults::min_markup_bytes")]
    pub min_markup_bytes: usize,

    /// Minimum plausible API body in bytes
    #[serde(default = "defaults::min_api_bytes")]
    pub min_api_bytes: usize,

    /// Inter-page delay bounds in milliseconds
    #[serde(default = "defaults::page_delay_min")]
    pub page_delay_min_ms: u64,
    #[serde(default = "defaults::page_delay_max")]
    pub page_delay_max_ms: u64,

    /// Delay between emitted batches in milliseconds
    #[serde(default = "defaults::batch_delay")]
    pub batch_delay_ms: u64,

    /// Consecutive empty pages that end pagination
    #[serde(default = "defaults::streak")]
    pub max_empty_pages: u32,

    /// Consecutive failed fetches that end pagination
    #[serde(default = "defaults::streak")]
    pub max_fetch_failures: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            browser: BrowserFamily::default(),
            impersonate_tls: defaults::impersonate_tls(),
            timeout_secs: defaults::timeout(),
            max_redirects: defaults::max_redirects(),
            max_attempts: defaults::max_attempts(),
            min_markup_bytes: defaults::min_markup_bytes(),
            min_api_bytes: defaults::min_api_bytes(),
            page_delay_min_ms: defaults::page_delay_min(),
            page_delay_max_ms: defaults::page_delay_max(),
            batch_delay_ms: defaults::batch_delay(),
            max_empty_pages: defaults::streak(),
            max_fetch_failures: defaults::streak(),
        }
    }
}

/// Upstream endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Site root used to resolve relative links
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Paginated HTML listing
    #[serde(default = "defaults::listing_url")]
    pub listing_url: String,

    /// JSON feed
    #[serde(default = "defaults::api_url")]
    pub api_url: String,

    /// Canonical detail path composed from a row id or slug
    #[serde(default = "defaults::detail_path")]
    pub detail_path: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            listing_url: defaults::listing_url(),
            api_url: defaults::api_url(),
            detail_path: defaults::detail_path(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn impersonate_tls() -> bool {
        true
    }
    pub fn timeout() -> u64 {
        60
    }
    pub fn max_redirects() -> usize {
        5
    }
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn min_markup_bytes() -> usize {
        1000
    }
    pub fn min_api_bytes() -> usize {
        2
    }
    pub fn page_delay_min() -> u64 {
        800
    }
    pub fn page_delay_max() -> u64 {
        2000
    }
    pub fn batch_delay() -> u64 {
        250
    }
    pub fn streak() -> u32 {
        3
    }

    // Source defaults
    pub fn base_url() -> String {
        "https://remoteok.com".into()
    }
    pub fn listing_url() -> String {
        "https://remoteok.com/remote-jobs".into()
    }
    pub fn api_url() -> String {
        "https://remoteok.com/api".into()
    }
    pub fn detail_path() -> String {
        "/remote-jobs/{id}".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
