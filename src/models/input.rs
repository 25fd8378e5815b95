// src/models/input.rs

//! Run input handed over by the task runner.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::SourceConfig;

/// Which upstream surface a run reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Paginated HTML listing
    #[serde(alias = "markup")]
    Html,
    /// Monolithic JSON feed
    #[serde(alias = "json")]
    Api,
}

impl FromStr for SourceMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "html" | "markup" => Ok(SourceMode::Html),
            "api" | "json" => Ok(SourceMode::Api),
            other => Err(AppError::validation(format!(
                "unknown source '{other}' (expected html or api)"
            ))),
        }
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMode::Html => f.write_str("html"),
            SourceMode::Api => f.write_str("api"),
        }
    }
}

/// Recency constraint on `date_posted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DateFilter {
    #[default]
    All,
    Today,
    Week,
    Month,
    /// Explicit floor: postings before this date are rejected
    Since(NaiveDate),
}

impl DateFilter {
    /// Window length in days for symbolic filters.
    pub fn window_days(&self) -> Option<i64> {
        match self {
            DateFilter::Today => Some(1),
            DateFilter::Week => Some(7),
            DateFilter::Month => Some(31),
            DateFilter::All | DateFilter::Since(_) => None,
        }
    }
}

impl FromStr for DateFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" | "any" => Ok(DateFilter::All),
            "today" => Ok(DateFilter::Today),
            "week" => Ok(DateFilter::Week),
            "month" => Ok(DateFilter::Month),
            other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
                .map(DateFilter::Since)
                .map_err(|_| {
                    AppError::validation(format!(
                        "unknown date filter '{other}' (expected today, week, month, all or YYYY-MM-DD)"
                    ))
                }),
        }
    }
}

impl TryFrom<String> for DateFilter {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DateFilter> for String {
    fn from(value: DateFilter) -> Self {
        match value {
            DateFilter::All => "all".into(),
            DateFilter::Today => "today".into(),
            DateFilter::Week => "week".into(),
            DateFilter::Month => "month".into(),
            DateFilter::Since(date) => date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Forward-proxy selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfiguration {
    #[serde(default)]
    pub proxy_urls: Vec<String>,

    /// Managed proxy pool requested; credentials are sourced outside this crate
    #[serde(default, alias = "useApifyProxy")]
    pub use_managed_proxy: bool,
}

impl ProxyConfiguration {
    /// Pick one proxy for the whole run.
    pub fn pick(&self) -> Option<String> {
        let candidates: Vec<&String> = self
            .proxy_urls
            .iter()
            .filter(|u| !u.trim().is_empty())
            .collect();

        match candidates.choose(&mut rand::thread_rng()) {
            Some(url) => Some(url.trim().to_string()),
            None => {
                if self.use_managed_proxy {
                    log::warn!("Managed proxy requested but no proxy URLs supplied; connecting directly");
                }
                None
            }
        }
    }
}

/// Input options for a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInput {
    #[serde(default)]
    pub keyword: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default, alias = "jobDate")]
    pub date_filter: DateFilter,

    /// Global emission cap
    #[serde(default = "defaults::max_jobs")]
    pub max_jobs: usize,

    /// Page ceiling for the HTML listing
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,

    /// Emission batch size for the JSON feed
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub proxy_configuration: Option<ProxyConfiguration>,

    /// Endpoint override for the active source
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub source: Option<SourceMode>,
}

impl Default for RunInput {
    fn default() -> Self {
        Self {
            keyword: None,
            location: None,
            date_filter: DateFilter::default(),
            max_jobs: defaults::max_jobs(),
            max_pages: defaults::max_pages(),
            batch_size: defaults::batch_size(),
            proxy_configuration: None,
            url: None,
            source: None,
        }
    }
}

impl RunInput {
    /// Load run input from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Validate input values.
    pub fn validate(&self) -> Result<()> {
        if self.max_jobs == 0 {
            return Err(AppError::validation("maxJobs must be > 0"));
        }
        if self.max_pages == 0 {
            return Err(AppError::validation("maxPages must be > 0"));
        }
        if self.batch_size == 0 {
            return Err(AppError::validation("batchSize must be > 0"));
        }
        if let Some(url) = self.url.as_deref().filter(|u| !u.trim().is_empty()) {
            url::Url::parse(url.trim())?;
        }
        Ok(())
    }

    /// Source mode: explicit choice, else the JSON feed when an endpoint override is given.
    pub fn source_mode(&self) -> SourceMode {
        match (self.source, self.url_override()) {
            (Some(mode), _) => mode,
            (None, Some(_)) => SourceMode::Api,
            (None, None) => SourceMode::Html,
        }
    }

    /// Endpoint the run starts from.
    pub fn endpoint(&self, source: &SourceConfig) -> String {
        if let Some(url) = self.url_override() {
            return url.to_string();
        }
        match self.source_mode() {
            SourceMode::Html => source.listing_url.clone(),
            SourceMode::Api => source.api_url.clone(),
        }
    }

    /// The proxy picked for this run, if any.
    pub fn proxy(&self) -> Option<String> {
        self.proxy_configuration.as_ref().and_then(|p| p.pick())
    }

    fn url_override(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

mod defaults {
    pub fn max_jobs() -> usize {
        200
    }
    pub fn max_pages() -> u32 {
        10
    }
    pub fn batch_size() -> usize {
        50
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_task_runner_input() {
        let input: RunInput = serde_json::from_str(
            r#"{
                "keyword": "rust",
                "location": "Europe",
                "dateFilter": "week",
                "maxJobs": 25,
                "proxyConfiguration": { "proxyUrls": ["http://proxy.local:8000"] }
            }"#,
        )
        .unwrap();
        assert_eq!(input.keyword.as_deref(), Some("rust"));
        assert_eq!(input.date_filter, DateFilter::Week);
        assert_eq!(input.max_jobs, 25);
        assert_eq!(input.max_pages, 10);
        assert_eq!(input.batch_size, 50);
        assert_eq!(input.proxy().as_deref(), Some("http://proxy.local:8000"));
    }

    #[test]
    fn test_job_date_alias() {
        let input: RunInput = serde_json::from_str(r#"{ "jobDate": "today" }"#).unwrap();
        assert_eq!(input.date_filter, DateFilter::Today);
    }

    #[test]
    fn test_date_filter_parsing() {
        assert_eq!("all".parse::<DateFilter>().unwrap(), DateFilter::All);
        assert_eq!("".parse::<DateFilter>().unwrap(), DateFilter::All);
        assert_eq!("Month".parse::<DateFilter>().unwrap(), DateFilter::Month);
        assert_eq!(
            "2024-03-01".parse::<DateFilter>().unwrap(),
            DateFilter::Since(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
        assert!("fortnight".parse::<DateFilter>().is_err());
        assert_eq!(DateFilter::Week.window_days(), Some(7));
        assert_eq!(DateFilter::Month.window_days(), Some(31));
    }

    #[test]
    fn test_source_mode_selection() {
        let mut input = RunInput::default();
        assert_eq!(input.source_mode(), SourceMode::Html);
        assert_eq!(
            input.endpoint(&SourceConfig::default()),
            "https://remoteok.com/remote-jobs"
        );

        input.url = Some("https://mirror.example.com/api".into());
        assert_eq!(input.source_mode(), SourceMode::Api);
        assert_eq!(
            input.endpoint(&SourceConfig::default()),
            "https://mirror.example.com/api"
        );

        input.url = None;
        input.source = Some(SourceMode::Api);
        assert_eq!(input.endpoint(&SourceConfig::default()), "https://remoteok.com/api");
    }

    #[test]
    fn test_validate_rejects_zero_cap() {
        let input = RunInput {
            max_jobs: 0,
            ..RunInput::default()
        };
        assert!(input.validate().is_err());
        assert!(RunInput::default().validate().is_ok());
    }

    #[test]
    fn test_managed_proxy_without_urls_connects_directly() {
        let config = ProxyConfiguration {
            proxy_urls: vec![],
            use_managed_proxy: true,
        };
        assert_eq!(config.pick(), None);
    }
}
