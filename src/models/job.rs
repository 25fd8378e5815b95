// src/models/job.rs

//! Job records: raw rows as extracted, the validated row, and the canonical job.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::dates::parse_posted_date;

/// Location used when the source does not provide one.
pub const DEFAULT_LOCATION: &str = "Worldwide";

/// Which upstream representation a row was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowOrigin {
    Markup,
    Api,
}

/// Employment type derived from tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum JobType {
    #[serde(rename = "Full-time")]
    FullTime,
    #[serde(rename = "Part-time")]
    PartTime,
    #[serde(rename = "Contract")]
    Contract,
    #[default]
    #[serde(rename = "Remote")]
    Remote,
}

impl JobType {
    /// Display label as emitted downstream.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FullTime => "Full-time",
            JobType::PartTime => "Part-time",
            JobType::Contract => "Contract",
            JobType::Remote => "Remote",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unvalidated job row extracted from one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RawJob {
    pub origin: RowOrigin,
    pub title: Option<String>,
    pub company: Option<String>,
    pub url: Option<String>,
    pub location: Option<String>,
    pub tags: Vec<String>,
    pub logo: Option<String>,
    /// ISO-8601 text; epoch inputs are converted before they land here
    pub date_posted: Option<String>,
    pub salary_min: Option<u64>,
    pub salary_max: Option<u64>,
    pub description_html: Option<String>,
    pub description_text: Option<String>,
}

impl RawJob {
    /// Create an empty row for the given origin.
    pub fn new(origin: RowOrigin) -> Self {
        Self {
            origin,
            title: None,
            company: None,
            url: None,
            location: None,
            tags: Vec::new(),
            logo: None,
            date_posted: None,
            salary_min: None,
            salary_max: None,
            description_html: None,
            description_text: None,
        }
    }

    /// Required-field gate.
    ///
    /// Returns `None` unless title and company are non-empty after trimming
    /// and the URL is an absolute http(s) URL.
    pub fn validate(self) -> Option<ValidRow> {
        let title = non_empty(self.title)?;
        let company = non_empty(self.company)?;
        let url = non_empty(self.url)?;

        let parsed = url::Url::parse(&url).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }

        Some(ValidRow {
            title,
            company,
            url,
            raw: RawJob {
                title: None,
                company: None,
                url: None,
                ..self
            },
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A row that passed the required-field gate.
///
/// Only the gate can build one, so every `Job` has a title, company and URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRow {
    title: String,
    company: String,
    url: String,
    raw: RawJob,
}

impl ValidRow {
    /// Split into the required fields and the remaining optional ones.
    pub(crate) fn into_parts(self) -> (String, String, String, RawJob) {
        (self.title, self.company, self.url, self.raw)
    }
}

/// The canonical, normalized job record emitted downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Job {
    pub title: String,
    pub company: String,
    pub url: String,
    pub location: String,
    pub tags: Vec<String>,
    pub job_type: JobType,
    pub salary: Option<String>,
    pub logo: Option<String>,
    pub date_posted: Option<String>,
    pub description_html: Option<String>,
    pub description_text: Option<String>,
    pub source_url: String,
    pub collected_at: String,
}

impl Job {
    /// Posting timestamp in comparable form, if `date_posted` parses.
    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        self.date_posted.as_deref().and_then(parse_posted_date)
    }

    /// Text the keyword filter searches.
    pub fn searchable_text(&self) -> String {
        [
            self.title.as_str(),
            self.company.as_str(),
            self.location.as_str(),
            &self.tags.join(" "),
            self.description_text.as_deref().unwrap_or(""),
        ]
        .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(title: &str, company: &str, url: &str) -> RawJob {
        RawJob {
            title: Some(title.to_string()),
            company: Some(company.to_string()),
            url: Some(url.to_string()),
            ..RawJob::new(RowOrigin::Markup)
        }
    }

    #[test]
    fn test_validate_trims_required_fields() {
        let row = raw("  Rust Engineer ", " Acme ", "https://remoteok.com/remote-jobs/1")
            .validate()
            .unwrap();
        let (title, company, url, _) = row.into_parts();
        assert_eq!(title, "Rust Engineer");
        assert_eq!(company, "Acme");
        assert_eq!(url, "https://remoteok.com/remote-jobs/1");
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        assert!(raw("   ", "Acme", "https://remoteok.com/x").validate().is_none());
        assert!(raw("Dev", "", "https://remoteok.com/x").validate().is_none());
        assert!(raw("Dev", "Acme", "").validate().is_none());
        assert!(RawJob::new(RowOrigin::Api).validate().is_none());
    }

    #[test]
    fn test_validate_requires_absolute_http_url() {
        assert!(raw("Dev", "Acme", "/remote-jobs/1").validate().is_none());
        assert!(raw("Dev", "Acme", "javascript:void(0)").validate().is_none());
        assert!(raw("Dev", "Acme", "http://remoteok.com/1").validate().is_some());
    }

    #[test]
    fn test_gate_never_increases_row_count() {
        let rows = vec![
            raw("A", "B", "https://remoteok.com/1"),
            raw("", "B", "https://remoteok.com/2"),
            raw("A", "", "https://remoteok.com/3"),
            raw("A", "B", ""),
        ];
        let total = rows.len();
        let valid = rows.into_iter().filter_map(RawJob::validate).count();
        assert!(valid <= total);
        assert_eq!(valid, 1);
    }

    #[test]
    fn test_job_type_serializes_as_label() {
        let json = serde_json::to_string(&JobType::FullTime).unwrap();
        assert_eq!(json, "\"Full-time\"");
        assert_eq!(JobType::default(), JobType::Remote);
        assert_eq!(JobType::Contract.to_string(), "Contract");
    }
}
