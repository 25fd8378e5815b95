// src/services/normalizer.rs

//! Turns validated rows into canonical job records.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::{DEFAULT_LOCATION, Job, JobType, ValidRow};
use crate::utils::format_thousands;

/// Stamps provenance and derives the computed fields.
#[derive(Debug, Clone)]
pub struct Normalizer {
    source_url: String,
}

impl Normalizer {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
        }
    }

    /// Normalize with an explicit collection time.
    pub fn normalize_at(&self, row: ValidRow, now: DateTime<Utc>) -> Job {
        let (title, company, url, raw) = row.into_parts();

        let location = raw
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string());

        Job {
            title,
            company,
            url,
            location,
            job_type: derive_job_type(&raw.tags),
            salary: format_salary(raw.salary_min, raw.salary_max),
            tags: raw.tags,
            logo: raw.logo,
            date_posted: raw.date_posted,
            description_html: raw.description_html,
            description_text: raw.description_text,
            source_url: self.source_url.clone(),
            collected_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Employment type from the first tag that names one; `Remote` otherwise.
pub fn derive_job_type(tags: &[String]) -> JobType {
    tags.iter()
        .find_map(|tag| {
            let tag = tag.to_lowercase();
            if tag.contains("full") {
                Some(JobType::FullTime)
            } else if tag.contains("part") {
                Some(JobType::PartTime)
            } else if tag.contains("contract") {
                Some(JobType::Contract)
            } else {
                None
            }
        })
        .unwrap_or_default()
}

/// Human-readable salary band. Absent bounds are `None` (zero never reaches here).
pub fn format_salary(min: Option<u64>, max: Option<u64>) -> Option<String> {
    match (min.filter(|v| *v > 0), max.filter(|v| *v > 0)) {
        (Some(lo), Some(hi)) => Some(format!("${} - ${}", format_thousands(lo), format_thousands(hi))),
        (Some(lo), None) => Some(format!("${}+", format_thousands(lo))),
        (None, Some(hi)) => Some(format!("Up to ${}", format_thousands(hi))),
        (None, None) => None,
    }
}
