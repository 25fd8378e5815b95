// src/services/filter.rs

//! Keyword, location and recency filtering.

use chrono::{DateTime, Utc};

use crate::models::{DateFilter, Job, RunInput};

/// AND-combined predicate over normalized jobs.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    keyword: Option<String>,
    location: Option<String>,
    recency: DateFilter,
}

impl JobFilter {
    pub fn new(keyword: Option<&str>, location: Option<&str>, recency: DateFilter) -> Self {
        Self {
            keyword: needle(keyword),
            location: needle(location),
            recency,
        }
    }

    pub fn from_input(input: &RunInput) -> Self {
        Self::new(
            input.keyword.as_deref(),
            input.location.as_deref(),
            input.date_filter,
        )
    }

    /// Whether a job passes every active criterion.
    pub fn accepts(&self, job: &Job, now: DateTime<Utc>) -> bool {
        if let Some(keyword) = &self.keyword {
            if !job.searchable_text().to_lowercase().contains(keyword) {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if !job.location.to_lowercase().contains(location) {
                return false;
            }
        }
        self.is_recent(job, now)
    }

    /// Jobs without a parseable date are kept.
    fn is_recent(&self, job: &Job, now: DateTime<Utc>) -> bool {
        let Some(posted) = job.posted_at() else {
            return true;
        };
        match self.recency {
            DateFilter::All => true,
            DateFilter::Since(floor) => posted.date_naive() >= floor,
            window => match window.window_days() {
                Some(days) => (now - posted).num_days() <= days,
                None => true,
            },
        }
    }
}

fn needle(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}
