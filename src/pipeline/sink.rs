// src/pipeline/sink.rs

//! Deduplicating, capped emission.

use std::collections::HashSet;

use crate::error::Result;
use crate::models::Job;
use crate::storage::JobOutput;

/// Forwards unique jobs to an output until the cap is reached.
pub struct EmissionSink<'a> {
    output: &'a dyn JobOutput,
    max_jobs: usize,
    seen: HashSet<String>,
    emitted: usize,
    duplicates: usize,
}

impl<'a> EmissionSink<'a> {
    pub fn new(output: &'a dyn JobOutput, max_jobs: usize) -> Self {
        Self {
            output,
            max_jobs,
            seen: HashSet::new(),
            emitted: 0,
            duplicates: 0,
        }
    }

    /// Offer one job. Returns whether it was emitted.
    ///
    /// Refused when the cap is already reached or the URL was seen before.
    pub async fn emit(&mut self, job: Job) -> Result<bool> {
        if self.is_full() {
            return Ok(false);
        }
        if self.seen.contains(&job.url) {
            self.duplicates += 1;
            log::debug!("Skipping duplicate {}", job.url);
            return Ok(false);
        }

        self.output.push(&job).await?;
        self.seen.insert(job.url);
        self.emitted += 1;
        Ok(true)
    }

    pub fn is_full(&self) -> bool {
        self.emitted >= self.max_jobs
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}
