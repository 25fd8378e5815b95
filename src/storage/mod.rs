//! Output abstractions for emitted job records.
//!
//! Every accepted job is pushed to a [`JobOutput`] as soon as it passes the
//! sink, so a run that aborts midway keeps what it already produced.
//!
//! - `JsonLinesOutput`: one JSON object per line in a local file
//! - `StdoutOutput`: the same format on standard output
//! - `MemoryOutput`: collected in memory for tests and embedders

pub mod local;

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::Job;

pub use local::JsonLinesOutput;

/// Destination for emitted jobs.
#[async_trait]
pub trait JobOutput: Send + Sync {
    /// Persist one job.
    async fn push(&self, job: &Job) -> Result<()>;
}

/// Writes JSON lines to standard output.
#[derive(Debug, Default)]
pub struct StdoutOutput {
    stdout: tokio::sync::Mutex<Option<tokio::io::Stdout>>,
}

impl StdoutOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobOutput for StdoutOutput {
    async fn push(&self, job: &Job) -> Result<()> {
        let mut line = serde_json::to_vec(job)?;
        line.push(b'\n');

        let mut guard = self.stdout.lock().await;
        let stdout = guard.get_or_insert_with(tokio::io::stdout);
        stdout.write_all(&line).await?;
        stdout.flush().await?;
        Ok(())
    }
}

/// Keeps emitted jobs in memory.
#[derive(Debug, Default)]
pub struct MemoryOutput {
    jobs: Mutex<Vec<Job>>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything pushed so far.
    pub fn jobs(&self) -> Vec<Job> {
        self.jobs
            .lock()
            .map(|jobs| jobs.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn len(&self) -> usize {
        self.jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl JobOutput for MemoryOutput {
    async fn push(&self, job: &Job) -> Result<()> {
        let mut jobs = self
            .jobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        jobs.push(job.clone());
        Ok(())
    }
}
