//! Local filesystem output.
//!
//! Jobs are appended as JSON lines. The file is opened lazily on the first
//! push, creating parent directories as needed, and flushed after every line.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::Job;
use crate::storage::JobOutput;

/// Appends one JSON object per line to a local file.
#[derive(Debug)]
pub struct JsonLinesOutput {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl JsonLinesOutput {
    /// Create an output writing to `path`. Existing content is kept.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn open(&self) -> Result<File> {
        self.ensure_dir().await?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        log::debug!("Appending jobs to {}", self.path.display());
        Ok(file)
    }
}

#[async_trait]
impl JobOutput for JsonLinesOutput {
    async fn push(&self, job: &Job) -> Result<()> {
        let mut line = serde_json::to_vec(job)?;
        line.push(b'\n');

        let mut guard = self.file.lock().await;
        if guard.is_none() {
            *guard = Some(self.open().await?);
        }
        if let Some(file) = guard.as_mut() {
            file.write_all(&line).await?;
            file.flush().await?;
        }
        Ok(())
    }
}
