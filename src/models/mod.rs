// src/models/mod.rs

//! Domain models for the job crawler.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod input;
mod job;
mod selectors;

// Re-export all public types
pub use config::{BrowserFamily, Config, CrawlerConfig, LoggingConfig, SourceConfig};
pub use input::{DateFilter, ProxyConfiguration, RunInput, SourceMode};
pub use job::{DEFAULT_LOCATION, Job, JobType, RawJob, RowOrigin, ValidRow};
pub use selectors::RowSelectors;
