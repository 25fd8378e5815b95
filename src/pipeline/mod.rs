//! Pipeline entry points for scraper runs.
//!
//! - `run_scraper`: Fetch, extract, normalize, filter and emit jobs
//! - `PageController` / `BatchController`: listing pagination and feed batching
//! - `EmissionSink`: URL dedup and the job cap

pub mod controller;
pub mod run;
pub mod sink;

pub use controller::{BatchController, PageController, RowPipeline, RowTally, RunSummary, StopReason};
pub use run::{run_scraper, run_with_session};
pub use sink::EmissionSink;
