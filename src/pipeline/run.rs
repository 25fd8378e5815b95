// src/pipeline/run.rs

//! Scraper run entry point.

use std::sync::Arc;

use chrono::Utc;

use crate::error::Result;
use crate::models::{Config, RunInput, SourceMode};
use crate::pipeline::controller::{BatchController, PageController, RowPipeline, RunSummary};
use crate::pipeline::sink::EmissionSink;
use crate::services::{Fetcher, HttpSession, JobFilter, Normalizer, Parser, RetryPolicy, Transport};
use crate::storage::JobOutput;
use crate::utils::pacing::{Sleeper, TokioSleeper};

/// Run one scrape against the live source.
pub async fn run_scraper(
    config: &Config,
    input: &RunInput,
    output: &dyn JobOutput,
) -> Result<RunSummary> {
    input.validate()?;
    let proxy = input.proxy();
    let transport = Transport::new(&config.crawler, proxy.as_deref())?;
    run_with_session(config, input, output, Arc::new(transport), Arc::new(TokioSleeper)).await
}

/// Run one scrape over the given session and sleeper.
pub async fn run_with_session(
    config: &Config,
    input: &RunInput,
    output: &dyn JobOutput,
    session: Arc<dyn HttpSession>,
    sleeper: Arc<dyn Sleeper>,
) -> Result<RunSummary> {
    let start_time = Utc::now();
    let mode = input.source_mode();
    let endpoint = input.endpoint(&config.source);

    log::info!(
        "Starting {} run at {} (max {} jobs)",
        mode,
        endpoint,
        input.max_jobs
    );

    let parser = Parser::new(config)?;
    let fetcher = Fetcher::new(
        session,
        Arc::clone(&sleeper),
        RetryPolicy::from_config(&config.crawler),
    );
    let mut rows = RowPipeline::new(
        Normalizer::new(endpoint.clone()),
        JobFilter::from_input(input),
        EmissionSink::new(output, input.max_jobs),
    );

    let summary = match mode {
        SourceMode::Html => {
            PageController::new(&fetcher, &parser, sleeper, &config.crawler, input.max_pages)
                .run(&endpoint, &mut rows)
                .await?
        }
        SourceMode::Api => {
            BatchController::new(&fetcher, &parser, sleeper, &config.crawler, input.batch_size)
                .run(&endpoint, &mut rows)
                .await?
        }
    };

    let elapsed = Utc::now() - start_time;
    log::info!(
        "Run finished ({}): {} job(s) emitted, {} duplicate(s), {} filtered, {} invalid row(s), {} page(s) in {}s",
        summary.stop_reason,
        summary.emitted(),
        summary.rows.duplicates,
        summary.rows.filtered,
        summary.rows.invalid,
        summary.pages_fetched,
        elapsed.num_seconds()
    );

    Ok(summary)
}
