// src/pipeline/controller.rs

//! Pagination and batch continuation.
//!
//! Both controllers feed parsed rows through the same [`RowPipeline`]
//! (gate, normalize, filter, emit) and differ only in how they obtain rows.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::error::Result;
use crate::models::{CrawlerConfig, Job, RawJob};
use crate::pipeline::sink::EmissionSink;
use crate::services::{Fetcher, JobFilter, Normalizer, Parser, Payload, PayloadKind};
use crate::utils::pacing::{DelayRange, Sleeper};
use crate::utils::url::next_page_url;

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    CapReached,
    MaxPages,
    EmptyPages,
    FetchFailures,
    Exhausted,
    Aborted(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::CapReached => f.write_str("job cap reached"),
            StopReason::MaxPages => f.write_str("page limit reached"),
            StopReason::EmptyPages => f.write_str("consecutive empty pages"),
            StopReason::FetchFailures => f.write_str("consecutive fetch failures"),
            StopReason::Exhausted => f.write_str("source exhausted"),
            StopReason::Aborted(error) => write!(f, "aborted: {error}"),
        }
    }
}

/// Row counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowTally {
    /// Rows produced by the parser
    pub extracted: usize,
    /// Rows rejected by the required-field gate
    pub invalid: usize,
    /// Jobs rejected by the filter
    pub filtered: usize,
    pub duplicates: usize,
    pub emitted: usize,
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub stop_reason: StopReason,
    pub pages_fetched: u32,
    pub rows: RowTally,
}

impl RunSummary {
    pub fn emitted(&self) -> usize {
        self.rows.emitted
    }
}

/// Gate, normalize, filter and emit.
pub struct RowPipeline<'a> {
    normalizer: Normalizer,
    filter: JobFilter,
    sink: EmissionSink<'a>,
    tally: RowTally,
}

impl<'a> RowPipeline<'a> {
    pub fn new(normalizer: Normalizer, filter: JobFilter, sink: EmissionSink<'a>) -> Self {
        Self {
            normalizer,
            filter,
            sink,
            tally: RowTally::default(),
        }
    }

    /// Run rows through the whole chain. Returns how many passed the gate.
    pub async fn process_rows(&mut self, rows: Vec<RawJob>) -> Result<usize> {
        let jobs = self.prepare(rows);
        let valid = jobs.len();
        self.offer(jobs).await?;
        Ok(valid)
    }

    /// Gate and normalize.
    pub fn prepare(&mut self, rows: Vec<RawJob>) -> Vec<Job> {
        self.tally.extracted += rows.len();
        let now = Utc::now();

        let mut jobs = Vec::with_capacity(rows.len());
        for row in rows {
            match row.validate() {
                Some(valid) => jobs.push(self.normalizer.normalize_at(valid, now)),
                None => self.tally.invalid += 1,
            }
        }
        jobs
    }

    /// Filter and emit until the sink is full.
    pub async fn offer(&mut self, jobs: Vec<Job>) -> Result<()> {
        let now = Utc::now();
        for job in jobs {
            if self.sink.is_full() {
                break;
            }
            if !self.filter.accepts(&job, now) {
                self.tally.filtered += 1;
                continue;
            }
            self.sink.emit(job).await?;
        }
        self.tally.duplicates = self.sink.duplicates();
        self.tally.emitted = self.sink.emitted();
        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.sink.is_full()
    }

    pub fn tally(&self) -> RowTally {
        self.tally
    }

    fn summary(&self, stop_reason: StopReason, pages_fetched: u32) -> RunSummary {
        RunSummary {
            stop_reason,
            pages_fetched,
            rows: self.tally,
        }
    }
}

/// Walks listing pages via the `pg` query parameter.
pub struct PageController<'a> {
    fetcher: &'a Fetcher,
    parser: &'a Parser,
    sleeper: Arc<dyn Sleeper>,
    page_delay: DelayRange,
    max_pages: u32,
    max_empty_pages: u32,
    max_fetch_failures: u32,
}

impl<'a> PageController<'a> {
    pub fn new(
        fetcher: &'a Fetcher,
        parser: &'a Parser,
        sleeper: Arc<dyn Sleeper>,
        config: &CrawlerConfig,
        max_pages: u32,
    ) -> Self {
        Self {
            fetcher,
            parser,
            sleeper,
            page_delay: DelayRange::new(config.page_delay_min_ms, config.page_delay_max_ms),
            max_pages,
            max_empty_pages: config.max_empty_pages.max(1),
            max_fetch_failures: config.max_fetch_failures.max(1),
        }
    }

    /// Crawl from `start_url` until a stop condition holds.
    ///
    /// Fatal fetch or decode errors end the run as `Aborted`; only output
    /// failures are returned as errors.
    pub async fn run(&self, start_url: &str, rows: &mut RowPipeline<'_>) -> Result<RunSummary> {
        let mut url = start_url.to_string();
        let mut pages_fetched = 0;
        let mut empty_streak = 0;
        let mut failure_streak = 0;
        let mut first = true;

        let stop_reason = loop {
            if rows.is_full() {
                break StopReason::CapReached;
            }
            if pages_fetched >= self.max_pages {
                break StopReason::MaxPages;
            }

            if !first {
                self.sleeper.sleep(self.page_delay.pick()).await;
            }
            first = false;

            log::info!("Fetching page {} ({})", pages_fetched + 1, url);
            let body = match self.fetcher.fetch(&url, PayloadKind::Markup).await {
                Ok(body) => {
                    failure_streak = 0;
                    body
                }
                Err(e) if e.is_fatal() => break StopReason::Aborted(e.to_string()),
                Err(e) => {
                    failure_streak += 1;
                    log::warn!(
                        "Page fetch failed ({}/{}): {}",
                        failure_streak,
                        self.max_fetch_failures,
                        e
                    );
                    if failure_streak >= self.max_fetch_failures {
                        break StopReason::FetchFailures;
                    }
                    continue;
                }
            };
            pages_fetched += 1;

            let raw = match self.parser.parse(&Payload::new(PayloadKind::Markup, body)) {
                Ok(raw) => raw,
                Err(e) if e.is_fatal() => break StopReason::Aborted(e.to_string()),
                Err(e) => return Err(e),
            };

            let valid = rows.process_rows(raw).await?;
            log::info!(
                "Page {}: {} valid row(s), {} emitted so far",
                pages_fetched,
                valid,
                rows.tally().emitted
            );

            if valid == 0 {
                empty_streak += 1;
                if empty_streak >= self.max_empty_pages {
                    break StopReason::EmptyPages;
                }
            } else {
                empty_streak = 0;
            }

            url = match next_page_url(&url) {
                Ok(next) => next,
                Err(e) => break StopReason::Aborted(e.to_string()),
            };
        };

        Ok(rows.summary(stop_reason, pages_fetched))
    }
}

/// Fetches the feed once and emits it in batches.
pub struct BatchController<'a> {
    fetcher: &'a Fetcher,
    parser: &'a Parser,
    sleeper: Arc<dyn Sleeper>,
    batch_delay: Duration,
    batch_size: usize,
}

impl<'a> BatchController<'a> {
    pub fn new(
        fetcher: &'a Fetcher,
        parser: &'a Parser,
        sleeper: Arc<dyn Sleeper>,
        config: &CrawlerConfig,
        batch_size: usize,
    ) -> Self {
        Self {
            fetcher,
            parser,
            sleeper,
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            batch_size: batch_size.max(1),
        }
    }

    pub async fn run(&self, url: &str, rows: &mut RowPipeline<'_>) -> Result<RunSummary> {
        log::info!("Fetching feed {url}");
        let body = match self.fetcher.fetch(url, PayloadKind::Api).await {
            Ok(body) => body,
            Err(e) if e.is_fatal() => {
                return Ok(rows.summary(StopReason::Aborted(e.to_string()), 0));
            }
            Err(e) => {
                log::warn!("Feed fetch failed: {e}");
                return Ok(rows.summary(StopReason::FetchFailures, 0));
            }
        };

        let raw = match self.parser.parse(&Payload::new(PayloadKind::Api, body)) {
            Ok(raw) => raw,
            Err(e) if e.is_fatal() => {
                log::error!("Feed could not be decoded: {e}");
                return Ok(rows.summary(StopReason::Aborted(e.to_string()), 1));
            }
            Err(e) => return Err(e),
        };

        let jobs = rows.prepare(raw);
        log::info!("Feed yielded {} valid job(s)", jobs.len());

        for (index, batch) in jobs.chunks(self.batch_size).enumerate() {
            if rows.is_full() {
                break;
            }
            if index > 0 {
                self.sleeper.sleep(self.batch_delay).await;
            }
            rows.offer(batch.to_vec()).await?;
            log::debug!(
                "Batch {}: {} emitted so far",
                index + 1,
                rows.tally().emitted
            );
        }

        let stop_reason = if rows.is_full() {
            StopReason::CapReached
        } else {
            StopReason::Exhausted
        };
        Ok(rows.summary(stop_reason, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Config, DateFilter};
    use crate::services::RetryPolicy;
    use crate::services::fetcher::testing::{ScriptedSession, ok, status};
    use crate::storage::MemoryOutput;
    use crate::utils::pacing::testing::RecordingSleeper;

    const LISTING: &str = "https://remoteok.com/remote-jobs";
    const FEED: &str = "https://remoteok.com/api";

    struct Harness {
        session: Arc<ScriptedSession>,
        sleeper: Arc<RecordingSleeper>,
        fetcher: Fetcher,
        parser: Parser,
        config: Config,
    }

    fn harness(script: Vec<Result<crate::services::RawResponse>>, max_attempts: u32) -> Harness {
        let config = Config::default();
        let session = Arc::new(ScriptedSession::new(script));
        let sleeper = Arc::new(RecordingSleeper::default());
        let policy = RetryPolicy {
            max_attempts,
            ..RetryPolicy::from_config(&config.crawler)
        };
        Harness {
            fetcher: Fetcher::new(session.clone(), sleeper.clone(), policy),
            parser: Parser::new(&config).unwrap(),
            session,
            sleeper,
            config,
        }
    }

    fn pipeline(output: &MemoryOutput, max_jobs: usize) -> RowPipeline<'_> {
        RowPipeline::new(
            Normalizer::new(LISTING),
            JobFilter::default(),
            EmissionSink::new(output, max_jobs),
        )
    }

    fn job_row(id: u32) -> String {
        format!(
            r#"<tr class="job" data-id="{id}"><td class="company">
                <a class="preventLink" href="/remote-jobs/{id}"><h2 itemprop="title">Engineer {id}</h2></a>
                <h3 itemprop="name">Company {id}</h3></td></tr>"#
        )
    }

    fn ad_row() -> String {
        r#"<tr class="job ad"><td><a class="preventLink" href="/sponsor"><h2 itemprop="title">Buy</h2></a><h3 itemprop="name">Ads</h3></td></tr>"#
            .to_string()
    }

    /// Listing page padded past the short-body threshold.
    fn page(rows: &[String]) -> String {
        format!(
            "<html><body><table id=\"jobsboard\">{}</table><footer>{}</footer></body></html>",
            rows.join(""),
            "remote work ".repeat(100)
        )
    }

    fn empty_page() -> String {
        page(&[])
    }

    #[tokio::test]
    async fn test_markup_page_skips_ad_rows() {
        let h = harness(vec![ok(page(&[job_row(1), ad_row(), job_row(2)]))], 3);
        let output = MemoryOutput::new();
        let mut rows = pipeline(&output, 100);

        let controller = PageController::new(&h.fetcher, &h.parser, h.sleeper.clone(), &h.config.crawler, 1);
        let summary = controller.run(LISTING, &mut rows).await.unwrap();

        assert_eq!(summary.stop_reason, StopReason::MaxPages);
        assert_eq!(summary.emitted(), 2);
        let titles: Vec<_> = output.jobs().into_iter().map(|j| j.title).collect();
        assert_eq!(titles, vec!["Engineer 1", "Engineer 2"]);
    }

    #[tokio::test]
    async fn test_cap_stops_before_next_fetch() {
        let rows_html: Vec<_> = (1..=5).map(job_row).collect();
        let h = harness(vec![ok(page(&rows_html)), ok(page(&rows_html))], 3);
        let output = MemoryOutput::new();
        let mut rows = pipeline(&output, 2);

        let controller = PageController::new(&h.fetcher, &h.parser, h.sleeper.clone(), &h.config.crawler, 10);
        let summary = controller.run(LISTING, &mut rows).await.unwrap();

        assert_eq!(summary.stop_reason, StopReason::CapReached);
        assert_eq!(summary.emitted(), 2);
        assert_eq!(output.len(), 2);
        assert_eq!(h.session.requested(), vec![LISTING.to_string()]);
        assert!(h.sleeper.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_pages_advance_and_stop_after_empty_streak() {
        let h = harness(
            vec![
                ok(page(&[job_row(1), job_row(2)])),
                ok(page(&[job_row(2), job_row(3)])),
                ok(empty_page()),
                ok(empty_page()),
                ok(empty_page()),
            ],
            3,
        );
        let output = MemoryOutput::new();
        let mut rows = pipeline(&output, 100);

        let controller = PageController::new(&h.fetcher, &h.parser, h.sleeper.clone(), &h.config.crawler, 10);
        let summary = controller.run(LISTING, &mut rows).await.unwrap();

        assert_eq!(summary.stop_reason, StopReason::EmptyPages);
        assert_eq!(summary.pages_fetched, 5);
        assert_eq!(summary.emitted(), 3);
        assert_eq!(summary.rows.duplicates, 1);
        assert_eq!(
            h.session.requested(),
            vec![
                LISTING.to_string(),
                format!("{LISTING}?pg=2"),
                format!("{LISTING}?pg=3"),
                format!("{LISTING}?pg=4"),
                format!("{LISTING}?pg=5"),
            ]
        );

        let delays = h.sleeper.recorded();
        assert_eq!(delays.len(), 4);
        let range = DelayRange::new(800, 2000);
        assert!(delays.iter().all(|d| range.contains(*d)));
    }

    #[tokio::test]
    async fn test_failed_page_is_retried_without_advancing() {
        let h = harness(Vec::new(), 1);
        let output = MemoryOutput::new();
        let mut rows = pipeline(&output, 100);

        let controller = PageController::new(&h.fetcher, &h.parser, h.sleeper.clone(), &h.config.crawler, 10);
        let summary = controller.run(LISTING, &mut rows).await.unwrap();

        assert_eq!(summary.stop_reason, StopReason::FetchFailures);
        assert_eq!(summary.pages_fetched, 0);
        assert_eq!(h.session.requested(), vec![LISTING.to_string(); 3]);
        assert_eq!(summary.emitted(), 0);
    }

    #[tokio::test]
    async fn test_fatal_status_aborts_and_keeps_emitted() {
        let h = harness(vec![ok(page(&[job_row(1)])), status(404, "gone")], 1);
        let output = MemoryOutput::new();
        let mut rows = pipeline(&output, 100);

        let controller = PageController::new(&h.fetcher, &h.parser, h.sleeper.clone(), &h.config.crawler, 10);
        let summary = controller.run(LISTING, &mut rows).await.unwrap();

        assert!(matches!(summary.stop_reason, StopReason::Aborted(_)));
        assert_eq!(summary.emitted(), 1);
        assert_eq!(output.len(), 1);
    }

    #[tokio::test]
    async fn test_last_page_number_aborts_instead_of_wrapping() {
        let h = harness(vec![ok(page(&[job_row(1)]))], 3);
        let output = MemoryOutput::new();
        let mut rows = pipeline(&output, 100);
        let start = format!("{LISTING}?pg=4294967295");

        let controller = PageController::new(&h.fetcher, &h.parser, h.sleeper.clone(), &h.config.crawler, 10);
        let summary = controller.run(&start, &mut rows).await.unwrap();

        assert!(matches!(summary.stop_reason, StopReason::Aborted(_)));
        assert_eq!(summary.pages_fetched, 1);
        assert_eq!(output.len(), 1);
        assert_eq!(h.session.requested(), vec![start]);
    }

    #[tokio::test]
    async fn test_filter_rejections_are_counted() {
        let h = harness(vec![ok(page(&[job_row(1), job_row(2)]))], 3);
        let output = MemoryOutput::new();
        let mut rows = RowPipeline::new(
            Normalizer::new(LISTING),
            JobFilter::new(Some("engineer 2"), None, DateFilter::All),
            EmissionSink::new(&output, 100),
        );

        let controller = PageController::new(&h.fetcher, &h.parser, h.sleeper.clone(), &h.config.crawler, 1);
        let summary = controller.run(LISTING, &mut rows).await.unwrap();

        assert_eq!(summary.emitted(), 1);
        assert_eq!(summary.rows.filtered, 1);
        assert_eq!(output.jobs()[0].title, "Engineer 2");
    }

    const FEED_BODY: &str = r#"[
        {"legal": "API Terms of Service"},
        {"id": 1, "position": "Backend Engineer", "company": "Acme", "tags": ["full time"]},
        {"id": 2, "position": "Designer", "company": "Globex"},
        {"id": 3, "position": "SRE", "company": "Initech", "salary_min": 50000}
    ]"#;

    #[tokio::test]
    async fn test_batch_mode_emits_all_jobs() {
        let h = harness(vec![ok(FEED_BODY)], 3);
        let output = MemoryOutput::new();
        let mut rows = pipeline(&output, 100);

        let controller = BatchController::new(&h.fetcher, &h.parser, h.sleeper.clone(), &h.config.crawler, 2);
        let summary = controller.run(FEED, &mut rows).await.unwrap();

        assert_eq!(summary.stop_reason, StopReason::Exhausted);
        assert_eq!(summary.emitted(), 3);
        assert_eq!(h.sleeper.recorded(), vec![Duration::from_millis(250)]);

        let jobs = output.jobs();
        assert_eq!(jobs[0].url, "https://remoteok.com/remote-jobs/1");
        assert_eq!(jobs[2].salary.as_deref(), Some("$50,000+"));
    }

    #[tokio::test]
    async fn test_batch_mode_respects_cap() {
        let h = harness(vec![ok(FEED_BODY)], 3);
        let output = MemoryOutput::new();
        let mut rows = pipeline(&output, 2);

        let controller = BatchController::new(&h.fetcher, &h.parser, h.sleeper.clone(), &h.config.crawler, 1);
        let summary = controller.run(FEED, &mut rows).await.unwrap();

        assert_eq!(summary.stop_reason, StopReason::CapReached);
        assert_eq!(output.len(), 2);
        assert_eq!(h.session.requested().len(), 1);
    }

    #[tokio::test]
    async fn test_batch_mode_aborts_on_undecodable_feed() {
        let h = harness(vec![ok("<html>maintenance</html>")], 3);
        let output = MemoryOutput::new();
        let mut rows = pipeline(&output, 100);

        let controller = BatchController::new(&h.fetcher, &h.parser, h.sleeper.clone(), &h.config.crawler, 50);
        let summary = controller.run(FEED, &mut rows).await.unwrap();

        assert!(matches!(summary.stop_reason, StopReason::Aborted(_)));
        assert!(output.is_empty());
    }
}
