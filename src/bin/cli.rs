//! jobcrawler CLI
//!
//! Local execution entry point for scraper runs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jobcrawler::{
    error::Result,
    models::{Config, DateFilter, ProxyConfiguration, RunInput, SourceMode},
    pipeline,
    storage::{JobOutput, JsonLinesOutput, StdoutOutput},
};

/// jobcrawler - RemoteOK job scraper
#[derive(Parser, Debug)]
#[command(
    name = "jobcrawler",
    version,
    about = "Scrapes remote job postings into normalized JSON lines"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape jobs and emit them as JSON lines
    Run(RunArgs),

    /// Validate the configuration (and run input, if given)
    Validate {
        /// Run input JSON file
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Run input JSON file
    #[arg(long)]
    input: Option<PathBuf>,

    /// Append records to this file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long)]
    keyword: Option<String>,

    #[arg(long)]
    location: Option<String>,

    /// today, week, month, all, or YYYY-MM-DD
    #[arg(long)]
    date_filter: Option<DateFilter>,

    #[arg(long)]
    max_jobs: Option<usize>,

    #[arg(long)]
    max_pages: Option<u32>,

    #[arg(long)]
    batch_size: Option<usize>,

    /// html or api
    #[arg(long)]
    source: Option<SourceMode>,

    /// Feed endpoint override
    #[arg(long)]
    url: Option<String>,

    /// Forward proxy URL
    #[arg(long)]
    proxy: Option<String>,
}

impl RunArgs {
    /// Build the run input: file first, then flag overrides.
    fn into_input(self) -> Result<RunInput> {
        let mut input = match &self.input {
            Some(path) => RunInput::load(path)?,
            None => RunInput::default(),
        };

        if let Some(keyword) = self.keyword {
            input.keyword = Some(keyword);
        }
        if let Some(location) = self.location {
            input.location = Some(location);
        }
        if let Some(date_filter) = self.date_filter {
            input.date_filter = date_filter;
        }
        if let Some(max_jobs) = self.max_jobs {
            input.max_jobs = max_jobs;
        }
        if let Some(max_pages) = self.max_pages {
            input.max_pages = max_pages;
        }
        if let Some(batch_size) = self.batch_size {
            input.batch_size = batch_size;
        }
        if let Some(source) = self.source {
            input.source = Some(source);
        }
        if let Some(url) = self.url {
            input.url = Some(url);
        }
        if let Some(proxy) = self.proxy {
            input.proxy_configuration = Some(ProxyConfiguration {
                proxy_urls: vec![proxy],
                use_managed_proxy: false,
            });
        }

        Ok(input)
    }
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, configured: &str) {
    let level = if verbose { "debug" } else { configured };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        Config::load(&cli.config)
    } else {
        Ok(Config::default())
    };
    let configured_level = config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(cli.verbose, &configured_level);

    let config = config.unwrap_or_else(|e| {
        log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        );
        Config::default()
    });

    match cli.command {
        Command::Run(args) => {
            config.validate()?;
            let output_path = args.output.clone();
            let input = args.into_input()?;

            let output: Box<dyn JobOutput> = match &output_path {
                Some(path) => {
                    let output = JsonLinesOutput::new(path);
                    log::info!("Writing jobs to {}", output.path().display());
                    Box::new(output)
                }
                None => Box::new(StdoutOutput::new()),
            };

            let summary = pipeline::run_scraper(&config, &input, output.as_ref()).await?;
            log::info!(
                "Scraped {} job(s); stopped: {}",
                summary.emitted(),
                summary.stop_reason
            );
        }

        Command::Validate { input } => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            if let Some(path) = input {
                let input = RunInput::load(&path)?;
                if let Err(e) = input.validate() {
                    log::error!("Input validation failed: {}", e);
                    return Err(e);
                }
                log::info!(
                    "✓ Input OK ({} mode, endpoint {})",
                    input.source_mode(),
                    input.endpoint(&config.source)
                );
            }

            log::info!("All validations passed!");
        }
    }

    Ok(())
}
