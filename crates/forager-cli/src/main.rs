mod output;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use forager_client::HttpFetcher;
use forager_core::crawler::{CrawlConfig, CrawlController};
use forager_core::limiter::RateLimiter;
use forager_core::models::SearchQuery;
use forager_core::site::default_sites;

#[derive(Parser)]
#[command(name = "forager", version, about = "Job board crawler")]
struct Cli {
    /// Job title to search for
    #[arg(long, default_value = "Software Developer")]
    job_title: String,

    /// Location to search in
    #[arg(long, default_value = "Remote")]
    location: String,

    /// Crawl only the named site (LinkedIn, SimplyHired, Dice)
    #[arg(long)]
    site: Option<String>,

    /// Keyword filter; repeat the flag to add more
    #[arg(long = "keyword")]
    keywords: Vec<String>,

    /// Maximum number of jobs per run
    #[arg(long, default_value_t = 100)]
    max_jobs: usize,

    /// Override every site's configured page limit
    #[arg(long)]
    max_pages: Option<u32>,

    /// How many sites to crawl concurrently
    #[arg(long, default_value_t = 2)]
    concurrency: usize,

    /// Directory for output files
    #[arg(long, default_value = "./output")]
    output_dir: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "both")]
    format: OutputFormat,

    /// Re-run interval in hours; 0 runs a single cycle
    #[arg(long, default_value_t = 0)]
    interval: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Both,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let query = SearchQuery {
        job_title: cli.job_title.clone(),
        location: cli.location.clone(),
        keywords: cli.keywords.clone(),
        target_site: cli.site.clone(),
    };
    let config = CrawlConfig {
        max_jobs: cli.max_jobs,
        concurrency: cli.concurrency,
        max_pages: cli.max_pages,
        ..CrawlConfig::default()
    };

    let limiter = RateLimiter::new();
    let fetcher = HttpFetcher::new(limiter).context("failed to create HTTP fetcher")?;
    let controller = CrawlController::new(fetcher, default_sites(), config);

    // Ctrl-C flips the token; every sleep and in-flight fetch races it.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            signal_cancel.cancel();
        }
    });

    loop {
        tracing::info!(
            job_title = %query.job_title,
            location = %query.location,
            "starting crawl"
        );

        let records = controller.run_cycle(&query, cancel.clone()).await;

        if records.is_empty() {
            tracing::warn!("no jobs collected this cycle");
        } else {
            if matches!(cli.format, OutputFormat::Json | OutputFormat::Both) {
                let path = output::timestamped_path(&cli.output_dir, "json");
                output::write_json(&records, &path)?;
            }
            if matches!(cli.format, OutputFormat::Csv | OutputFormat::Both) {
                let path = output::timestamped_path(&cli.output_dir, "csv");
                output::write_csv(&records, &path)?;
            }
            println!("Collected {} unique jobs", records.len());
        }

        if cli.interval == 0 || cancel.is_cancelled() {
            break;
        }

        tracing::info!(hours = cli.interval, "sleeping until next cycle");
        tokio::select! {
            () = tokio::time::sleep(Duration::from_secs(cli.interval * 3600)) => {}
            () = cancel.cancelled() => break,
        }
    }

    Ok(())
}
