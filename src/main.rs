//! Crawl-Orchestrator main entry point
//!
//! This is the command-line interface for triggering and tracking crawl jobs
//! on a running job service.

use anyhow::Context;
use clap::{Parser, Subcommand};
use crawl_orchestrator::config::{load_config_or_default, with_service_url, Config};
use crawl_orchestrator::orchestrator::Phase;
use crawl_orchestrator::request::{ExternalSiteCrawlRequest, JobRequest, Region, RegionCrawlRequest};
use crawl_orchestrator::service::{CrawlService, HttpCrawlService};
use crawl_orchestrator::{CrawlOrchestrator, Notification, SubmitOutcome};
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

/// Crawl-Orchestrator: trigger and track job-collection crawls
///
/// Sends a crawl request to the job service, polls its status until the job
/// finishes, and prints the outcome.
#[derive(Parser, Debug)]
#[command(name = "crawl-orchestrator")]
#[command(version)]
#[command(about = "Trigger and track job-collection crawls", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Override the job service base URL
    #[arg(long, value_name = "URL", global = true)]
    service_url: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the public job board for one prefecture
    Region {
        /// Prefecture to crawl (defaults to the configured prefecture)
        #[arg(short, long)]
        prefecture: Option<String>,

        /// Maximum number of result pages
        #[arg(short, long)]
        max_pages: Option<u32>,

        /// Re-collect postings that are already stored
        #[arg(short, long)]
        force: bool,

        /// Only collect postings matching this keyword
        #[arg(short, long)]
        keyword: Option<String>,
    },

    /// Keyword search on the external job site
    External {
        /// Search keyword (empty searches all postings)
        #[arg(short, long)]
        keyword: Option<String>,

        /// Prefecture to search in
        #[arg(short, long)]
        location: Option<String>,

        /// Maximum number of result pages
        #[arg(short, long)]
        max_pages: Option<u32>,
    },

    /// Show the job service status and exit
    Status,

    /// List the accepted prefectures and exit
    Prefectures,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = load_config_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(url) = &cli.service_url {
        config = with_service_url(config, url).context("Invalid --service-url")?;
    }

    match cli.command {
        Command::Region {
            prefecture,
            max_pages,
            force,
            keyword,
        } => {
            let request = region_request(&config, prefecture, max_pages, force, keyword)?;
            handle_crawl(&config, request).await
        }
        Command::External {
            keyword,
            location,
            max_pages,
        } => {
            let request = external_request(&config, keyword, location, max_pages)?;
            handle_crawl(&config, request).await
        }
        Command::Status => handle_status(&config).await,
        Command::Prefectures => {
            for region in Region::all() {
                println!("{}", region);
            }
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_orchestrator=info,warn"),
            1 => EnvFilter::new("crawl_orchestrator=debug,info"),
            2 => EnvFilter::new("crawl_orchestrator=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Builds a region crawl request from CLI arguments over configured defaults
fn region_request(
    config: &Config,
    prefecture: Option<String>,
    max_pages: Option<u32>,
    force: bool,
    keyword: Option<String>,
) -> anyhow::Result<JobRequest> {
    let defaults = &config.region_crawl;
    let region = Region::parse(prefecture.as_deref().unwrap_or(&defaults.prefecture))?;

    let request = RegionCrawlRequest::new(region, max_pages.unwrap_or(defaults.max_pages))?
        .with_force(force || defaults.force)
        .with_keyword(keyword.unwrap_or_else(|| defaults.keyword.clone()));

    Ok(request.into())
}

/// Builds an external-site crawl request from CLI arguments over configured defaults
fn external_request(
    config: &Config,
    keyword: Option<String>,
    location: Option<String>,
    max_pages: Option<u32>,
) -> anyhow::Result<JobRequest> {
    let defaults = &config.external_crawl;
    let location = Region::parse(location.as_deref().unwrap_or(&defaults.location))?;

    let request = ExternalSiteCrawlRequest::new(
        keyword.unwrap_or_else(|| defaults.keyword.clone()),
        location,
        max_pages.unwrap_or(defaults.max_pages),
    )?;

    Ok(request.into())
}

/// Submits one job and follows it until it is settled or the user interrupts
async fn handle_crawl(config: &Config, request: JobRequest) -> anyhow::Result<()> {
    let orchestrator = CrawlOrchestrator::from_config(config)?;
    let mut notifications = orchestrator.subscribe_notifications();

    // Pick up a job started elsewhere instead of colliding with it
    if orchestrator.refresh_status().await?.is_running {
        println!("A crawl is already running on the job service; waiting for it to finish");
    } else {
        tracing::info!("Submitting {}", request);
        match orchestrator.submit(request).await {
            SubmitOutcome::Started(_) => {}
            SubmitOutcome::Failed(e) => {
                print_pending(&mut notifications);
                return Err(e.into());
            }
            SubmitOutcome::Busy | SubmitOutcome::ShutDown => {
                anyhow::bail!("Orchestrator refused the request")
            }
        }
    }

    let settled = orchestrator.wait_until_settled();
    tokio::pin!(settled);
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    let state = loop {
        tokio::select! {
            Ok(notification) = notifications.recv() => print_notification(&notification),
            state = &mut settled => break state,
            _ = &mut interrupted => {
                tracing::info!("Interrupted, stopping status polling");
                orchestrator.shutdown().await;
                print_pending(&mut notifications);
                return Ok(());
            }
        }
    };

    print_pending(&mut notifications);

    match state.phase() {
        Phase::Idle | Phase::Running => Ok(()),
        Phase::Stalled => anyhow::bail!("Status polling stopped; the job may still be running"),
        Phase::StatusUnknown => anyhow::bail!("Job status unknown"),
    }
}

/// Handles the status subcommand: prints the raw job service status
async fn handle_status(config: &Config) -> anyhow::Result<()> {
    let service = HttpCrawlService::new(&config.service)?;
    let status = service.status().await?;

    println!("Job service: {}", service.base_url());
    println!(
        "  Running: {}",
        if status.is_running { "yes" } else { "no" }
    );

    if let Some(last) = &status.last_result {
        let outcome = if last.success { "success" } else { "failure" };
        match last.count {
            Some(count) => println!("  Last result: {} ({} postings)", outcome, count),
            None => println!("  Last result: {}", outcome),
        }
    }

    if let Some(error) = &status.last_error {
        println!("  Last error: {}", error);
    }

    Ok(())
}

fn print_pending(notifications: &mut broadcast::Receiver<Notification>) {
    while let Ok(notification) = notifications.try_recv() {
        print_notification(&notification);
    }
}

fn print_notification(notification: &Notification) {
    let marker = if notification.kind.is_error() {
        "✗"
    } else {
        "✓"
    };
    println!(
        "[{}] {} {}",
        notification.at.format("%H:%M:%S"),
        marker,
        notification
    );
}
