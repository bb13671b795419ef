//! MCQ Harvest main entry point
//!
//! This is the command-line interface for the MCQ Harvest paginated scraper.

use clap::Parser;
use mcq_harvest::config::{load_config_with_hash, Config};
use mcq_harvest::extract::GeminiExtractor;
use mcq_harvest::harvest::{HarvestObserver, HarvestReport, Harvester};
use mcq_harvest::output::{export_json, print_report};
use mcq_harvest::storage::{open_store, ResultStore, StorageResult};
use mcq_harvest::Record;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// MCQ Harvest: a resilient paginated MCQ scraper
///
/// Fetches pages through a rotating pool of relay routes, asks an AI model
/// to extract multiple-choice questions and the next page link, and follows
/// that link until pagination ends.
#[derive(Parser, Debug)]
#[command(name = "mcq-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resilient paginated MCQ scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Starting page URL for paginated scraping
    #[arg(long, value_name = "URL", conflicts_with = "html")]
    url: Option<String>,

    /// Parse a saved HTML file instead of fetching (single-page mode)
    #[arg(long, value_name = "FILE")]
    html: Option<PathBuf>,

    /// Source URL of the saved HTML, used to resolve relative links
    #[arg(long, value_name = "URL", requires = "html")]
    base_url: Option<String>,

    /// Keep and export results saved by a previous run
    #[arg(long)]
    restore: bool,

    /// Delete saved results and exit
    #[arg(long, conflicts_with_all = ["url", "html", "restore"])]
    clear: bool,

    /// Do not write the JSON export file
    #[arg(long)]
    no_export: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Prints progress lines as the harvester reports them
struct ConsoleObserver {
    quiet: bool,
}

impl HarvestObserver for ConsoleObserver {
    fn on_progress(&self, message: &str) {
        if !self.quiet {
            println!("{}", message);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    cfg
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    let store = Arc::new(open_store(Path::new(&config.output.database_path))?);

    if cli.clear {
        store.clear()?;
        println!("✓ Cleared saved results in {}", config.output.database_path);
        return Ok(());
    }

    let starting_run = cli.url.is_some() || cli.html.is_some();
    let previous = settle_previous(store.as_ref(), cli.restore, starting_run)?;

    if !starting_run {
        match previous {
            Some(records) => export(&config, &records, cli.no_export)?,
            None => println!("Nothing to do: pass --url URL or --html FILE (see --help)."),
        }
        return Ok(());
    }

    let report = handle_harvest(&cli, &config, store).await?;

    if !cli.quiet {
        println!();
        print_report(&report);
    }

    if let Some(handoff) = report.outcome.handoff_message() {
        println!("\n{}", handoff);
        if let mcq_harvest::HarvestOutcome::Blocked { locator, .. } = &report.outcome {
            println!(
                "Then rerun: mcq-harvest --html <saved-file> --base-url \"{}\"",
                locator
            );
        }
    }

    export(&config, &report.records, cli.no_export)?;

    Ok(())
}

/// Loads records saved by a previous process and applies the restore choice
///
/// With `restore` the records are returned to the caller. Without it they
/// are discarded from the store once a new run is about to start, and left
/// alone otherwise.
fn settle_previous(
    store: &dyn ResultStore,
    restore: bool,
    starting_run: bool,
) -> StorageResult<Option<Vec<Record>>> {
    let Some(records) = store.load()? else {
        return Ok(None);
    };

    if restore {
        println!("Restored {} MCQs from the previous session.", records.len());
        return Ok(Some(records));
    }

    if starting_run {
        tracing::info!(
            "Discarding {} MCQs saved by the previous session (pass --restore to keep them)",
            records.len()
        );
        store.clear()?;
    } else {
        tracing::info!(
            "{} saved MCQs found; pass --restore to keep them",
            records.len()
        );
    }
    Ok(None)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("mcq_harvest=info,warn"),
            1 => EnvFilter::new("mcq_harvest=debug,info"),
            2 => EnvFilter::new("mcq_harvest=trace,debug"),
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

/// Runs one harvest (paginated or single-page) with Ctrl-C wired to cancel
async fn handle_harvest(
    cli: &Cli,
    config: &Config,
    store: Arc<dyn ResultStore>,
) -> Result<HarvestReport, Box<dyn std::error::Error>> {
    let extractor = GeminiExtractor::from_config(&config.extraction)?;
    tracing::info!(
        "Extracting with model {} (timeout {}s per page)",
        extractor.model(),
        config.extraction.request_timeout_secs
    );

    let harvester = Arc::new(
        Harvester::from_config(config, Arc::new(extractor))?
            .with_store(store)
            .with_observer(Arc::new(ConsoleObserver { quiet: cli.quiet })),
    );

    let interrupt = {
        let harvester = Arc::clone(&harvester);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() && harvester.cancel() {
                tracing::warn!("Interrupted; keeping the records collected so far");
            }
        })
    };

    let result = if let Some(url) = &cli.url {
        tracing::info!(
            "Trying {} routes per page, pausing {:?} between pages",
            config.fetch.routes.len(),
            harvester.page_delay()
        );
        harvester.start(url).await
    } else if let Some(path) = &cli.html {
        let content = std::fs::read_to_string(path)?;
        harvester
            .start_single_page(&content, cli.base_url.as_deref())
            .await
    } else {
        return Err("either --url or --html is required".into());
    };

    interrupt.abort();

    match result {
        Ok(report) => Ok(report),
        Err(e) => {
            tracing::error!("Harvest failed to start: {}", e);
            Err(e.into())
        }
    }
}

/// Writes the JSON export unless disabled or there is nothing to write
fn export(
    config: &Config,
    records: &[Record],
    no_export: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if no_export || records.is_empty() {
        return Ok(());
    }

    export_json(records, Path::new(&config.output.export_path))?;
    println!(
        "✓ Exported {} MCQs to: {}",
        records.len(),
        config.output.export_path
    );
    Ok(())
}
