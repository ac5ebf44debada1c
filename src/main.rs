//! # Email Harvester CLI
//!
//! Command-line interface for the `email_harvester_core` library. It reads a
//! lead table, filters and normalizes its websites, harvests contact emails
//! for every domain, and writes the enriched table. With `--split` it instead
//! cuts the input into equally sized part files.

use email_harvester_core::{
    filter_leads, initialize_harvester, merge_results, split_table, write_chunks,
    write_domain_list, write_enriched, Config, ConfigBuilder, DomainHarvest, EnrichedRecord,
    FilteredLeads, HarvestJournal, HarvestResult, ScrapeCoordinator, Table,
};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Harvests contact email addresses for the websites in a lead table.",
    long_about = "Email Harvester scrapes each website's home page and contact pages (falling back to a headless browser) and appends the addresses it finds to the input table as email_1..email_N columns."
)]
struct AppArgs {
    /// Path to the input CSV file with a website column.
    #[arg(short, long, default_value = "input.csv", env = "EMAIL_HARVESTER_INPUT")]
    input: String,

    /// Path of the enriched CSV to write.
    #[arg(short, long, default_value = "output.csv", env = "EMAIL_HARVESTER_OUTPUT")]
    output: String,

    /// Also write the filtered, normalized lead table to this path.
    #[arg(long, env = "EMAIL_HARVESTER_FILTERED_OUTPUT")]
    filtered_output: Option<String>,

    /// Also write the distinct harvested domains, one per line, to this path.
    #[arg(long, env = "EMAIL_HARVESTER_DOMAINS_OUTPUT")]
    domains_output: Option<String>,

    /// Split the input into N part files instead of harvesting. Without a
    /// value the configured part count is used.
    #[arg(long, num_args = 0..=1, value_name = "N")]
    split: Option<Option<usize>>,

    /// Directory that receives the part_{n}.csv files in split mode.
    #[arg(long, default_value = "parts", env = "EMAIL_HARVESTER_SPLIT_DIR")]
    split_dir: String,

    /// Path to a configuration file (TOML format). CLI args override file settings.
    #[arg(long, env = "EMAIL_HARVESTER_CONFIG")]
    config_file: Option<String>,

    /// Maximum number of domains harvested concurrently.
    #[arg(short, long, env = "EMAIL_HARVESTER_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Number of email columns in the output (and addresses kept per page).
    #[arg(long, env = "EMAIL_HARVESTER_MAX_EMAILS")]
    max_emails: Option<usize>,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "EMAIL_HARVESTER_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,

    /// Total HTTP attempts per page when requests time out.
    #[arg(long, env = "EMAIL_HARVESTER_MAX_RETRIES")]
    max_retries: Option<u32>,

    /// Seconds to wait between timed-out HTTP attempts.
    #[arg(long, env = "EMAIL_HARVESTER_RETRY_DELAY")]
    retry_delay: Option<f64>,

    /// Headless page-load timeout in seconds.
    #[arg(long, env = "EMAIL_HARVESTER_PAGE_LOAD_TIMEOUT")]
    page_load_timeout: Option<u64>,

    /// URL of the running WebDriver instance used for the headless fallback.
    #[arg(long, env = "EMAIL_HARVESTER_WEBDRIVER_URL")]
    webdriver_url: Option<String>,

    /// Disable the headless browser fallback entirely.
    #[arg(long, env = "EMAIL_HARVESTER_NO_HEADLESS")]
    no_headless: bool,

    /// Name of the input column holding the website (case-insensitive).
    #[arg(long, env = "EMAIL_HARVESTER_DOMAIN_COLUMN")]
    domain_column: Option<String>,

    /// User agent string for HTTP requests.
    #[arg(long, env = "EMAIL_HARVESTER_USER_AGENT")]
    user_agent: Option<String>,

    /// JSON-lines journal of completed domains. Domains already in it are
    /// not fetched again, so an interrupted run can be resumed.
    #[arg(long, env = "EMAIL_HARVESTER_JOURNAL")]
    journal: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_thread_names(true)
        .with_target(true)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Setting up tracing subscriber failed")?;

    tracing::info!(
        "Email Harvester CLI v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let args = AppArgs::parse();
    tracing::debug!("Parsed CLI arguments: {:?}", args);

    let config = match build_config(&args) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            return Err(anyhow::anyhow!("Failed to build configuration: {}", e));
        }
    };
    tracing::debug!("Effective configuration loaded: {:?}", *config);

    let start_time = Instant::now();
    let execution_result = if args.split.is_some() {
        process_split_mode(&config, &args)
    } else {
        process_harvest_mode(config.clone(), &args, start_time).await
    };

    if let Err(e) = execution_result {
        tracing::error!("Execution failed: {:#}", e);
        return Err(e);
    }

    tracing::info!(
        "Finished successfully. Total duration: {:.2?}",
        start_time.elapsed()
    );
    Ok(())
}

fn build_config(args: &AppArgs) -> email_harvester_core::Result<Config> {
    let mut config_builder = ConfigBuilder::new();

    if let Some(ref path) = args.config_file {
        config_builder = config_builder.config_file(path);
    }
    if let Some(c) = args.concurrency {
        config_builder = config_builder.max_concurrency(c);
    }
    if let Some(n) = args.max_emails {
        config_builder = config_builder.max_emails(n);
    }
    if let Some(t) = args.request_timeout {
        config_builder = config_builder.request_timeout(Duration::from_secs(t));
    }
    if let Some(n) = args.max_retries {
        config_builder = config_builder.max_retries(n);
    }
    if let Some(secs) = args.retry_delay {
        if !secs.is_finite() || secs < 0.0 {
            return Err(email_harvester_core::AppError::Config(format!(
                "Invalid retry delay: {}",
                secs
            )));
        }
        config_builder = config_builder.retry_delay(Duration::from_secs_f64(secs));
    }
    if let Some(t) = args.page_load_timeout {
        config_builder = config_builder.page_load_timeout(Duration::from_secs(t));
    }
    if let Some(ref url) = args.webdriver_url {
        config_builder = config_builder.webdriver_url(url);
    }
    if args.no_headless {
        config_builder = config_builder.enable_headless(false);
    }
    if let Some(ref column) = args.domain_column {
        config_builder = config_builder.domain_column(column);
    }
    if let Some(ref ua) = args.user_agent {
        config_builder = config_builder.user_agent(ua);
    }
    if let Some(Some(parts)) = args.split {
        config_builder = config_builder.split_parts(parts);
    }

    config_builder.build()
}

fn process_split_mode(config: &Config, args: &AppArgs) -> Result<()> {
    tracing::info!(
        "Running in Split mode. Input: '{}', Parts: {}, Directory: '{}'",
        args.input,
        config.split_parts,
        args.split_dir
    );

    let table = load_table(&args.input)?;
    let chunks = split_table(&table, config.split_parts)
        .with_context(|| format!("Failed to split '{}'", args.input))?;
    let written = write_chunks(&chunks, Path::new(&args.split_dir))
        .with_context(|| format!("Failed to write part files to '{}'", args.split_dir))?;

    for (path, chunk) in written.iter().zip(&chunks) {
        tracing::info!("Wrote {} rows to {}", chunk.len(), path.display());
    }
    Ok(())
}

async fn process_harvest_mode(
    config: Arc<Config>,
    args: &AppArgs,
    start_time: Instant,
) -> Result<()> {
    tracing::info!(
        "Running in Harvest mode. Input: '{}', Output: '{}' (Headless fallback: {})",
        args.input,
        args.output,
        if config.enable_headless { "on" } else { "off" }
    );

    let table = load_table(&args.input)?;
    let total_rows = table.len();
    tracing::info!("Loaded {} rows from input file.", total_rows);

    let leads = filter_leads(&table, &config.domain_column, &config.excluded_platforms)
        .with_context(|| format!("Failed to filter leads from '{}'", args.input))?;

    if let Some(ref path) = args.filtered_output {
        leads
            .table
            .write_csv(Path::new(path))
            .with_context(|| format!("Failed to write filtered leads to '{}'", path))?;
        tracing::info!("Filtered leads saved to '{}'.", path);
    }
    if let Some(ref path) = args.domains_output {
        write_domain_list(Path::new(path), &leads.domains)
            .with_context(|| format!("Failed to write domain list to '{}'", path))?;
        tracing::info!("Domain list saved to '{}'.", path);
    }

    let mut journal = match args.journal {
        Some(ref path) => Some(
            HarvestJournal::open(Path::new(path))
                .with_context(|| format!("Failed to open journal '{}'", path))?,
        ),
        None => None,
    };

    let harvester = initialize_harvester(config.clone())
        .await
        .context("Failed to initialize EmailHarvester core")?;
    let coordinator = ScrapeCoordinator::new(Arc::new(harvester), config.max_concurrency);

    tracing::info!(
        "Starting email harvest for {} domains (Concurrency: {})...",
        leads.domains.len(),
        coordinator.max_concurrency()
    );

    let pb = ProgressBar::new(leads.domains.len() as u64);
    pb.set_style(ProgressStyle::default_bar()
         .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) | ETA: {eta} | {msg}")
         .context("Failed to set progress bar template")?
         .progress_chars("=> "));
    pb.set_message("Harvesting domains...");

    let on_progress = |harvest: &DomainHarvest| {
        pb.inc(1);
        pb.set_message(format!(
            "{} -> {} email(s) [{}]",
            harvest.domain.host(),
            harvest.emails.len(),
            harvest.strategy
        ));
    };

    let harvest = coordinator
        .run_with_progress(&leads.domains, journal.as_mut(), &on_progress)
        .await
        .context("Harvest failed")?;

    pb.finish_with_message(format!("Harvested {} domains", harvest.len()));

    let merged = merge_results(
        &leads.records,
        &harvest,
        config.max_emails,
        &config.rejected_emails,
    );

    tracing::info!("Saving {} enriched rows to '{}'...", merged.len(), args.output);
    write_enriched(
        Path::new(&args.output),
        &leads.table.headers,
        &merged,
        config.max_emails,
    )
    .with_context(|| format!("Failed to write output file '{}'", args.output))?;
    tracing::info!("Results saved successfully.");

    log_summary(total_rows, &leads, &harvest, &merged, start_time.elapsed());
    Ok(())
}

fn load_table(file_path: &str) -> Result<Table> {
    let path = Path::new(file_path);
    if !path.is_file() {
        return Err(anyhow::anyhow!(
            "Input file not found or is not a file: {}",
            file_path
        ));
    }
    Table::read_csv(path).with_context(|| format!("Failed to read CSV from '{}'", file_path))
}

/// Logs a summary of the run to the console using `tracing::info`.
fn log_summary(
    total_rows: usize,
    leads: &FilteredLeads,
    harvest: &HarvestResult,
    merged: &[EnrichedRecord],
    duration: Duration,
) {
    let emails_written: usize = merged.iter().map(|r| r.present_emails().count()).sum();

    tracing::info!("-------------------- Harvest Summary --------------------");
    tracing::info!("Rows in Input File          : {}", total_rows);
    tracing::info!("  - Skipped (No Website)    : {}", leads.skipped_invalid);
    tracing::info!("  - Skipped (Platform)      : {}", leads.skipped_platform);
    tracing::info!("Distinct Domains Harvested  : {}", harvest.len());
    tracing::info!("  - With Emails             : {}", harvest.domains_with_emails());
    tracing::info!(
        "  - Without Emails          : {}",
        harvest.len() - harvest.domains_with_emails()
    );
    tracing::info!("Rows Written                : {}", merged.len());
    tracing::info!("Emails Written              : {}", emails_written);
    tracing::info!("Total Time Taken            : {:.2?}", duration);
    if duration.as_secs_f64() > 0.01 && !harvest.is_empty() {
        let rate = (harvest.len() as f64) / duration.as_secs_f64();
        tracing::info!("Processing Rate             : {:.2} domains/sec", rate);
    }
    tracing::info!("---------------------------------------------------------");
}
