//! ingredient-analytics - ingredient trends in openFDA drug labels
//!
//! A CLI tool that pages through the openFDA drug-label API for one
//! manufacturer and reports the average number of ingredients per year,
//! and per year and route of administration.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (fetch failure, bad config, I/O, etc.)
//!   2 - A requested part produced no rows

mod analysis;
mod cli;
mod config;
mod error;
mod fetcher;
mod models;
mod normalizer;
mod pipeline;
mod report;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use error::ReportError;
use fetcher::{FetchConfig, LabelFetcher, ReqwestTransport};
use indicatif::{ProgressBar, ProgressStyle};
use models::{Report, ReportMetadata};
use normalizer::Normalizer;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("ingredient-analytics v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_analysis(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: write a default configuration file.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    std::fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to change the manufacturer, paging, retries and report output.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Log lines go to stderr so a report printed to stdout stays clean.
fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

fn progress_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg} {pos} records")
    {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Run the fetch-normalize-aggregate-report workflow. Returns the exit code.
async fn run_analysis(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;
    debug!("Effective config: {:?}", config);

    let transport = ReqwestTransport::new(
        &config.api.url,
        config.api.api_key.clone(),
        Duration::from_secs(config.api.timeout_seconds),
    )?;
    let fetcher = LabelFetcher::new(transport, FetchConfig::from(&config));
    let normalizer = Normalizer::new(config.analysis.counting);
    let part = config.report.part;

    info!(
        "Fetching labels for \"{}\" from {} ({} per page, counting: {})",
        fetcher.config().manufacturer,
        config.api.url,
        fetcher.config().page_size,
        normalizer.counting()
    );

    let spinner = progress_spinner(args.quiet);
    spinner.set_message(format!("Fetching {}", config.analysis.manufacturer));
    let result = pipeline::run(&fetcher, normalizer, part, &spinner).await;
    spinner.finish_and_clear();
    let output = result?;

    let report = Report {
        metadata: ReportMetadata {
            manufacturer: config.analysis.manufacturer.clone(),
            api_url: config.api.url.clone(),
            generated_at: Utc::now(),
            counting: normalizer.counting(),
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        summary: output.summary,
        by_year: output.by_year,
        by_year_and_route: output.by_year_and_route,
    };

    let rendered = match config.report.format {
        OutputFormat::Table => report::generate_text_report(&report, part),
        OutputFormat::Markdown => report::generate_markdown_report(&report, part),
        OutputFormat::Json => report::generate_json_report(&report, part),
    };

    let rendered = match rendered {
        Ok(rendered) => rendered,
        Err(ReportError::NoData { part }) => {
            warn!("No rows for {}", part);
            eprintln!(
                "\n⛔ No data: {} produced no rows for manufacturer \"{}\" (exit code 2).",
                part, report.metadata.manufacturer
            );
            return Ok(2);
        }
        Err(e) => return Err(e.into()),
    };

    match config.report.output {
        Some(ref path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report saved to {}", path.display());
        }
        None => print!("{}", rendered),
    }

    if let Some(ref path) = config.report.chart {
        report::render_chart(&report, part, path)
            .with_context(|| format!("Failed to write chart to {}", path.display()))?;
        info!("Chart saved to {}", path.display());
    }

    if !args.quiet {
        print_summary(&report, config.report.output.as_deref());
    }

    Ok(0)
}

/// Print the run summary.
///
/// Goes to stderr when the report itself was printed to stdout.
fn print_summary(report: &Report, output: Option<&Path>) {
    let summary = &report.summary;
    let lines = [
        "\n📊 Run Summary:".to_string(),
        format!("   Manufacturer: {}", report.metadata.manufacturer),
        format!("   Pages fetched: {}", summary.pages_fetched),
        format!(
            "   Records: {} fetched | {} kept | {} skipped",
            summary.records_fetched,
            summary.records_kept,
            summary.records_skipped()
        ),
        format!("   Duration: {:.1}s", report.metadata.duration_seconds),
    ];

    match output {
        Some(path) => {
            for line in &lines {
                println!("{}", line);
            }
            println!("\n✅ Report saved to: {}", path.display());
        }
        None => {
            for line in &lines {
                eprintln!("{}", line);
            }
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
