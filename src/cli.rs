//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Settings left unset here fall back to the
//! configuration file and then to built-in defaults.

use crate::models::CountingPolicy;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// ingredient-analytics - ingredient trends in drug labels
///
/// Queries the openFDA drug-label API for one manufacturer and reports
/// the average number of ingredients per year, and per year and route
/// of administration.
///
/// Examples:
///   ingredient-analytics
///   ingredient-analytics --manufacturer "Merck Sharp & Dohme LLC" --part b
///   ingredient-analytics --format markdown --output report.md --chart trend.svg
///   ingredient-analytics --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Manufacturer name to filter labels by
    ///
    /// Default: from config or "AstraZeneca".
    #[arg(short, long, value_name = "NAME")]
    pub manufacturer: Option<String>,

    /// Label API endpoint URL
    #[arg(long, value_name = "URL", env = "OPENFDA_API_URL")]
    pub api_url: Option<String>,

    /// openFDA API key
    #[arg(long, value_name = "KEY", env = "OPENFDA_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Records requested per page (1-1000)
    #[arg(long, value_name = "COUNT")]
    pub page_size: Option<usize>,

    /// Stop after this many records
    #[arg(long, value_name = "COUNT")]
    pub max_records: Option<usize>,

    /// Retries for rate-limited or failed requests
    #[arg(long, value_name = "COUNT")]
    pub max_retries: Option<usize>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Pause between page requests in milliseconds
    #[arg(long, value_name = "MS")]
    pub page_delay_ms: Option<u64>,

    /// Which aggregate to report (a: per year, b: per year and route)
    #[arg(long, value_name = "PART")]
    pub part: Option<Part>,

    /// Output format (table, markdown, json)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// How ingredient elements are counted (raw, distinct)
    #[arg(long, value_name = "POLICY")]
    pub counting: Option<CountingPolicy>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write an SVG chart of the trend
    #[arg(long, value_name = "FILE")]
    pub chart: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .ingredient-analytics.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .ingredient-analytics.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned plain-text tables (default)
    #[default]
    Table,
    /// Markdown document
    Markdown,
    /// JSON document
    Json,
}

/// Which aggregates to produce.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Part {
    /// Average ingredients per year
    A,
    /// Average ingredients per year and route
    B,
    /// Both aggregates (default)
    #[default]
    Both,
}

impl Part {
    pub fn includes_a(&self) -> bool {
        matches!(self, Part::A | Part::Both)
    }

    pub fn includes_b(&self) -> bool {
        matches!(self, Part::B | Part::Both)
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref manufacturer) = self.manufacturer {
            if manufacturer.trim().is_empty() {
                return Err("Manufacturer must not be empty".to_string());
            }
        }

        if let Some(page_size) = self.page_size {
            if page_size == 0 || page_size > 1000 {
                return Err("Page size must be between 1 and 1000".to_string());
            }
        }

        if self.max_records == Some(0) {
            return Err("Max records must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
