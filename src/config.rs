//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.ingredient-analytics.toml` files.

use crate::cli::{OutputFormat, Part};
use crate::models::CountingPolicy;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".ingredient-analytics.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Label API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Retry and backoff settings.
    #[serde(default)]
    pub retry: RetryConfig,

    /// What to analyze.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Label API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Label endpoint URL.
    #[serde(default = "default_api_url")]
    pub url: String,

    /// Optional openFDA API key (raises the rate limit).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Records requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Stop after this many records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_records: Option<usize>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Pause between page requests in milliseconds.
    #[serde(default)]
    pub page_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            api_key: None,
            page_size: default_page_size(),
            max_records: None,
            timeout_seconds: default_timeout(),
            page_delay_ms: 0,
        }
    }
}

fn default_api_url() -> String {
    "https://api.fda.gov/drug/label.json".to_string()
}

fn default_page_size() -> usize {
    99
}

fn default_timeout() -> u64 {
    30
}

/// Retry settings for transient API failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    #[serde(default = "default_retries")]
    pub max_retries: usize,

    /// First backoff delay in milliseconds, doubled on each retry.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Upper bound for a single backoff delay in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_retries(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

fn default_retries() -> usize {
    3
}

fn default_base_delay() -> u64 {
    500
}

fn default_max_delay() -> u64 {
    30_000
}

/// Analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Manufacturer name to filter labels by.
    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,

    /// How ingredient elements are counted.
    #[serde(default)]
    pub counting: CountingPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            manufacturer: default_manufacturer(),
            counting: CountingPolicy::default(),
        }
    }
}

fn default_manufacturer() -> String {
    "AstraZeneca".to_string()
}

/// Report settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Which aggregates to produce.
    #[serde(default)]
    pub part: Part,

    /// Write the report here instead of stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Write an SVG chart here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence, but only when given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref manufacturer) = args.manufacturer {
            self.analysis.manufacturer = manufacturer.clone();
        }
        if let Some(counting) = args.counting {
            self.analysis.counting = counting;
        }

        if let Some(ref url) = args.api_url {
            self.api.url = url.clone();
        }
        if let Some(ref key) = args.api_key {
            self.api.api_key = Some(key.clone());
        }
        if let Some(page_size) = args.page_size {
            self.api.page_size = page_size;
        }
        if let Some(max_records) = args.max_records {
            self.api.max_records = Some(max_records);
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }
        if let Some(delay) = args.page_delay_ms {
            self.api.page_delay_ms = delay;
        }

        if let Some(retries) = args.max_retries {
            self.retry.max_retries = retries;
        }

        if let Some(format) = args.format {
            self.report.format = format;
        }
        if let Some(part) = args.part {
            self.report.part = part;
        }
        if let Some(ref output) = args.output {
            self.report.output = Some(output.clone());
        }
        if let Some(ref chart) = args.chart {
            self.report.chart = Some(chart.clone());
        }
    }

    /// Validate the merged configuration, including values read from file.
    pub fn validate(&self) -> Result<()> {
        if !self.api.url.starts_with("http://") && !self.api.url.starts_with("https://") {
            bail!("api.url must start with 'http://' or 'https://'");
        }
        if self.analysis.manufacturer.trim().is_empty() {
            bail!("analysis.manufacturer must not be empty");
        }
        if self.api.page_size == 0 || self.api.page_size > 1000 {
            bail!("api.page_size must be between 1 and 1000");
        }
        if self.api.max_records == Some(0) {
            bail!("api.max_records must be at least 1");
        }
        if self.api.timeout_seconds == 0 {
            bail!("api.timeout_seconds must be at least 1");
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            bail!("retry.base_delay_ms must not exceed retry.max_delay_ms");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
