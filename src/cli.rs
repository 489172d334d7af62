//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// jira-rollup - effort rollups for Jira issues
///
/// Summarizes estimated, remaining and spent hours per feature and
/// assignee, from the Jira REST API or from a CSV or Excel export.
///
/// Examples:
///   jira-rollup --jql "project = PROJ AND sprint in openSprints()"
///   jira-rollup --input export.csv --console-only
///   jira-rollup --input issues.xlsx --sheet "JIRA Export"
///   jira-rollup --input export.csv --output rollup.md --export rollup.xlsx
///   jira-rollup --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// CSV or Excel export to read instead of querying the Jira API
    ///
    /// Takes precedence over --jql.
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Worksheet to read from an Excel input (defaults to the first sheet)
    #[arg(short, long, value_name = "NAME", requires = "input")]
    pub sheet: Option<String>,

    /// JQL query selecting the issues to roll up
    ///
    /// Defaults to `default_jql` from the config file.
    #[arg(short, long, value_name = "JQL", env = "JIRA_DEFAULT_JQL")]
    pub jql: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .jira-rollup.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write a report file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report file format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<ReportFormat>,

    /// Excel workbook for the summary sheets
    ///
    /// Defaults to a timestamped `jira_summary_*.xlsx` file.
    #[arg(short, long, value_name = "FILE", conflicts_with = "console_only")]
    pub export: Option<PathBuf>,

    /// Print the summary without writing the Excel workbook
    #[arg(long)]
    pub console_only: bool,

    /// Number of top contributors to list
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    /// Jira base URL
    #[arg(long, value_name = "URL", env = "JIRA_BASE_URL")]
    pub base_url: Option<String>,

    /// Jira account email
    #[arg(long, value_name = "EMAIL", env = "JIRA_USERNAME")]
    pub username: Option<String>,

    /// Jira API token
    #[arg(long, value_name = "TOKEN", env = "JIRA_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Maximum number of issues to fetch
    #[arg(long, value_name = "COUNT", env = "JIRA_MAX_RESULTS")]
    pub max_results: Option<usize>,

    /// Custom field holding the epic link
    #[arg(long, value_name = "FIELD")]
    pub epic_field: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .jira-rollup.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
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

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.top == Some(0) {
            return Err("--top must be at least 1".to_string());
        }

        if self.max_results == Some(0) {
            return Err("--max-results must be at least 1".to_string());
        }

        if let Some(ref url) = self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Jira base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
            if !input.is_file() {
                return Err(format!("Input path is not a file: {}", input.display()));
            }
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
