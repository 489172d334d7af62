//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.jira-rollup.toml` files.

use crate::analysis::DEFAULT_EPIC_LINK_FIELD;
use crate::cli::ReportFormat;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = ".jira-rollup.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Jira connection settings.
    #[serde(default)]
    pub jira: JiraConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Jira connection and query settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraConfig {
    /// Jira Cloud base URL, e.g. `https://your-domain.atlassian.net`.
    #[serde(default)]
    pub base_url: String,

    /// Account email used for basic auth.
    #[serde(default)]
    pub username: String,

    /// API token paired with the username.
    #[serde(default)]
    pub api_token: String,

    /// JQL used when none is given on the command line.
    #[serde(default = "default_jql")]
    pub default_jql: String,

    /// Upper bound on issues fetched per run.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Custom field holding the epic link.
    #[serde(default = "default_epic_link_field")]
    pub epic_link_field: String,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            api_token: String::new(),
            default_jql: default_jql(),
            max_results: default_max_results(),
            timeout_seconds: default_timeout(),
            epic_link_field: default_epic_link_field(),
        }
    }
}

fn default_jql() -> String {
    "project IS NOT EMPTY AND status != \"Done\"".to_string()
}

fn default_max_results() -> usize {
    1000
}

fn default_timeout() -> u64 {
    60
}

fn default_epic_link_field() -> String {
    DEFAULT_EPIC_LINK_FIELD.to_string()
}

impl JiraConfig {
    /// Names of the connection settings that are still empty.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        [
            ("base_url", &self.base_url),
            ("username", &self.username),
            ("api_token", &self.api_token),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Fail unless base URL, username and token are all set.
    pub fn validate_credentials(&self) -> Result<()> {
        let missing = self.missing_credentials();
        if !missing.is_empty() {
            bail!(
                "Missing Jira configuration: {}. Set them in {}, via JIRA_* environment variables, or on the command line.",
                missing.join(", "),
                CONFIG_FILE_NAME
            );
        }
        Ok(())
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Number of assignees in the top-contributor list.
    #[serde(default = "default_top_contributors")]
    pub top_contributors: usize,

    /// Format of the report file.
    #[serde(default)]
    pub format: ReportFormat,

    /// Write the Excel workbook after each run.
    #[serde(default = "default_true")]
    pub export_sheets: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_contributors: default_top_contributors(),
            format: ReportFormat::default(),
            export_sheets: true,
        }
    }
}

fn default_top_contributors() -> usize {
    5
}

fn default_true() -> bool {
    true
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
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given on the command line (or through the environment)
    /// override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref base_url) = args.base_url {
            self.jira.base_url = base_url.clone();
        }
        if let Some(ref username) = args.username {
            self.jira.username = username.clone();
        }
        if let Some(ref api_token) = args.api_token {
            self.jira.api_token = api_token.clone();
        }
        if let Some(ref jql) = args.jql {
            self.jira.default_jql = jql.clone();
        }
        if let Some(max_results) = args.max_results {
            self.jira.max_results = max_results;
        }
        if let Some(ref field) = args.epic_field {
            self.jira.epic_link_field = field.clone();
        }

        if let Some(top) = args.top {
            self.report.top_contributors = top;
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }
        if args.console_only {
            self.report.export_sheets = false;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::make_args;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.jira.max_results, 1000);
        assert_eq!(config.jira.timeout_seconds, 60);
        assert_eq!(config.jira.epic_link_field, "customfield_10014");
        assert_eq!(config.report.top_contributors, 5);
        assert_eq!(config.report.format, ReportFormat::Markdown);
        assert!(config.report.export_sheets);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[jira]
base_url = "https://acme.atlassian.net"
username = "ops@acme.test"
api_token = "secret"
max_results = 250
epic_link_field = "customfield_10008"

[report]
top_contributors = 3
format = "json"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.jira.base_url, "https://acme.atlassian.net");
        assert_eq!(config.jira.max_results, 250);
        assert_eq!(config.jira.epic_link_field, "customfield_10008");
        assert_eq!(config.jira.timeout_seconds, 60);
        assert_eq!(config.report.top_contributors, 3);
        assert_eq!(config.report.format, ReportFormat::Json);
        assert!(config.report.export_sheets);
        assert!(config.jira.validate_credentials().is_ok());
    }

    #[test]
    fn test_missing_credentials() {
        let mut jira = JiraConfig::default();
        assert_eq!(
            jira.missing_credentials(),
            vec!["base_url", "username", "api_token"]
        );

        jira.base_url = "https://acme.atlassian.net".to_string();
        jira.username = "  ".to_string();
        assert_eq!(jira.missing_credentials(), vec!["username", "api_token"]);

        let err = jira.validate_credentials().unwrap_err();
        assert!(err.to_string().contains("username, api_token"));
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        config.jira.username = "file-user".to_string();

        let mut args = make_args();
        args.base_url = Some("https://cli.atlassian.net".to_string());
        args.max_results = Some(50);
        args.top = Some(10);
        args.format = Some(ReportFormat::Json);
        args.console_only = true;

        config.merge_with_args(&args);
        assert_eq!(config.jira.base_url, "https://cli.atlassian.net");
        assert_eq!(config.jira.username, "file-user");
        assert_eq!(config.jira.max_results, 50);
        assert_eq!(config.report.top_contributors, 10);
        assert_eq!(config.report.format, ReportFormat::Json);
        assert!(!config.report.export_sheets);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[report]\ntop_contributors = 7").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.report.top_contributors, 7);
        assert_eq!(config.jira.max_results, 1000);

        writeln!(file, "not = [valid").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[jira]"));
        assert!(toml_str.contains("[report]"));
        assert!(toml_str.contains("customfield_10014"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.report.top_contributors, 5);
    }
}
