//! jira-rollup - effort rollups for Jira issues
//!
//! A CLI tool that reads issues from the Jira REST API or a spreadsheet export,
//! normalizes their time tracking, and summarizes estimated, remaining
//! and spent hours per feature and assignee.
//!
//! Exit codes:
//!   0 - Success (including runs that match no issues)
//!   1 - Runtime or configuration error

mod analysis;
mod cli;
mod config;
mod models;
mod report;
mod source;

use analysis::{
    detect_fields, normalize_all, top_contributors, CanonicalField, FieldMapping, Normalized,
    RollupAccumulator,
};
use anyhow::{Context, Result};
use chrono::{Local, Utc};
use cli::{Args, ReportFormat};
use config::{Config, CONFIG_FILE_NAME};
use models::{Report, ReportMetadata, SourceInfo};
use source::{load_sheet, JiraClient};
use std::path::Path;
use std::time::Instant;
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

    info!("jira-rollup v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Rollup failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default config file.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Fill in base_url, username and api_token to query Jira.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
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

/// Run the complete rollup workflow.
async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let (source, normalized, rejected) = match args.input {
        Some(ref input) => read_spreadsheet(input, args.sheet.as_deref())?,
        None => fetch_from_jira(&config, args.quiet).await?,
    };

    let records_read = normalized.records_read() + rejected;
    let records_skipped = normalized.skipped.len() + rejected;
    if records_skipped > 0 {
        println!("   ⚠️  Skipped {} unusable records", records_skipped);
    }
    for skipped in &normalized.skipped {
        debug!("Record {} skipped: {}", skipped.position, skipped.error);
    }

    let mut rollup = RollupAccumulator::new();
    rollup.extend(normalized.issues);

    if rollup.is_empty() {
        warn!("No issues to summarize");
        println!("\nNo issues found. Nothing to summarize.");
        return Ok(());
    }

    let unassigned = rollup.issues().iter().filter(|i| i.is_unassigned()).count();
    let unlinked = rollup.issues().iter().filter(|i| i.is_unlinked()).count();
    info!(
        "Summarizing {} issues ({} unassigned, {} without a feature link)",
        rollup.len(),
        unassigned,
        unlinked
    );

    let tables = rollup.tables();
    let top = top_contributors(rollup.issues(), config.report.top_contributors);

    println!();
    print!("{}", report::render_summary(&tables, &top));

    if config.report.export_sheets {
        let path = args
            .export
            .clone()
            .unwrap_or_else(|| report::default_export_path(Local::now()));
        let sheets = report::export_workbook(&path, &tables, rollup.issues())?;

        println!("\n📁 Exported {} sheets to {}", sheets.len(), path.display());
        for sheet in &sheets {
            debug!("  {}", sheet);
        }
    }

    let Some(ref output) = args.output else {
        return Ok(());
    };

    let report = Report {
        metadata: ReportMetadata {
            source,
            generated_at: Utc::now(),
            records_read,
            records_skipped,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        tables,
        top_contributors: top,
        issues: rollup.into_issues(),
    };

    let content = match config.report.format {
        ReportFormat::Json => report::generate_json_report(&report)?,
        ReportFormat::Markdown => report::generate_markdown_report(&report),
    };

    std::fs::write(output, &content)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    println!("\n✅ Report saved to: {}", output.display());
    Ok(())
}

/// Load and normalize a CSV export or one sheet of a workbook.
///
/// Returns the normalized issues plus the number of rows the reader rejected.
fn read_spreadsheet(
    input: &Path,
    sheet_name: Option<&str>,
) -> Result<(SourceInfo, Normalized, usize)> {
    println!("📄 Reading spreadsheet: {}", input.display());

    let sheet = load_sheet(input, sheet_name)?;
    if let Some(ref name) = sheet.name {
        println!("📋 Using sheet: {}", name);
    }
    let mapping = detect_fields(&sheet.headers);
    print_mapping(&mapping, &sheet.headers);

    let rejected = sheet.rejected_rows;
    let normalized = normalize_all(sheet.rows, &mapping)?;

    let source = SourceInfo::Spreadsheet {
        path: input.display().to_string(),
        sheet: sheet.name,
    };
    Ok((source, normalized, rejected))
}

/// Print the detected column mapping.
fn print_mapping(mapping: &FieldMapping, headers: &[String]) {
    if mapping.is_empty() {
        warn!("No known columns detected among {} headers", headers.len());
    }

    println!("\n🔎 Detected {} of {} fields:", mapping.len(), CanonicalField::ALL.len());
    for (field, column) in mapping.iter() {
        println!("   {:<18} <- {}", field.to_string(), column);
    }

    let missing = mapping.missing(&CanonicalField::ALL);
    if !missing.is_empty() {
        let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
        println!("   Not found: {}", names.join(", "));
    }

    let unmapped = mapping.unmapped_columns(headers);
    if !unmapped.is_empty() {
        println!("   Unmapped columns: {}", unmapped.join(", "));
    }
}

/// Fetch and normalize issues from the Jira REST API.
async fn fetch_from_jira(config: &Config, quiet: bool) -> Result<(SourceInfo, Normalized, usize)> {
    let jira = &config.jira;

    println!("🔗 Connecting to Jira: {}", jira.base_url);
    let client = JiraClient::new(jira)?;
    client.test_connection().await?;

    println!("   JQL: {}", jira.default_jql);
    let issues = client
        .fetch_issues(&jira.default_jql, &jira.epic_link_field, !quiet)
        .await?;

    let mapping = FieldMapping::jira_api(&jira.epic_link_field);
    let normalized = normalize_all(issues, &mapping)?;

    let source = SourceInfo::Api {
        base_url: jira.base_url.clone(),
        jql: jira.default_jql.clone(),
    };
    Ok((source, normalized, 0))
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
