//! Markdown and JSON report generation.
//!
//! This module renders a [`Report`] as a Markdown document or as
//! pretty-printed JSON.

use crate::models::{AggregatedRow, IssueSummary, Report, ReportMetadata, SummaryTables};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# Jira Effort Rollup\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_totals_section(&report.tables.grand_total));
    output.push_str(&generate_feature_assignee_section(&report.tables));

    output.push_str(&generate_table_section(
        "By Feature",
        "Feature",
        &report.tables.by_feature,
    ));
    output.push_str(&generate_table_section(
        "By Assignee",
        "Assignee",
        &report.tables.by_assignee,
    ));
    output.push_str(&generate_table_section(
        "Top Contributors",
        "Assignee",
        &report.top_contributors,
    ));

    output.push_str(&generate_issues_section(&report.issues));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Records Read:** {}\n", metadata.records_read));
    if metadata.records_skipped > 0 {
        section.push_str(&format!(
            "- **Records Skipped:** {}\n",
            metadata.records_skipped
        ));
    }
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn generate_totals_section(total: &AggregatedRow) -> String {
    let mut section = String::new();

    section.push_str("## Totals\n\n");
    section.push_str("| Issues | Estimated (h) | Remaining (h) | Spent (h) | Completion |\n");
    section.push_str("|:---:|---:|---:|---:|---:|\n");
    section.push_str(&format!(
        "| {} | {:.2} | {:.2} | {:.2} | {:.1}% |\n\n",
        total.issue_count,
        total.estimated_hours,
        total.remaining_hours,
        total.spent_hours,
        total.completion_percent
    ));

    section
}

/// Feature × assignee table, with each feature's assignees listed together.
fn generate_feature_assignee_section(tables: &SummaryTables) -> String {
    let mut section = String::new();

    section.push_str("## By Feature and Assignee\n\n");
    if tables.by_feature_and_assignee.is_empty() {
        section.push_str("No issues.\n\n");
        return section;
    }

    section.push_str(
        "| Feature | Assignee | Issues | Estimated (h) | Remaining (h) | Spent (h) | Completion |\n",
    );
    section.push_str("|:---|:---|:---:|---:|---:|---:|---:|\n");

    for feature in &tables.by_feature {
        let feature_link = feature.feature_link.as_deref().unwrap_or_default();
        for row in tables.assignees_of(feature_link) {
            section.push_str(&format!(
                "| {} | {} | {} |\n",
                escape_cell(feature_link),
                escape_cell(row.assignee.as_deref().unwrap_or_default()),
                metric_cells(row)
            ));
        }
    }
    section.push('\n');

    section
}

/// A single-key table section.
fn generate_table_section(title: &str, key_header: &str, rows: &[AggregatedRow]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", title));
    section.push_str(&format!(
        "| {} | Issues | Estimated (h) | Remaining (h) | Spent (h) | Completion |\n",
        key_header
    ));
    section.push_str("|:---|:---:|---:|---:|---:|---:|\n");

    for row in rows {
        section.push_str(&format!(
            "| {} | {} |\n",
            escape_cell(&row.label()),
            metric_cells(row)
        ));
    }
    section.push('\n');

    section
}

fn metric_cells(row: &AggregatedRow) -> String {
    format!(
        "{} | {:.2} | {:.2} | {:.2} | {:.1}%",
        row.issue_count,
        row.estimated_hours,
        row.remaining_hours,
        row.spent_hours,
        row.completion_percent
    )
}

/// Generate the per-issue detail section.
fn generate_issues_section(issues: &[IssueSummary]) -> String {
    if issues.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Issues\n\n");
    section.push_str(
        "| Key | Summary | Assignee | Feature | Status | Estimated (h) | Spent (h) | Completion |\n",
    );
    section.push_str("|:---|:---|:---|:---|:---|---:|---:|---:|\n");

    for issue in issues {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {:.2} | {:.2} | {:.1}% |\n",
            escape_cell(&issue.key),
            escape_cell(&issue.summary),
            escape_cell(&issue.assignee),
            escape_cell(&issue.feature_link),
            escape_cell(&issue.status),
            issue.estimated_hours,
            issue.spent_hours,
            issue.completion_percent()
        ));
    }
    section.push('\n');

    section
}

/// Keep user text from breaking the table layout.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Generate the report footer.
fn generate_footer() -> String {
    format!(
        "---\n\n*Report generated by jira-rollup v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregator::aggregate;
    use crate::analysis::top_contributors;
    use crate::models::{issue, SourceInfo};
    use chrono::Utc;

    fn create_test_report() -> Report {
        let mut issues = vec![
            issue("PROJ-10", "PROJ-1", "Ada", 10.0, 5.0),
            issue("PROJ-11", "PROJ-1", "Grace", 4.0, 4.0),
            issue("PROJ-20", "PROJ-2", "Ada", 8.0, 2.0),
        ];
        issues[1].summary = "Fix | pipe".to_string();

        let metadata = ReportMetadata {
            source: SourceInfo::Spreadsheet {
                path: "export.csv".to_string(),
                sheet: None,
            },
            generated_at: Utc::now(),
            records_read: 4,
            records_skipped: 1,
            duration_seconds: 0.4,
        };

        Report {
            metadata,
            tables: aggregate(&issues),
            top_contributors: top_contributors(&issues, 5),
            issues,
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Jira Effort Rollup"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("- **Source:** export.csv"));
        assert!(markdown.contains("- **Records Skipped:** 1"));
        assert!(markdown.contains("## By Feature and Assignee"));
        assert!(markdown.contains("## Top Contributors"));
        assert!(markdown.contains("| PROJ-1 | Ada | 1 | 10.00 | 5.00 | 5.00 | 50.0% |"));
        assert!(markdown.contains("| 3 | 22.00 | 11.00 | 11.00 | 50.0% |"));
        assert!(markdown.contains("Fix \\| pipe"));
    }

    #[test]
    fn test_feature_rows_grouped() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        let grace = markdown.find("| PROJ-1 | Grace |").unwrap();
        let second_feature = markdown.find("| PROJ-2 | Ada |").unwrap();
        assert!(grace < second_feature);
    }

    #[test]
    fn test_empty_report() {
        let mut report = create_test_report();
        report.issues.clear();
        report.tables = aggregate(&[]);
        report.top_contributors.clear();

        let markdown = generate_markdown_report(&report);
        assert!(markdown.contains("No issues."));
        assert!(!markdown.contains("## Issues"));
        assert!(!markdown.contains("## Top Contributors"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["metadata"]["source"]["kind"], "spreadsheet");
        assert_eq!(parsed["tables"]["grand_total"]["issue_count"], 3);
        assert_eq!(parsed["issues"][0]["key"], "PROJ-10");
        assert!(parsed["tables"]["by_feature"][0].get("assignee").is_none());
    }
}
