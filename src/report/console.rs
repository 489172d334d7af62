//! Plain-text summary printed to the terminal.

use crate::models::{AggregatedRow, SummaryTables};

const RULE_WIDTH: usize = 80;

/// Render the rollup tables for the terminal.
pub fn render_summary(tables: &SummaryTables, top: &[AggregatedRow]) -> String {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);

    out.push_str(&format!("{}\nEFFORT SUMMARY BY FEATURE AND ASSIGNEE\n{}\n", rule, rule));

    for feature in &tables.by_feature {
        let feature_link = feature.feature_link.as_deref().unwrap_or_default();
        out.push_str(&format!("\nFeature: {}\n", feature_link));
        out.push_str(&format!("{}\n", "-".repeat(RULE_WIDTH / 2)));

        for row in tables.assignees_of(feature_link) {
            out.push_str(&format!(
                "  {:<25} {}\n",
                row.assignee.as_deref().unwrap_or_default(),
                metrics(row)
            ));
        }
        out.push_str(&format!("  {:<25} {}\n", "TOTAL", metrics(feature)));
    }

    out.push_str(&grand_totals_section(&tables.grand_total, &rule));
    out.push_str(&contributors_section(top));

    out
}

fn grand_totals_section(total: &AggregatedRow, rule: &str) -> String {
    let mut section = format!("\n{}\nGRAND TOTALS\n{}\n", rule, rule);
    section.push_str(&format!("  Issues:          {}\n", total.issue_count));
    section.push_str(&format!("  Estimated hours: {:.2}\n", total.estimated_hours));
    section.push_str(&format!("  Remaining hours: {:.2}\n", total.remaining_hours));
    section.push_str(&format!("  Spent hours:     {:.2}\n", total.spent_hours));
    section.push_str(&format!("  Completion:      {:.1}%\n", total.completion_percent));
    section
}

fn contributors_section(top: &[AggregatedRow]) -> String {
    if top.is_empty() {
        return String::new();
    }

    let mut section = format!("\nTop {} contributors by time spent:\n", top.len());
    for (rank, row) in top.iter().enumerate() {
        section.push_str(&format!(
            "  {}. {:<25} {:>8.2}h spent, {} issues\n",
            rank + 1,
            row.label(),
            row.spent_hours,
            row.issue_count
        ));
    }
    section
}

fn metrics(row: &AggregatedRow) -> String {
    format!(
        "est {:>8.2}h  rem {:>8.2}h  spent {:>8.2}h  ({} issues, {:.1}%)",
        row.estimated_hours,
        row.remaining_hours,
        row.spent_hours,
        row.issue_count,
        row.completion_percent
    )
}
