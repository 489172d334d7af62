//! Excel export of the rollup tables.
//!
//! Writes one workbook with a sheet per table: `Summary by Feature & Assignee`,
//! `Detailed Issues`, `Summary by Feature` and `Summary by Assignee`.

use crate::analysis::aggregator::round_to;
use crate::models::{AggregatedRow, IssueSummary, SummaryTables};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use rust_xlsxwriter::{Format, Workbook};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const FEATURE_ASSIGNEE_SHEET: &str = "Summary by Feature & Assignee";
pub const DETAILED_ISSUES_SHEET: &str = "Detailed Issues";
pub const FEATURE_SHEET: &str = "Summary by Feature";
pub const ASSIGNEE_SHEET: &str = "Summary by Assignee";

const METRIC_COLUMNS: [&str; 5] = [
    "Estimated Hours",
    "Remaining Hours",
    "Spent Hours",
    "Issue Count",
    "Completion %",
];

const ISSUE_COLUMNS: [&str; 13] = [
    "Key",
    "Summary",
    "Assignee",
    "Feature Link",
    "Status",
    "Priority",
    "Issue Type",
    "Estimated Hours",
    "Remaining Hours",
    "Spent Hours",
    "Completion %",
    "Created",
    "Updated",
];

const COLUMN_WIDTH: f64 = 18.0;

/// Default workbook name for a run started at `now`.
pub fn default_export_path(now: DateTime<Local>) -> PathBuf {
    PathBuf::from(format!("jira_summary_{}.xlsx", now.format("%Y%m%d_%H%M%S")))
}

/// A single worksheet cell.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Cell<'a> {
    Text(&'a str),
    Number(f64),
}

/// Cells of a summary row. Key columns absent from a table are skipped.
fn summary_cells(row: &AggregatedRow) -> Vec<Cell<'_>> {
    let mut cells: Vec<Cell<'_>> = [row.feature_link.as_deref(), row.assignee.as_deref()]
        .into_iter()
        .flatten()
        .map(Cell::Text)
        .collect();

    cells.extend([
        Cell::Number(row.estimated_hours),
        Cell::Number(row.remaining_hours),
        Cell::Number(row.spent_hours),
        Cell::Number(row.issue_count as f64),
        Cell::Number(row.completion_percent),
    ]);
    cells
}

fn issue_cells(issue: &IssueSummary) -> Vec<Cell<'_>> {
    vec![
        Cell::Text(&issue.key),
        Cell::Text(&issue.summary),
        Cell::Text(&issue.assignee),
        Cell::Text(&issue.feature_link),
        Cell::Text(&issue.status),
        Cell::Text(&issue.priority),
        Cell::Text(&issue.issue_type),
        Cell::Number(issue.estimated_hours),
        Cell::Number(issue.remaining_hours),
        Cell::Number(issue.spent_hours),
        Cell::Number(round_to(issue.completion_percent(), 1)),
        Cell::Text(&issue.created),
        Cell::Text(&issue.updated),
    ]
}

fn summary_columns(keys: &[&'static str]) -> Vec<&'static str> {
    keys.iter().chain(METRIC_COLUMNS.iter()).copied().collect()
}

/// Write every sheet into one workbook at `path`, creating parent directories.
///
/// Returns the names of the written sheets.
pub fn export_workbook(
    path: &Path,
    tables: &SummaryTables,
    issues: &[IssueSummary],
) -> Result<Vec<&'static str>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create export directory: {}", parent.display()))?;
    }

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    write_sheet(
        &mut workbook,
        &header,
        FEATURE_ASSIGNEE_SHEET,
        &summary_columns(&["Feature Link", "Assignee"]),
        tables.by_feature_and_assignee.iter().map(summary_cells),
    )?;
    write_sheet(
        &mut workbook,
        &header,
        DETAILED_ISSUES_SHEET,
        &ISSUE_COLUMNS,
        issues.iter().map(issue_cells),
    )?;
    write_sheet(
        &mut workbook,
        &header,
        FEATURE_SHEET,
        &summary_columns(&["Feature Link"]),
        tables.by_feature.iter().map(summary_cells),
    )?;
    write_sheet(
        &mut workbook,
        &header,
        ASSIGNEE_SHEET,
        &summary_columns(&["Assignee"]),
        tables.by_assignee.iter().map(summary_cells),
    )?;

    workbook
        .save(path)
        .with_context(|| format!("Failed to write workbook: {}", path.display()))?;

    let sheets = vec![
        FEATURE_ASSIGNEE_SHEET,
        DETAILED_ISSUES_SHEET,
        FEATURE_SHEET,
        ASSIGNEE_SHEET,
    ];
    info!("Exported {} sheets to {}", sheets.len(), path.display());
    Ok(sheets)
}

fn write_sheet<'a, I>(
    workbook: &mut Workbook,
    header: &Format,
    name: &str,
    columns: &[&str],
    rows: I,
) -> Result<()>
where
    I: IntoIterator<Item = Vec<Cell<'a>>>,
{
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(name)
        .with_context(|| format!("Invalid sheet name: {}", name))?;

    for (col, column) in columns.iter().enumerate() {
        let col = u16::try_from(col).context("Too many columns for one sheet")?;
        worksheet.write_string_with_format(0, col, *column, header)?;
        worksheet.set_column_width(col, COLUMN_WIDTH)?;
    }

    let mut count = 0;
    for (index, cells) in rows.into_iter().enumerate() {
        let row = u32::try_from(index + 1).context("Too many rows for one sheet")?;
        for (col, cell) in cells.into_iter().enumerate() {
            let col = u16::try_from(col).context("Too many columns for one sheet")?;
            match cell {
                Cell::Text(text) => worksheet.write_string(row, col, text)?,
                Cell::Number(value) => worksheet.write_number(row, col, value)?,
            };
        }
        count += 1;
    }

    debug!("Wrote {} rows to sheet '{}'", count, name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregator::aggregate;
    use crate::models::issue;
    use calamine::{open_workbook_auto, Data, Reader};
    use chrono::TimeZone;

    #[test]
    fn test_default_export_path() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            default_export_path(now),
            PathBuf::from("jira_summary_20240309_140507.xlsx")
        );
    }

    fn text(s: &str) -> Data {
        Data::String(s.to_string())
    }

    #[test]
    fn test_export_workbook_reads_back() {
        let issues = vec![
            issue("P-1", "PROJ-1", "Ada", 10.0, 5.0),
            issue("P-2", "PROJ-2", "Bo", 3.0, 1.0),
        ];
        let tables = aggregate(&issues);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("rollup.xlsx");

        let sheets = export_workbook(&path, &tables, &issues).unwrap();
        assert_eq!(sheets.len(), 4);
        assert!(path.exists());

        let mut workbook = open_workbook_auto(&path).unwrap();
        assert_eq!(
            workbook.sheet_names(),
            vec![
                FEATURE_ASSIGNEE_SHEET,
                DETAILED_ISSUES_SHEET,
                FEATURE_SHEET,
                ASSIGNEE_SHEET
            ]
        );

        let by_pair = workbook.worksheet_range(FEATURE_ASSIGNEE_SHEET).unwrap();
        let rows: Vec<&[Data]> = by_pair.rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], text("Feature Link"));
        assert_eq!(rows[0][6], text("Completion %"));
        assert_eq!(
            rows[2],
            &[
                text("PROJ-2"),
                text("Bo"),
                Data::Float(3.0),
                Data::Float(2.0),
                Data::Float(1.0),
                Data::Float(1.0),
                Data::Float(33.3),
            ][..]
        );

        let detail = workbook.worksheet_range(DETAILED_ISSUES_SHEET).unwrap();
        assert_eq!(detail.rows().count(), 3);
        assert_eq!(detail.rows().nth(1).unwrap()[0], text("P-1"));
        assert_eq!(detail.rows().nth(1).unwrap()[10], Data::Float(50.0));

        let by_assignee = workbook.worksheet_range(ASSIGNEE_SHEET).unwrap();
        let header: Vec<&Data> = by_assignee.rows().next().unwrap().iter().collect();
        assert_eq!(header[0], &text("Assignee"));
        assert_eq!(header[1], &text("Estimated Hours"));
    }

    #[test]
    fn test_export_empty_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        export_workbook(&path, &aggregate(&[]), &[]).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        let by_feature = workbook.worksheet_range(FEATURE_SHEET).unwrap();
        assert_eq!(by_feature.rows().count(), 1);
    }

    #[test]
    fn test_issue_completion_rounds_half_to_even() {
        let quarter = issue("P-1", "F", "A", 400.0, 1.0);
        assert_eq!(issue_cells(&quarter)[10], Cell::Number(0.2));

        let three_quarters = issue("P-2", "F", "A", 400.0, 3.0);
        assert_eq!(issue_cells(&three_quarters)[10], Cell::Number(0.8));
    }
}
