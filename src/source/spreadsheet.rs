//! Spreadsheet export reading.
//!
//! Loads a header row plus data rows from a CSV file or from one sheet of an
//! Excel workbook. Column names are handed to the field detector; each data
//! row becomes a [`SpreadsheetRow`].

use crate::analysis::{CanonicalField, RawIssueSource, RawValue, RecordError};
use anyhow::{anyhow, bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// File extensions read as workbooks rather than CSV.
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// One data row of a spreadsheet, keyed by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadsheetRow {
    /// 1-based data row number (the header row is not counted).
    pub row: usize,
    cells: HashMap<String, String>,
}

impl SpreadsheetRow {
    pub fn new(row: usize, cells: HashMap<String, String>) -> Self {
        Self { row, cells }
    }

    /// Pair cells with their headers. A repeated header keeps its first column.
    fn from_cells(row: usize, headers: &[String], cells: &[&str]) -> Self {
        let mut map = HashMap::with_capacity(headers.len());
        for (header, cell) in headers.iter().zip(cells) {
            map.entry(header.clone()).or_insert_with(|| cell.to_string());
        }
        Self::new(row, map)
    }

    /// Trimmed cell content for a column.
    pub fn cell(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(|c| c.trim())
    }
}

impl RawIssueSource for SpreadsheetRow {
    fn value(&self, _field: CanonicalField, source: &str) -> Result<RawValue, RecordError> {
        Ok(match self.cell(source) {
            Some(cell) => RawValue::Text(cell.to_string()),
            None => RawValue::Missing,
        })
    }

    fn feature_link(&self, source: Option<&str>) -> Result<Option<String>, RecordError> {
        Ok(source
            .and_then(|column| self.cell(column))
            .filter(|cell| !cell.is_empty())
            .map(str::to_string))
    }

    fn fallback_key(&self) -> Option<String> {
        Some(format!("ISSUE-{}", self.row))
    }

    fn position(&self) -> Option<usize> {
        Some(self.row)
    }
}

/// A loaded spreadsheet.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    /// Worksheet the rows came from, for workbooks.
    pub name: Option<String>,
    /// Column names in file order.
    pub headers: Vec<String>,
    pub rows: Vec<SpreadsheetRow>,
    /// Rows that could not be decoded.
    pub rejected_rows: usize,
}

impl Sheet {
    fn with_headers(headers: Vec<String>) -> Self {
        Self {
            headers,
            ..Self::default()
        }
    }

    /// Add data row `row` unless every cell is blank.
    fn push_row(&mut self, row: usize, cells: &[&str]) {
        if cells.iter().all(|cell| cell.trim().is_empty()) {
            debug!("Skipping blank row {}", row);
            return;
        }
        let row = SpreadsheetRow::from_cells(row, &self.headers, cells);
        self.rows.push(row);
    }
}

/// Whether `path` names an Excel or OpenDocument workbook.
pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| WORKBOOK_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Load a spreadsheet export from disk.
///
/// Workbooks read `sheet_name`, or their first sheet when none is given.
/// Any other file is read as CSV and `sheet_name` is ignored.
pub fn load_sheet(path: &Path, sheet_name: Option<&str>) -> Result<Sheet> {
    info!("Loading spreadsheet: {}", path.display());

    if is_workbook(path) {
        return load_workbook(path, sheet_name);
    }

    if let Some(name) = sheet_name {
        warn!("Ignoring sheet '{}': {} is not a workbook", name, path.display());
    }

    let file = File::open(path)
        .with_context(|| format!("Failed to open spreadsheet: {}", path.display()))?;

    read_sheet(BufReader::new(file))
        .with_context(|| format!("Failed to read spreadsheet: {}", path.display()))
}

/// Read a CSV export from any reader.
pub fn read_sheet<R: Read>(reader: R) -> Result<Sheet> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .context("Failed to read header row")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut sheet = Sheet::with_headers(headers);

    for (index, result) in rdr.records().enumerate() {
        let row = index + 1;
        match result {
            Ok(record) => {
                let cells: Vec<&str> = record.iter().collect();
                sheet.push_row(row, &cells);
            }
            Err(e) => {
                warn!("Skipping row {}: {}", row, e);
                sheet.rejected_rows += 1;
            }
        }
    }

    debug!(
        "Loaded {} rows with {} columns",
        sheet.rows.len(),
        sheet.headers.len()
    );

    Ok(sheet)
}

/// Read one worksheet of a workbook.
fn load_workbook(path: &Path, sheet_name: Option<&str>) -> Result<Sheet> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

    let names = workbook.sheet_names();
    debug!("Available sheets: {}", names.join(", "));

    let name = match sheet_name {
        Some(name) if names.iter().any(|n| n == name) => name.to_string(),
        Some(name) => bail!(
            "Sheet '{}' not found in {}. Available sheets: {}",
            name,
            path.display(),
            names.join(", ")
        ),
        None => names
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("Workbook has no sheets: {}", path.display()))?,
    };
    info!("Reading sheet: {}", name);

    let range = workbook
        .worksheet_range(&name)
        .with_context(|| format!("Failed to read sheet '{}'", name))?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .map(|cells| cells.iter().map(cell_text).collect())
        .unwrap_or_default();

    let mut sheet = Sheet::with_headers(headers);
    sheet.name = Some(name);

    for (index, cells) in rows.enumerate() {
        let texts: Vec<String> = cells.iter().map(cell_text).collect();
        let cells: Vec<&str> = texts.iter().map(String::as_str).collect();
        sheet.push_row(index + 1, &cells);
    }

    debug!(
        "Loaded {} rows with {} columns",
        sheet.rows.len(),
        sheet.headers.len()
    );

    Ok(sheet)
}

/// Text of a workbook cell as the duration parser and field readers expect it.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|dt| dt.to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        other => other.to_string(),
    }
}
