//! Issue normalization.
//!
//! Turns raw source records into canonical [`IssueSummary`] values. The
//! normalizer only sees the [`RawIssueSource`] trait, so API payloads and
//! spreadsheet rows go through the same code path.

use crate::analysis::duration::{parse_duration, RawValue};
use crate::analysis::fields::{CanonicalField, FieldMapping};
use crate::models::{
    IssueSummary, DEFAULT_ISSUE_TYPE, DEFAULT_PRIORITY, DEFAULT_STATUS, DEFAULT_SUMMARY,
    NO_FEATURE_LINK, UNASSIGNED,
};
use thiserror::Error;
use tracing::{debug, warn};

/// Fatal problems that stop a normalization pass before any record is read.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("required fields not found in source: {}", join_fields(.missing))]
    MissingRequiredFields { missing: Vec<CanonicalField> },
}

fn join_fields(fields: &[CanonicalField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Problems with a single record. The record is skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("record has no issue key")]
    MissingKey,
    #[error("field `{field}` has an unexpected shape: {reason}")]
    Malformed { field: String, reason: String },
}

/// Field extraction for one raw issue record.
pub trait RawIssueSource {
    /// Read the value behind `field`, stored under `source` in this record.
    fn value(&self, field: CanonicalField, source: &str) -> Result<RawValue, RecordError>;

    /// Feature link of the record, given the mapped feature-link field.
    fn feature_link(&self, source: Option<&str>) -> Result<Option<String>, RecordError>;

    /// Key to use when the record carries none.
    fn fallback_key(&self) -> Option<String> {
        None
    }

    /// Position of the record in its source file, when it has one.
    fn position(&self) -> Option<usize> {
        None
    }
}

/// A record that could not be normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    /// 1-based position of the record in its source, or the sheet row for
    /// spreadsheet records.
    pub position: usize,
    pub error: RecordError,
}

/// Result of normalizing a whole collection.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub issues: Vec<IssueSummary>,
    pub skipped: Vec<SkippedRecord>,
}

impl Normalized {
    /// Number of records read, including skipped ones.
    pub fn records_read(&self) -> usize {
        self.issues.len() + self.skipped.len()
    }
}

/// Normalize one record.
pub fn normalize<R>(record: &R, mapping: &FieldMapping) -> Result<IssueSummary, RecordError>
where
    R: RawIssueSource + ?Sized,
{
    let text = |field: CanonicalField| -> Result<Option<String>, RecordError> {
        match mapping.source(field) {
            Some(source) => Ok(record.value(field, source)?.as_text()),
            None => Ok(None),
        }
    };
    let hours = |field: CanonicalField| -> Result<f64, RecordError> {
        debug_assert!(field.is_effort());
        match mapping.source(field) {
            Some(source) => Ok(parse_duration(&record.value(field, source)?)),
            None => Ok(0.0),
        }
    };

    let key = text(CanonicalField::Key)?
        .or_else(|| record.fallback_key())
        .ok_or(RecordError::MissingKey)?;

    let feature_link = record
        .feature_link(mapping.source(CanonicalField::FeatureLink))?
        .map(|link| link.trim().to_string())
        .filter(|link| !link.is_empty())
        .unwrap_or_else(|| NO_FEATURE_LINK.to_string());

    Ok(IssueSummary {
        key,
        summary: text(CanonicalField::Summary)?.unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
        assignee: text(CanonicalField::Assignee)?.unwrap_or_else(|| UNASSIGNED.to_string()),
        feature_link,
        estimated_hours: hours(CanonicalField::EstimatedHours)?,
        remaining_hours: hours(CanonicalField::RemainingHours)?,
        spent_hours: hours(CanonicalField::SpentHours)?,
        status: text(CanonicalField::Status)?.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        priority: text(CanonicalField::Priority)?.unwrap_or_else(|| DEFAULT_PRIORITY.to_string()),
        issue_type: text(CanonicalField::IssueType)?
            .unwrap_or_else(|| DEFAULT_ISSUE_TYPE.to_string()),
        created: text(CanonicalField::Created)?.unwrap_or_default(),
        updated: text(CanonicalField::Updated)?.unwrap_or_default(),
    })
}

/// Normalize a collection of records.
///
/// Fails up front when a required field is unmapped. Records that fail
/// individually are logged and skipped.
pub fn normalize_all<I, R>(
    records: I,
    mapping: &FieldMapping,
) -> Result<Normalized, NormalizeError>
where
    I: IntoIterator<Item = R>,
    R: RawIssueSource,
{
    mapping.require(&CanonicalField::REQUIRED)?;

    let mut normalized = Normalized::default();

    for (index, record) in records.into_iter().enumerate() {
        let position = record.position().unwrap_or(index + 1);
        match normalize(&record, mapping) {
            Ok(issue) => normalized.issues.push(issue),
            Err(error) => {
                warn!("Skipping record {}: {}", position, error);
                normalized.skipped.push(SkippedRecord { position, error });
            }
        }
    }

    debug!(
        "Normalized {} records ({} skipped)",
        normalized.records_read(),
        normalized.skipped.len()
    );

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fields::detect_fields;
    use std::collections::HashMap;

    /// Flat in-memory record keyed by column name.
    struct Row {
        cells: HashMap<&'static str, &'static str>,
        fallback: Option<String>,
        line: Option<usize>,
    }

    impl Row {
        fn new(cells: &[(&'static str, &'static str)]) -> Self {
            Self {
                cells: cells.iter().copied().collect(),
                fallback: None,
                line: None,
            }
        }
    }

    impl RawIssueSource for Row {
        fn value(&self, _field: CanonicalField, source: &str) -> Result<RawValue, RecordError> {
            match self.cells.get(source) {
                Some(&"BROKEN") => Err(RecordError::Malformed {
                    field: source.to_string(),
                    reason: "broken cell".to_string(),
                }),
                Some(cell) => Ok(RawValue::from(*cell)),
                None => Ok(RawValue::Missing),
            }
        }

        fn feature_link(&self, source: Option<&str>) -> Result<Option<String>, RecordError> {
            Ok(source
                .and_then(|s| self.cells.get(s))
                .map(|cell| cell.to_string()))
        }

        fn fallback_key(&self) -> Option<String> {
            self.fallback.clone()
        }

        fn position(&self) -> Option<usize> {
            self.line
        }
    }

    fn mapping() -> FieldMapping {
        detect_fields(&[
            "Key",
            "Summary",
            "Assignee",
            "Epic Link",
            "Original Estimate",
            "Remaining Estimate",
            "Time Spent",
            "Status",
        ])
    }

    #[test]
    fn test_normalize_full_row() {
        let row = Row::new(&[
            ("Key", "PROJ-2"),
            ("Summary", "Build the thing"),
            ("Assignee", "Ada"),
            ("Epic Link", "PROJ-1"),
            ("Original Estimate", "2d"),
            ("Remaining Estimate", "4h"),
            ("Time Spent", "12"),
            ("Status", "In Progress"),
        ]);

        let issue = normalize(&row, &mapping()).unwrap();
        assert_eq!(issue.key, "PROJ-2");
        assert_eq!(issue.assignee, "Ada");
        assert_eq!(issue.feature_link, "PROJ-1");
        assert_eq!(issue.estimated_hours, 16.0);
        assert_eq!(issue.remaining_hours, 4.0);
        assert_eq!(issue.spent_hours, 12.0);
        assert_eq!(issue.status, "In Progress");
        assert_eq!(issue.priority, DEFAULT_PRIORITY);
        assert_eq!(issue.issue_type, DEFAULT_ISSUE_TYPE);
        assert_eq!(issue.completion_percent(), 75.0);
    }

    #[test]
    fn test_defaults_for_blank_cells() {
        let row = Row::new(&[
            ("Key", "PROJ-3"),
            ("Summary", " "),
            ("Assignee", ""),
            ("Epic Link", "  "),
            ("Original Estimate", "n/a"),
        ]);

        let issue = normalize(&row, &mapping()).unwrap();
        assert_eq!(issue.summary, DEFAULT_SUMMARY);
        assert_eq!(issue.assignee, UNASSIGNED);
        assert_eq!(issue.feature_link, NO_FEATURE_LINK);
        assert_eq!(issue.estimated_hours, 0.0);
        assert_eq!(issue.status, DEFAULT_STATUS);
        assert_eq!(issue.created, "");
    }

    #[test]
    fn test_missing_key_uses_fallback() {
        let mut row = Row::new(&[("Summary", "No key here")]);
        assert_eq!(normalize(&row, &mapping()), Err(RecordError::MissingKey));

        row.fallback = Some("ISSUE-7".to_string());
        assert_eq!(normalize(&row, &mapping()).unwrap().key, "ISSUE-7");
    }

    #[test]
    fn test_normalize_all_requires_key_and_summary() {
        let mapping = detect_fields(&["Assignee", "Time Spent"]);
        let rows = vec![Row::new(&[("Assignee", "Ada")])];

        let err = normalize_all(rows, &mapping).unwrap_err();
        assert!(err.to_string().contains("key, summary"));
    }

    #[test]
    fn test_normalize_all_skips_bad_records() {
        let rows = vec![
            Row::new(&[("Key", "PROJ-1"), ("Summary", "ok")]),
            Row::new(&[("Key", "PROJ-2"), ("Summary", "BROKEN")]),
            Row::new(&[("Key", "PROJ-3"), ("Summary", "ok")]),
        ];

        let normalized = normalize_all(rows, &mapping()).unwrap();
        let keys: Vec<_> = normalized.issues.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["PROJ-1", "PROJ-3"]);
        assert_eq!(normalized.skipped.len(), 1);
        assert_eq!(normalized.skipped[0].position, 2);
        assert_eq!(normalized.records_read(), 3);
    }

    #[test]
    fn test_skipped_record_reports_source_row() {
        let mut broken = Row::new(&[("Key", "PROJ-9"), ("Summary", "BROKEN")]);
        broken.line = Some(7);
        let rows = vec![Row::new(&[("Key", "PROJ-1"), ("Summary", "ok")]), broken];

        let normalized = normalize_all(rows, &mapping()).unwrap();
        assert_eq!(normalized.skipped.len(), 1);
        assert_eq!(normalized.skipped[0].position, 7);
    }

    #[test]
    fn test_normalize_all_empty() {
        let normalized = normalize_all(Vec::<Row>::new(), &mapping()).unwrap();
        assert!(normalized.issues.is_empty());
        assert!(normalized.skipped.is_empty());
    }
}
