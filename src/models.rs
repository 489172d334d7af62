//! Data models for the effort rollup.
//!
//! This module contains the canonical per-issue record, the aggregated
//! table rows derived from it, and the report that wraps them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Assignee used when an issue has nobody assigned.
pub const UNASSIGNED: &str = "Unassigned";

/// Feature link used when no parent epic or feature can be resolved.
pub const NO_FEATURE_LINK: &str = "No Feature Link";

/// Summary used when the source carries no title.
pub const DEFAULT_SUMMARY: &str = "No Summary";

pub const DEFAULT_STATUS: &str = "Unknown";
pub const DEFAULT_PRIORITY: &str = "Medium";
pub const DEFAULT_ISSUE_TYPE: &str = "Story";

/// Canonical summary of a single issue.
///
/// Built once per source record by the normalizer. Every string field is
/// populated (sentinels stand in for absent values) and every hour field is
/// finite and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueSummary {
    /// Unique issue key (e.g. `PROJ-42`).
    pub key: String,
    /// Human-readable title.
    pub summary: String,
    /// Display name of the assignee, or [`UNASSIGNED`].
    pub assignee: String,
    /// Key of the parent epic/feature, or [`NO_FEATURE_LINK`].
    pub feature_link: String,
    /// Original estimate in hours.
    pub estimated_hours: f64,
    /// Remaining estimate in hours.
    pub remaining_hours: f64,
    /// Logged time in hours.
    pub spent_hours: f64,
    pub status: String,
    pub priority: String,
    pub issue_type: String,
    /// Creation timestamp, passed through as-is.
    pub created: String,
    /// Last update timestamp, passed through as-is.
    pub updated: String,
}

impl IssueSummary {
    /// Spent hours as a percentage of the estimate.
    ///
    /// Returns `0.0` when nothing was estimated.
    pub fn completion_percent(&self) -> f64 {
        completion_percent(self.spent_hours, self.estimated_hours)
    }

    /// Whether the issue has no assignee.
    pub fn is_unassigned(&self) -> bool {
        self.assignee == UNASSIGNED
    }

    /// Whether the issue is not linked to any feature.
    pub fn is_unlinked(&self) -> bool {
        self.feature_link == NO_FEATURE_LINK
    }
}

/// Safe percentage of `spent` over `estimated`.
pub fn completion_percent(spent: f64, estimated: f64) -> f64 {
    if estimated > 0.0 {
        spent / estimated * 100.0
    } else {
        0.0
    }
}

/// One row of an aggregated table.
///
/// The grouping keys present depend on the table: both for the
/// feature × assignee table, one of them for the single-key tables, and
/// neither for the grand total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub estimated_hours: f64,
    pub remaining_hours: f64,
    pub spent_hours: f64,
    pub issue_count: usize,
    pub completion_percent: f64,
}

impl AggregatedRow {
    /// A row with the given keys and all metrics at zero.
    pub fn empty(feature_link: Option<String>, assignee: Option<String>) -> Self {
        Self {
            feature_link,
            assignee,
            estimated_hours: 0.0,
            remaining_hours: 0.0,
            spent_hours: 0.0,
            issue_count: 0,
            completion_percent: 0.0,
        }
    }

    /// Human label for the row's grouping keys.
    pub fn label(&self) -> String {
        match (&self.feature_link, &self.assignee) {
            (Some(feature), Some(assignee)) => format!("{} / {}", feature, assignee),
            (Some(feature), None) => feature.clone(),
            (None, Some(assignee)) => assignee.clone(),
            (None, None) => "TOTAL".to_string(),
        }
    }
}

impl fmt::Display for AggregatedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: est {:.1}h, rem {:.1}h, spent {:.1}h, {} issues, {:.1}%",
            self.label(),
            self.estimated_hours,
            self.remaining_hours,
            self.spent_hours,
            self.issue_count,
            self.completion_percent
        )
    }
}

/// The full set of rollup tables produced by one aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTables {
    pub by_feature_and_assignee: Vec<AggregatedRow>,
    pub by_feature: Vec<AggregatedRow>,
    pub by_assignee: Vec<AggregatedRow>,
    pub grand_total: AggregatedRow,
}

impl SummaryTables {
    /// Rows of the feature × assignee table belonging to one feature.
    pub fn assignees_of<'a>(
        &'a self,
        feature_link: &'a str,
    ) -> impl Iterator<Item = &'a AggregatedRow> + 'a {
        self.by_feature_and_assignee
            .iter()
            .filter(move |row| row.feature_link.as_deref() == Some(feature_link))
    }
}

/// Where the issues came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceInfo {
    /// Jira REST API search.
    Api { base_url: String, jql: String },
    /// Spreadsheet export on disk.
    Spreadsheet {
        path: String,
        /// Worksheet read, for workbooks.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sheet: Option<String>,
    },
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceInfo::Api { base_url, jql } => write!(f, "{} (JQL: `{}`)", base_url, jql),
            SourceInfo::Spreadsheet { path, sheet: None } => write!(f, "{}", path),
            SourceInfo::Spreadsheet {
                path,
                sheet: Some(sheet),
            } => write!(f, "{} (sheet: {})", path, sheet),
        }
    }
}

/// Metadata about the rollup report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Origin of the issue records.
    pub source: SourceInfo,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of source records read.
    pub records_read: usize,
    /// Number of records skipped during normalization.
    pub records_skipped: usize,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete rollup report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub tables: SummaryTables,
    /// Assignees with the most logged time.
    pub top_contributors: Vec<AggregatedRow>,
    /// Per-issue detail.
    pub issues: Vec<IssueSummary>,
}

#[cfg(test)]
pub(crate) fn issue(
    key: &str,
    feature: &str,
    assignee: &str,
    est: f64,
    spent: f64,
) -> IssueSummary {
    IssueSummary {
        key: key.to_string(),
        summary: format!("Summary of {}", key),
        assignee: assignee.to_string(),
        feature_link: feature.to_string(),
        estimated_hours: est,
        remaining_hours: (est - spent).max(0.0),
        spent_hours: spent,
        status: DEFAULT_STATUS.to_string(),
        priority: DEFAULT_PRIORITY.to_string(),
        issue_type: DEFAULT_ISSUE_TYPE.to_string(),
        created: String::new(),
        updated: String::new(),
    }
}
