//! Column/field detection.
//!
//! Maps the canonical issue attributes onto whatever names a source uses
//! for them. Spreadsheet headers are matched against a static synonym
//! table; the Jira API uses a fixed mapping.

use crate::analysis::normalizer::NormalizeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Default Jira custom field holding the epic link.
pub const DEFAULT_EPIC_LINK_FIELD: &str = "customfield_10014";

/// Canonical issue attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Key,
    Summary,
    Assignee,
    Status,
    Priority,
    IssueType,
    FeatureLink,
    EstimatedHours,
    RemainingHours,
    SpentHours,
    Created,
    Updated,
}

impl CanonicalField {
    /// All canonical fields, in display order.
    pub const ALL: [CanonicalField; 12] = [
        CanonicalField::Key,
        CanonicalField::Summary,
        CanonicalField::Assignee,
        CanonicalField::Status,
        CanonicalField::Priority,
        CanonicalField::IssueType,
        CanonicalField::FeatureLink,
        CanonicalField::EstimatedHours,
        CanonicalField::RemainingHours,
        CanonicalField::SpentHours,
        CanonicalField::Created,
        CanonicalField::Updated,
    ];

    /// Fields without which no row can be normalized.
    pub const REQUIRED: [CanonicalField; 2] = [CanonicalField::Key, CanonicalField::Summary];

    /// Snake-case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Key => "key",
            CanonicalField::Summary => "summary",
            CanonicalField::Assignee => "assignee",
            CanonicalField::Status => "status",
            CanonicalField::Priority => "priority",
            CanonicalField::IssueType => "issue_type",
            CanonicalField::FeatureLink => "feature_link",
            CanonicalField::EstimatedHours => "estimated_hours",
            CanonicalField::RemainingHours => "remaining_hours",
            CanonicalField::SpentHours => "spent_hours",
            CanonicalField::Created => "created",
            CanonicalField::Updated => "updated",
        }
    }

    /// Whether the field holds an effort value in hours.
    pub fn is_effort(&self) -> bool {
        matches!(
            self,
            CanonicalField::EstimatedHours
                | CanonicalField::RemainingHours
                | CanonicalField::SpentHours
        )
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalField::Key => write!(f, "Key"),
            CanonicalField::Summary => write!(f, "Summary"),
            CanonicalField::Assignee => write!(f, "Assignee"),
            CanonicalField::Status => write!(f, "Status"),
            CanonicalField::Priority => write!(f, "Priority"),
            CanonicalField::IssueType => write!(f, "Issue Type"),
            CanonicalField::FeatureLink => write!(f, "Feature Link"),
            CanonicalField::EstimatedHours => write!(f, "Estimated Hours"),
            CanonicalField::RemainingHours => write!(f, "Remaining Hours"),
            CanonicalField::SpentHours => write!(f, "Spent Hours"),
            CanonicalField::Created => write!(f, "Created"),
            CanonicalField::Updated => write!(f, "Updated"),
        }
    }
}

/// Header synonyms per canonical field, most specific first.
pub const FIELD_PATTERNS: &[(CanonicalField, &[&str])] = &[
    (
        CanonicalField::Key,
        &["key", "issue key", "ticket", "jira key", "issue id", "id"],
    ),
    (
        CanonicalField::Summary,
        &["summary", "title", "description", "issue summary", "subject"],
    ),
    (
        CanonicalField::Assignee,
        &["assignee", "assigned to", "owner", "developer", "responsible"],
    ),
    (
        CanonicalField::Status,
        &["status", "state", "current status", "issue status"],
    ),
    (CanonicalField::Priority, &["priority", "importance", "urgency"]),
    (
        CanonicalField::IssueType,
        &["issue type", "type", "issuetype", "category", "kind"],
    ),
    (
        CanonicalField::EstimatedHours,
        &[
            "estimated hours",
            "original estimate",
            "estimate",
            "planned hours",
            "time estimate",
            "estimated time",
            "original time estimate",
            "effort estimate",
        ],
    ),
    (
        CanonicalField::RemainingHours,
        &[
            "remaining hours",
            "remaining estimate",
            "time remaining",
            "hours remaining",
            "remaining time",
            "time left",
            "remaining effort",
        ],
    ),
    (
        CanonicalField::SpentHours,
        &[
            "spent hours",
            "time spent",
            "logged time",
            "hours spent",
            "actual time",
            "work logged",
            "time logged",
            "hours logged",
        ],
    ),
    (
        CanonicalField::FeatureLink,
        &[
            "feature link",
            "epic link",
            "parent",
            "epic",
            "feature",
            "epic key",
            "parent epic",
            "parent key",
            "feature key",
            "linked epic",
        ],
    ),
    (
        CanonicalField::Created,
        &["created", "date created", "creation date"],
    ),
    (
        CanonicalField::Updated,
        &["updated", "last updated", "modified", "last modified"],
    ),
];

/// Resolved mapping from canonical fields to source field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    fields: BTreeMap<CanonicalField, String>,
}

impl FieldMapping {
    /// Build a mapping from explicit pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (CanonicalField, S)>,
        S: Into<String>,
    {
        Self {
            fields: pairs.into_iter().map(|(f, s)| (f, s.into())).collect(),
        }
    }

    /// The fixed mapping used for Jira REST API payloads.
    ///
    /// Effort fields name the direct time-tracking field; the API source
    /// falls back to the matching `aggregate*` field on its own.
    pub fn jira_api(epic_link_field: &str) -> Self {
        Self::from_pairs([
            (CanonicalField::Key, "key"),
            (CanonicalField::Summary, "summary"),
            (CanonicalField::Assignee, "assignee"),
            (CanonicalField::Status, "status"),
            (CanonicalField::Priority, "priority"),
            (CanonicalField::IssueType, "issuetype"),
            (CanonicalField::FeatureLink, epic_link_field),
            (CanonicalField::EstimatedHours, "timeoriginalestimate"),
            (CanonicalField::RemainingHours, "timeestimate"),
            (CanonicalField::SpentHours, "timespent"),
            (CanonicalField::Created, "created"),
            (CanonicalField::Updated, "updated"),
        ])
    }

    /// Source field mapped to `field`, if any.
    pub fn source(&self, field: CanonicalField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Whether `field` is mapped.
    pub fn contains(&self, field: CanonicalField) -> bool {
        self.fields.contains_key(&field)
    }

    /// Mapped pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &str)> {
        self.fields.iter().map(|(f, s)| (*f, s.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields from `wanted` that have no mapping.
    pub fn missing(&self, wanted: &[CanonicalField]) -> Vec<CanonicalField> {
        wanted
            .iter()
            .copied()
            .filter(|f| !self.contains(*f))
            .collect()
    }

    /// Fail when any of `required` is unmapped.
    pub fn require(&self, required: &[CanonicalField]) -> Result<(), NormalizeError> {
        let missing = self.missing(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(NormalizeError::MissingRequiredFields { missing })
        }
    }

    /// Available columns that no canonical field claimed.
    pub fn unmapped_columns<'a, S: AsRef<str>>(&self, available: &'a [S]) -> Vec<&'a str> {
        available
            .iter()
            .map(|col| AsRef::<str>::as_ref(col))
            .filter(|col| !self.fields.values().any(|mapped| mapped == col))
            .collect()
    }
}

/// Detect the mapping for a set of column names.
pub fn detect_fields<S: AsRef<str>>(available: &[S]) -> FieldMapping {
    let normalized: Vec<String> = available
        .iter()
        .map(|col| col.as_ref().trim().to_lowercase())
        .collect();

    let mut mapping = FieldMapping::default();

    for (field, patterns) in FIELD_PATTERNS {
        if let Some(index) = match_patterns(&normalized, patterns) {
            mapping
                .fields
                .insert(*field, available[index].as_ref().to_string());
        }
    }

    mapping
}

/// Index of the column chosen by the first matching pattern.
fn match_patterns(columns: &[String], patterns: &[&str]) -> Option<usize> {
    for pattern in patterns {
        let matches: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, col)| col.contains(pattern))
            .map(|(i, _)| i)
            .collect();

        if matches.is_empty() {
            continue;
        }

        let exact = matches.iter().copied().find(|&i| columns[i] == *pattern);
        return exact.or_else(|| matches.first().copied());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_basic_headers() {
        let mapping = detect_fields(&["Issue Key", "Title", "Assignee"]);
        assert_eq!(mapping.source(CanonicalField::Key), Some("Issue Key"));
        assert_eq!(mapping.source(CanonicalField::Summary), Some("Title"));
        assert_eq!(mapping.source(CanonicalField::Assignee), Some("Assignee"));
        assert_eq!(mapping.source(CanonicalField::SpentHours), None);
    }

    #[test]
    fn test_exact_match_preferred() {
        let mapping = detect_fields(&["Status Category", "Status"]);
        assert_eq!(mapping.source(CanonicalField::Status), Some("Status"));
    }

    #[test]
    fn test_first_match_in_header_order() {
        let mapping = detect_fields(&["Epic Key", "Issue Key"]);
        assert_eq!(mapping.source(CanonicalField::Key), Some("Epic Key"));
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let mapping = detect_fields(&["  ORIGINAL ESTIMATE ", "time SPENT", "Remaining Estimate"]);
        assert_eq!(
            mapping.source(CanonicalField::EstimatedHours),
            Some("  ORIGINAL ESTIMATE ")
        );
        assert_eq!(mapping.source(CanonicalField::SpentHours), Some("time SPENT"));
        assert_eq!(
            mapping.source(CanonicalField::RemainingHours),
            Some("Remaining Estimate")
        );
    }

    #[test]
    fn test_pattern_priority() {
        // "epic link" is tried before "parent".
        let mapping = detect_fields(&["Parent", "Epic Link"]);
        assert_eq!(mapping.source(CanonicalField::FeatureLink), Some("Epic Link"));
    }

    #[test]
    fn test_require_reports_missing() {
        let mapping = detect_fields(&["Assignee", "Status"]);
        let err = mapping.require(&CanonicalField::REQUIRED).unwrap_err();
        match err {
            NormalizeError::MissingRequiredFields { missing } => {
                assert_eq!(missing, vec![CanonicalField::Key, CanonicalField::Summary]);
            }
        }

        let mapping = detect_fields(&["Key", "Summary"]);
        assert!(mapping.require(&CanonicalField::REQUIRED).is_ok());
    }

    #[test]
    fn test_unmapped_columns() {
        let headers = ["Key", "Summary", "Sprint", "Labels"];
        let mapping = detect_fields(&headers);
        assert_eq!(mapping.unmapped_columns(&headers), vec!["Sprint", "Labels"]);
    }

    #[test]
    fn test_jira_api_mapping() {
        let mapping = FieldMapping::jira_api("customfield_10008");
        assert_eq!(mapping.source(CanonicalField::FeatureLink), Some("customfield_10008"));
        assert_eq!(mapping.source(CanonicalField::IssueType), Some("issuetype"));
        assert_eq!(mapping.len(), CanonicalField::ALL.len());
        assert!(mapping.require(&CanonicalField::REQUIRED).is_ok());
    }

    #[test]
    fn test_empty_headers() {
        let mapping = detect_fields::<&str>(&[]);
        assert!(mapping.is_empty());
    }
}
