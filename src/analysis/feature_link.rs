//! Feature link resolution for structured Jira issues.
//!
//! An issue belongs to a feature through its epic-link custom field or,
//! failing that, through an issue link pointing at an epic or feature.

use crate::models::NO_FEATURE_LINK;
use serde_json::{Map, Value};

/// Link type names that can connect a story to its epic/feature.
const FEATURE_LINK_TYPES: &[&str] = &["epic-story", "feature-story", "relates"];

/// Issue type name fragments that mark a linked issue as a feature.
const FEATURE_ISSUE_TYPES: &[&str] = &["epic", "feature"];

/// Resolve the feature link of an issue, falling back to [`NO_FEATURE_LINK`].
pub fn resolve_feature_link(fields: &Map<String, Value>, epic_link_field: &str) -> String {
    find_feature_link(fields, epic_link_field).unwrap_or_else(|| NO_FEATURE_LINK.to_string())
}

/// Find the feature link of an issue, if it has one.
pub fn find_feature_link(fields: &Map<String, Value>, epic_link_field: &str) -> Option<String> {
    epic_link(fields.get(epic_link_field)).or_else(|| linked_feature(fields.get("issuelinks")))
}

fn epic_link(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn linked_feature(links: Option<&Value>) -> Option<String> {
    links?
        .as_array()?
        .iter()
        .filter(|link| is_feature_link_type(link))
        .find_map(|link| {
            ["inwardIssue", "outwardIssue"]
                .iter()
                .filter_map(|side| link.get(*side))
                .find(|issue| is_feature_issue(issue))
                .and_then(|issue| issue.get("key")?.as_str().map(str::to_string))
        })
}

fn is_feature_link_type(link: &Value) -> bool {
    let name = link
        .pointer("/type/name")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_lowercase();

    FEATURE_LINK_TYPES.contains(&name.as_str())
}

fn is_feature_issue(issue: &Value) -> bool {
    let type_name = issue
        .pointer("/fields/issuetype/name")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_lowercase();

    FEATURE_ISSUE_TYPES
        .iter()
        .any(|fragment| type_name.contains(fragment))
}
