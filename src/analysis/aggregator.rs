//! Effort aggregation and rollup statistics.
//!
//! This module groups issue summaries by feature link and assignee and
//! computes the summed effort metrics for each group.

use crate::models::{completion_percent, AggregatedRow, IssueSummary, SummaryTables};
use std::collections::HashMap;
use std::hash::Hash;

/// Round to a fixed number of decimal places, halves to even.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}

/// Running sums for one group.
#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    estimated: f64,
    remaining: f64,
    spent: f64,
    count: usize,
}

impl Totals {
    fn add(&mut self, issue: &IssueSummary) {
        self.estimated += issue.estimated_hours;
        self.remaining += issue.remaining_hours;
        self.spent += issue.spent_hours;
        self.count += 1;
    }

    fn into_row(self, feature_link: Option<String>, assignee: Option<String>) -> AggregatedRow {
        let estimated_hours = round_to(self.estimated, 2);
        let spent_hours = round_to(self.spent, 2);

        AggregatedRow {
            feature_link,
            assignee,
            estimated_hours,
            remaining_hours: round_to(self.remaining, 2),
            spent_hours,
            issue_count: self.count,
            completion_percent: round_to(completion_percent(spent_hours, estimated_hours), 1),
        }
    }
}

/// Group issues by `key_fn`, keeping groups in first-appearance order.
fn group_by<K, F>(issues: &[IssueSummary], key_fn: F) -> Vec<(K, Totals)>
where
    K: Eq + Hash + Clone,
    F: Fn(&IssueSummary) -> K,
{
    let mut groups: Vec<(K, Totals)> = Vec::new();
    let mut index: HashMap<K, usize> = HashMap::new();

    for issue in issues {
        let key = key_fn(issue);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push((key, Totals::default()));
            groups.len() - 1
        });
        groups[slot].1.add(issue);
    }

    groups
}

/// Totals per (feature link, assignee) pair.
pub fn by_feature_and_assignee(issues: &[IssueSummary]) -> Vec<AggregatedRow> {
    group_by(issues, |i| (i.feature_link.clone(), i.assignee.clone()))
        .into_iter()
        .map(|((feature, assignee), totals)| totals.into_row(Some(feature), Some(assignee)))
        .collect()
}

/// Totals per feature link.
pub fn by_feature(issues: &[IssueSummary]) -> Vec<AggregatedRow> {
    group_by(issues, |i| i.feature_link.clone())
        .into_iter()
        .map(|(feature, totals)| totals.into_row(Some(feature), None))
        .collect()
}

/// Totals per assignee.
pub fn by_assignee(issues: &[IssueSummary]) -> Vec<AggregatedRow> {
    group_by(issues, |i| i.assignee.clone())
        .into_iter()
        .map(|(assignee, totals)| totals.into_row(None, Some(assignee)))
        .collect()
}

/// Totals over the whole collection.
pub fn grand_total(issues: &[IssueSummary]) -> AggregatedRow {
    if issues.is_empty() {
        return AggregatedRow::empty(None, None);
    }

    let mut totals = Totals::default();
    for issue in issues {
        totals.add(issue);
    }
    totals.into_row(None, None)
}

/// Compute every rollup table for a collection of issues.
pub fn aggregate(issues: &[IssueSummary]) -> SummaryTables {
    SummaryTables {
        by_feature_and_assignee: by_feature_and_assignee(issues),
        by_feature: by_feature(issues),
        by_assignee: by_assignee(issues),
        grand_total: grand_total(issues),
    }
}

/// Assignees with the most spent hours, highest first.
pub fn top_contributors(issues: &[IssueSummary], n: usize) -> Vec<AggregatedRow> {
    let mut rows = by_assignee(issues);

    // Stable sort keeps first-appearance order for ties.
    rows.sort_by(|a, b| {
        b.spent_hours
            .partial_cmp(&a.spent_hours)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows.truncate(n);

    rows
}

/// Collects issues incrementally and recomputes the tables on demand.
#[derive(Debug, Clone, Default)]
pub struct RollupAccumulator {
    issues: Vec<IssueSummary>,
}

impl RollupAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: IssueSummary) {
        self.issues.push(issue);
    }

    pub fn extend<I: IntoIterator<Item = IssueSummary>>(&mut self, issues: I) {
        for issue in issues {
            self.push(issue);
        }
    }

    /// Drop every collected issue.
    #[allow(dead_code)] // One pass per process today
    pub fn reset(&mut self) {
        self.issues.clear();
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues(&self) -> &[IssueSummary] {
        &self.issues
    }

    /// Recompute all tables from the collected issues.
    pub fn tables(&self) -> SummaryTables {
        aggregate(&self.issues)
    }

    pub fn into_issues(self) -> Vec<IssueSummary> {
        self.issues
    }
}
