//! Issue sources.
//!
//! Each source yields records implementing
//! [`RawIssueSource`](crate::analysis::RawIssueSource): Jira search results
//! from the REST API, or rows of a spreadsheet export.

pub mod jira;
pub mod spreadsheet;

pub use jira::JiraClient;
pub use spreadsheet::load_sheet;
