//! Jira REST API client.
//!
//! Fetches issues page by page through `/rest/api/3/search` and exposes
//! each payload as an [`ApiIssue`].

use crate::analysis::{
    resolve_feature_link, CanonicalField, RawIssueSource, RawValue, RecordError,
    DEFAULT_EPIC_LINK_FIELD,
};
use crate::config::JiraConfig;
use anyhow::{anyhow, bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Largest page the search endpoint hands out.
const MAX_PAGE_SIZE: usize = 100;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Fields requested for every issue, besides the epic-link field.
const SEARCH_FIELDS: &[&str] = &[
    "summary",
    "status",
    "assignee",
    "priority",
    "issuetype",
    "created",
    "updated",
    "timetracking",
    "timeoriginalestimate",
    "timeestimate",
    "timespent",
    "aggregatetimeoriginalestimate",
    "aggregatetimeestimate",
    "aggregatetimespent",
    "issuelinks",
];

/// Comma-separated field list for a search request.
pub fn search_fields(epic_link_field: &str) -> String {
    let mut fields: Vec<&str> = SEARCH_FIELDS.to_vec();
    if !fields.contains(&epic_link_field) {
        fields.push(epic_link_field);
    }
    fields.join(",")
}

/// An issue as returned by the search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiIssue {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub fields: Value,
}

impl ApiIssue {
    fn field_map(&self) -> Result<&Map<String, Value>, RecordError> {
        self.fields.as_object().ok_or_else(|| RecordError::Malformed {
            field: "fields".to_string(),
            reason: "expected an object".to_string(),
        })
    }

    /// Time-tracking value in hours, falling back to the aggregate field.
    fn effort(&self, source: &str) -> Result<RawValue, RecordError> {
        let fields = self.field_map()?;
        let direct = seconds(fields.get(source), source)?;
        let seconds = match direct {
            Some(s) if s != 0.0 => Some(s),
            _ => {
                let aggregate = format!("aggregate{}", source);
                seconds(fields.get(&aggregate), &aggregate)?
            }
        };

        Ok(seconds
            .map(|s| RawValue::Number(s / SECONDS_PER_HOUR))
            .unwrap_or(RawValue::Missing))
    }
}

fn seconds(value: Option<&Value>, field: &str) -> Result<Option<f64>, RecordError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(other) => Err(RecordError::Malformed {
            field: field.to_string(),
            reason: format!("expected seconds, found {}", other),
        }),
    }
}

/// Read a structured reference (`{"name": ..}` / `{"displayName": ..}`) or plain value.
fn reference(value: Option<&Value>, name_key: &str, field: &str) -> Result<RawValue, RecordError> {
    match value {
        None | Some(Value::Null) => Ok(RawValue::Missing),
        Some(Value::String(s)) => Ok(RawValue::Text(s.clone())),
        Some(Value::Number(n)) => Ok(n.as_f64().map(RawValue::Number).unwrap_or(RawValue::Missing)),
        Some(Value::Object(obj)) => Ok(obj
            .get(name_key)
            .and_then(Value::as_str)
            .map(|s| RawValue::Text(s.to_string()))
            .unwrap_or(RawValue::Missing)),
        Some(other) => Err(RecordError::Malformed {
            field: field.to_string(),
            reason: format!("unexpected value {}", other),
        }),
    }
}

impl RawIssueSource for ApiIssue {
    fn value(&self, field: CanonicalField, source: &str) -> Result<RawValue, RecordError> {
        if field == CanonicalField::Key {
            return Ok(RawValue::from(self.key.as_deref()));
        }
        if field.is_effort() {
            return self.effort(source);
        }

        let fields = self.field_map()?;
        let name_key = match field {
            CanonicalField::Assignee => "displayName",
            _ => "name",
        };

        reference(fields.get(source), name_key, source)
    }

    fn feature_link(&self, source: Option<&str>) -> Result<Option<String>, RecordError> {
        let fields = self.field_map()?;
        Ok(Some(resolve_feature_link(
            fields,
            source.unwrap_or(DEFAULT_EPIC_LINK_FIELD),
        )))
    }
}

/// One page of search results.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<ApiIssue>,
    #[serde(default)]
    total: Option<usize>,
}

/// The authenticated user, as returned by `/myself`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
}

/// Client for the Jira REST API.
pub struct JiraClient {
    http_client: reqwest::Client,
    base_url: String,
    username: String,
    api_token: String,
    max_results: usize,
    timeout_seconds: u64,
}

impl JiraClient {
    /// Create a client from the `[jira]` configuration section.
    pub fn new(config: &JiraConfig) -> Result<Self> {
        config.validate_credentials()?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            api_token: config.api_token.clone(),
            max_results: config.max_results,
            timeout_seconds: config.timeout_seconds,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Number of issues requested per page.
    fn page_size(&self) -> usize {
        self.max_results.clamp(1, MAX_PAGE_SIZE)
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .get(self.url(path))
            .basic_auth(&self.username, Some(&self.api_token))
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("Request timed out after {}s", self.timeout_seconds)
                } else if e.is_connect() {
                    anyhow!("Cannot connect to Jira at {}", self.base_url)
                } else {
                    anyhow!("Failed to send request: {}", e)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => bail!(
                "Failed to authenticate with Jira ({}). Check your username and API token.",
                status
            ),
            StatusCode::BAD_REQUEST => bail!("Jira rejected the query ({}): {}", status, body),
            _ => bail!("Jira API error {}: {}", status, body),
        }
    }

    /// Check that the credentials are accepted.
    pub async fn test_connection(&self) -> Result<CurrentUser> {
        let user: CurrentUser = self
            .get("/rest/api/3/myself", &[])
            .await?
            .json()
            .await
            .context("Failed to parse Jira user response")?;

        info!(
            "Jira connection successful as {}",
            user.display_name.as_deref().unwrap_or("unknown user")
        );
        debug!("Account email: {}", user.email_address.as_deref().unwrap_or("-"));
        Ok(user)
    }

    /// Fetch every issue matching `jql`, up to the configured maximum.
    pub async fn fetch_issues(
        &self,
        jql: &str,
        epic_link_field: &str,
        show_progress: bool,
    ) -> Result<Vec<ApiIssue>> {
        let fields = search_fields(epic_link_field);
        let page_size = self.page_size();

        let progress = if show_progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };

        let mut all_issues: Vec<ApiIssue> = Vec::new();
        let mut start_at = 0;

        loop {
            debug!("Fetching issues starting at {}", start_at);
            let query = [
                ("jql", jql.to_string()),
                ("fields", fields.clone()),
                ("maxResults", page_size.to_string()),
                ("startAt", start_at.to_string()),
            ];

            let page: SearchResponse = self
                .get("/rest/api/3/search", &query)
                .await?
                .json()
                .await
                .context("Failed to parse Jira search response")?;

            let received = page.issues.len();
            all_issues.extend(page.issues);

            if let Some(ref pb) = progress {
                match page.total {
                    Some(total) => pb.set_message(format!(
                        "Fetched {}/{} issues",
                        all_issues.len(),
                        total.min(self.max_results)
                    )),
                    None => pb.set_message(format!("Fetched {} issues", all_issues.len())),
                }
            }

            if !has_more_pages(received, page_size, all_issues.len(), self.max_results) {
                break;
            }

            start_at += received;
            info!("Fetched {} issues so far...", all_issues.len());
        }

        all_issues.truncate(self.max_results);

        if let Some(pb) = progress {
            pb.finish_with_message(format!("Fetched {} issues", all_issues.len()));
        }

        info!("Total issues fetched: {}", all_issues.len());
        Ok(all_issues)
    }
}

/// Whether another page should be requested.
fn has_more_pages(received: usize, page_size: usize, collected: usize, max_results: usize) -> bool {
    received > 0 && received >= page_size && collected < max_results
}
