use crate::config::JiraConfig;
use crate::dataset::{IssueFrame, IssueSource};
use crate::error::{AppError, Result};
use crate::jira::models::JiraIssue;
use crate::models::{Issue, IssueRange};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};

const INTEGRATION: &str = "jira";

/// Fields requested for each issue; everything else is left out of the response
const ISSUE_FIELDS: &str = "summary,description,issuetype,priority,status,assignee,reporter,\
labels,components,created,updated,resolutiondate,timeoriginalestimate,timeestimate,timespent";

/// Jira REST client
#[derive(Clone)]
pub struct JiraClient {
    client: Client,
    config: JiraConfig,
}

impl JiraClient {
    /// Create a new client; fails when the base URL or project key is missing
    pub fn new(config: JiraConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(AppError::Configuration(
                "jira.base_url must be set to pull issues".to_string(),
            ));
        }
        if config.project_key.trim().is_empty() {
            return Err(AppError::Configuration(
                "jira.project_key must be set to pull issues".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Issue key for an issue number, e.g. `PROJ-42`
    pub fn issue_key(&self, number: u32) -> String {
        format!("{}-{}", self.config.project_key, number)
    }

    fn issue_url(&self, number: u32) -> String {
        format!(
            "{}/rest/api/2/issue/{}",
            self.config.base_url.trim_end_matches('/'),
            self.issue_key(number)
        )
    }

    /// Fetch one issue. `Ok(None)` means Jira has no issue with that number.
    pub async fn fetch_issue(&self, number: u32) -> Result<Option<Issue>> {
        let mut request = self
            .client
            .get(self.issue_url(number))
            .query(&[("fields", ISSUE_FIELDS)])
            .header("Accept", "application/json")
            .header("User-Agent", concat!("ticket-estimator/", env!("CARGO_PKG_VERSION")));

        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.api_token.as_deref());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Network(format!(
                    "Jira request timed out after {} seconds",
                    self.config.timeout_secs
                ))
            } else {
                AppError::Network(format!("Jira request failed: {}", e))
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(key = %self.issue_key(number), "issue not found");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Integration {
                integration_source: INTEGRATION.to_string(),
                message: format!(
                    "GET {} returned {}: {}",
                    self.issue_key(number),
                    status,
                    if body.is_empty() { "No response body" } else { &body }
                ),
            });
        }

        let issue: JiraIssue = response.json().await.map_err(|e| AppError::Integration {
            integration_source: INTEGRATION.to_string(),
            message: format!("invalid issue payload for {}: {}", self.issue_key(number), e),
        })?;

        Ok(Some(issue.into()))
    }
}

#[async_trait]
impl IssueSource for JiraClient {
    async fn collect_issues(&self, mut frame: IssueFrame, range: IssueRange) -> Result<IssueFrame> {
        info!(
            project = %self.config.project_key,
            start = range.start,
            end = range.end,
            "pulling issues from Jira"
        );

        let mut fetched = 0usize;
        let mut missing = 0usize;
        for (done, number) in range.iter().enumerate() {
            match self.fetch_issue(number).await? {
                Some(issue) => {
                    frame.upsert(issue);
                    fetched += 1;
                }
                None => missing += 1,
            }
            if (done + 1) % 100 == 0 {
                info!(done = done + 1, total = range.count(), "pull progress");
            }
        }

        if missing > 0 {
            warn!(missing, "some issue numbers did not resolve to an issue");
        }
        info!(fetched, rows = frame.len(), "pull complete");
        Ok(frame)
    }
}
