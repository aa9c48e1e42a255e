use crate::models::{Issue, LIST_SEPARATOR};
use serde::Deserialize;

/// Issue as returned by `GET /rest/api/2/issue/{key}`
#[derive(Debug, Clone, Deserialize)]
pub struct JiraIssue {
    pub key: String,
    #[serde(default)]
    pub fields: JiraFields,
}

/// The subset of Jira fields that make up a dataset row
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JiraFields {
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "issuetype")]
    pub issue_type: Option<NamedField>,
    pub priority: Option<NamedField>,
    pub status: Option<NamedField>,
    pub assignee: Option<JiraUser>,
    pub reporter: Option<JiraUser>,
    pub labels: Option<Vec<String>>,
    pub components: Option<Vec<NamedField>>,
    pub created: Option<String>,
    pub updated: Option<String>,
    #[serde(rename = "resolutiondate")]
    pub resolution_date: Option<String>,
    #[serde(rename = "timeoriginalestimate")]
    pub time_original_estimate: Option<i64>,
    #[serde(rename = "timeestimate")]
    pub time_estimate: Option<i64>,
    #[serde(rename = "timespent")]
    pub time_spent: Option<i64>,
}

/// Any `{ "name": ... }` object: issue type, priority, status, component
#[derive(Debug, Clone, Deserialize)]
pub struct NamedField {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraUser {
    #[serde(rename = "displayName")]
    pub display_name: String,
}

fn join_list(values: Vec<String>) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join(LIST_SEPARATOR))
    }
}

impl From<JiraIssue> for Issue {
    fn from(jira: JiraIssue) -> Self {
        let f = jira.fields;
        Issue {
            key: jira.key,
            summary: f.summary,
            description: f.description,
            issue_type: f.issue_type.map(|t| t.name),
            priority: f.priority.map(|p| p.name),
            status: f.status.map(|s| s.name),
            assignee: f.assignee.map(|u| u.display_name),
            reporter: f.reporter.map(|u| u.display_name),
            labels: f.labels.and_then(join_list),
            components: f
                .components
                .and_then(|c| join_list(c.into_iter().map(|n| n.name).collect())),
            created_datetime: f.created,
            updated_datetime: f.updated,
            resolved_datetime: f.resolution_date,
            original_estimate: f.time_original_estimate.map(|s| s as f64),
            remaining_estimate: f.time_estimate.map(|s| s as f64),
            time_spent: f.time_spent.map(|s| s as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_issue_mapping() {
        let payload = json!({
            "id": "10001",
            "key": "PROJ-7",
            "fields": {
                "summary": "Fix login",
                "description": "Users cannot log in",
                "issuetype": { "name": "Bug" },
                "priority": { "name": "High" },
                "status": { "name": "Done" },
                "assignee": { "displayName": "Alex Doe" },
                "reporter": { "displayName": "Sam Roe" },
                "labels": ["auth", "frontend"],
                "components": [{ "name": "web" }, { "name": "api" }],
                "created": "2019-03-04T10:15:30.000+0000",
                "updated": "2019-03-05T08:00:00.000+0000",
                "resolutiondate": "2019-03-05T08:00:00.000+0000",
                "timeoriginalestimate": 7200,
                "timeestimate": 0,
                "timespent": 5400
            }
        });

        let issue: Issue = serde_json::from_value::<JiraIssue>(payload).unwrap().into();

        assert_eq!(issue.key, "PROJ-7");
        assert_eq!(issue.issue_type.as_deref(), Some("Bug"));
        assert_eq!(issue.assignee.as_deref(), Some("Alex Doe"));
        assert_eq!(issue.labels.as_deref(), Some("auth;frontend"));
        assert_eq!(issue.components.as_deref(), Some("web;api"));
        assert_eq!(issue.original_estimate, Some(7200.0));
        assert_eq!(issue.remaining_estimate, Some(0.0));
        assert_eq!(issue.time_spent, Some(5400.0));
    }

    #[test]
    fn test_sparse_issue_mapping() {
        let payload = json!({
            "key": "PROJ-8",
            "fields": {
                "summary": "Open question",
                "assignee": null,
                "labels": [],
                "timespent": null
            }
        });

        let issue: Issue = serde_json::from_value::<JiraIssue>(payload).unwrap().into();

        assert_eq!(issue.summary.as_deref(), Some("Open question"));
        assert!(issue.assignee.is_none());
        assert!(issue.labels.is_none());
        assert!(!issue.has_time_spent());
    }
}
