use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Dataset header, in CSV column order
pub const HEADER: [&str; 16] = [
    "key",
    "summary",
    "description",
    "issue_type",
    "priority",
    "status",
    "assignee",
    "reporter",
    "labels",
    "components",
    "created_datetime",
    "updated_datetime",
    "resolved_datetime",
    "original_estimate",
    "remaining_estimate",
    "time_spent",
];

pub const KEY_COLUMN: &str = "key";
pub const TARGET_COLUMN: &str = "time_spent";

pub const DATE_COLUMNS: [&str; 3] = ["created_datetime", "updated_datetime", "resolved_datetime"];

pub const NUMERIC_COLUMNS: [&str; 3] = ["original_estimate", "remaining_estimate", "time_spent"];

/// Columns never turned into TF-IDF vectors even when they hold text
pub const VECTORIZE_EXCLUDED: [&str; 4] =
    ["time_spent", "key", "original_estimate", "remaining_estimate"];

/// Separator for multi-valued fields (labels, components) within one CSV cell
pub const LIST_SEPARATOR: &str = ";";

/// One issue-tracker ticket, flattened to a dataset row.
///
/// Estimates and `time_spent` are in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub issue_type: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub labels: Option<String>,
    pub components: Option<String>,
    pub created_datetime: Option<String>,
    pub updated_datetime: Option<String>,
    pub resolved_datetime: Option<String>,
    pub original_estimate: Option<f64>,
    pub remaining_estimate: Option<f64>,
    pub time_spent: Option<f64>,
}

impl Issue {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_created(mut self, created: impl Into<String>) -> Self {
        self.created_datetime = Some(created.into());
        self
    }

    pub fn with_time_spent(mut self, seconds: f64) -> Self {
        self.time_spent = Some(seconds);
        self
    }

    /// Text value of a non-numeric column, `None` when absent
    pub fn text_field(&self, column: &str) -> Option<&str> {
        let value = match column {
            "key" => return Some(self.key.as_str()),
            "summary" => &self.summary,
            "description" => &self.description,
            "issue_type" => &self.issue_type,
            "priority" => &self.priority,
            "status" => &self.status,
            "assignee" => &self.assignee,
            "reporter" => &self.reporter,
            "labels" => &self.labels,
            "components" => &self.components,
            "created_datetime" => &self.created_datetime,
            "updated_datetime" => &self.updated_datetime,
            "resolved_datetime" => &self.resolved_datetime,
            _ => return None,
        };
        value.as_deref()
    }

    /// Value of a numeric column
    pub fn numeric_field(&self, column: &str) -> Option<f64> {
        match column {
            "original_estimate" => self.original_estimate,
            "remaining_estimate" => self.remaining_estimate,
            "time_spent" => self.time_spent,
            _ => None,
        }
    }

    /// Whether the ticket carries a logged time-spent value
    pub fn has_time_spent(&self) -> bool {
        self.time_spent.is_some()
    }
}

/// How the stored dataset is refreshed before training
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Fetch only issues newer than the stored ones
    Append,
    /// Recreate the dataset from the issue tracker
    All,
}

/// Inclusive range of issue numbers to pull
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRange {
    pub start: u32,
    pub end: u32,
}

impl IssueRange {
    pub fn new(start: u32, end: u32) -> Result<Self> {
        if start > end {
            return Err(AppError::Validation(format!(
                "start issue {} is after end issue {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Build a range from optional command-line bounds; the start defaults to 1.
    pub fn from_bounds(start: Option<u32>, end: Option<u32>) -> Result<Self> {
        let end = end.ok_or_else(|| {
            AppError::Validation("an end issue is required to pull issues".to_string())
        })?;
        Self::new(start.unwrap_or(1), end)
    }

    /// Number of issue numbers covered
    pub fn count(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_header_partitions() {
        for column in DATE_COLUMNS.iter().chain(NUMERIC_COLUMNS.iter()) {
            assert!(HEADER.contains(column));
        }
        assert!(HEADER.contains(&KEY_COLUMN));
        assert!(HEADER.contains(&TARGET_COLUMN));
    }

    #[test]
    fn test_field_access() {
        let issue = Issue::new("OPS-7")
            .with_summary("Rotate certificates")
            .with_time_spent(3600.0);

        assert_eq!(issue.text_field("key"), Some("OPS-7"));
        assert_eq!(issue.text_field("summary"), Some("Rotate certificates"));
        assert_eq!(issue.text_field("description"), None);
        assert_eq!(issue.numeric_field("time_spent"), Some(3600.0));
        assert!(issue.has_time_spent());
    }

    #[test]
    fn test_update_mode_strings() {
        assert_eq!(UpdateMode::All.to_string(), "all");
        assert_eq!(UpdateMode::from_str("append").unwrap(), UpdateMode::Append);
    }

    #[test]
    fn test_issue_range() {
        let range = IssueRange::from_bounds(None, Some(5)).unwrap();
        assert_eq!(range.start, 1);
        assert_eq!(range.count(), 5);
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);

        assert!(IssueRange::from_bounds(Some(3), None).is_err());
        assert!(IssueRange::new(10, 2).is_err());
    }
}
