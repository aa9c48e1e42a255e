/// Jira REST client used to refresh the issue dataset
///
/// Issues are pulled one at a time by number from `{base}/rest/api/2/issue/{PROJECT}-{n}`
/// and flattened into dataset rows.

pub mod client;
pub mod models;

pub use client::JiraClient;
pub use models::{JiraFields, JiraIssue};
