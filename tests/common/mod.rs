//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::path::Path;
use ticket_estimator::config::{Config, PathsConfig};
use ticket_estimator::dataset::IssueFrame;
use ticket_estimator::models::Issue;

pub const DAY: f64 = 86400.0;
pub const HOUR: f64 = 3600.0;

/// Configuration with dataset and model placed under `dir`
pub fn config_in(dir: &Path) -> Config {
    Config {
        paths: PathsConfig {
            dataset: dir.join("data").join("issues.csv"),
            model: dir.join("data").join("model.bin"),
        },
        ..Config::default()
    }
}

/// `n` closed tickets alternating between day-long migrations and hour-long typos,
/// followed by one open ticket of each kind
pub fn labelled_frame(n: usize) -> IssueFrame {
    let mut issues = Vec::with_capacity(n + 2);
    for i in 0..n {
        let (summary, seconds) = if i % 2 == 0 {
            ("database migration for reporting", DAY)
        } else {
            ("typo in footer", HOUR)
        };
        let mut issue = Issue::new(format!("PROJ-{}", i + 1))
            .with_summary(summary)
            .with_description("details in the linked document")
            .with_created("2019-03-04T10:15:30.000+0000")
            .with_time_spent(seconds);
        issue.status = Some("Done".to_string());
        issues.push(issue);
    }

    let mut open_migration = Issue::new("PROJ-open-1").with_summary("database migration for reporting");
    open_migration.status = Some("To Do".to_string());
    let mut open_typo = Issue::new("PROJ-open-2").with_summary("typo in footer");
    open_typo.status = Some("To Do".to_string());
    issues.push(open_migration);
    issues.push(open_typo);

    IssueFrame::from_issues(issues)
}
