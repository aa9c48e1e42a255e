use crate::error::{AppError, Result};
use crate::models::{Issue, HEADER};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// The issue dataset as persisted to CSV: one row per ticket, keyed by `key`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueFrame {
    issues: Vec<Issue>,

    /// Row position per key
    index: HashMap<String, usize>,
}

impl IssueFrame {
    /// Empty frame carrying the canonical header
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_issues(issues: Vec<Issue>) -> Self {
        let mut frame = Self::new();
        for issue in issues {
            frame.upsert(issue);
        }
        frame
    }

    /// Read a dataset CSV, rejecting files whose header differs from [`HEADER`].
    pub fn read_csv(path: &Path) -> Result<Self> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AppError::DatasetNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
        let header = reader.headers()?.clone();
        if header.len() != HEADER.len() || header.iter().zip(HEADER.iter()).any(|(a, b)| a != *b) {
            return Err(AppError::Validation(format!(
                "{} has header [{}], expected [{}]",
                path.display(),
                header.iter().collect::<Vec<_>>().join(", "),
                HEADER.join(", ")
            )));
        }

        let issues = reader
            .deserialize::<Issue>()
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(path = %path.display(), rows = issues.len(), "loaded dataset");

        Ok(Self::from_issues(issues))
    }

    /// Write the dataset as CSV. The header is written even when there are no rows.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        writer.write_record(HEADER)?;
        for issue in &self.issues {
            writer.serialize(issue)?;
        }
        writer.flush()?;

        debug!(path = %path.display(), rows = self.issues.len(), "wrote dataset");
        Ok(())
    }

    /// Replace the row with the same key, or append a new one
    pub fn upsert(&mut self, issue: Issue) {
        match self.index.get(&issue.key) {
            Some(&row) => self.issues[row] = issue,
            None => {
                self.index.insert(issue.key.clone(), self.issues.len());
                self.issues.push(issue);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Issue> {
        self.index.get(key).map(|&row| &self.issues[row])
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.issues.len(), HEADER.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_issue(key: &str, seconds: Option<f64>) -> Issue {
        let mut issue = Issue::new(key)
            .with_summary("Fix login, again")
            .with_description("Users see \"500\" on submit")
            .with_created("2019-03-04T10:11:12.000+0000");
        issue.labels = Some("auth;web".to_string());
        issue.time_spent = seconds;
        issue
    }

    #[test]
    fn test_csv_round_trip_preserves_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("issues.csv");

        let frame = IssueFrame::from_issues(vec![
            sample_issue("OPS-1", Some(7200.0)),
            sample_issue("OPS-2", None),
        ]);
        frame.write_csv(&path).unwrap();

        let loaded = IssueFrame::read_csv(&path).unwrap();
        assert_eq!(loaded, frame);
        assert_eq!(loaded.get("OPS-2").unwrap().time_spent, None);
    }

    #[test]
    fn test_empty_frame_writes_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("issues.csv");

        IssueFrame::new().write_csv(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim_end(), HEADER.join(","));
        assert!(IssueFrame::read_csv(&path).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_dataset_not_found() {
        let dir = TempDir::new().unwrap();
        let err = IssueFrame::read_csv(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, AppError::DatasetNotFound(_)));
    }

    #[test]
    fn test_header_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("issues.csv");
        fs::write(&path, "key,summary,time_spent\nOPS-1,hello,60\n").unwrap();

        let err = IssueFrame::read_csv(&path).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_upsert_replaces_by_key() {
        let mut frame = IssueFrame::from_issues(vec![sample_issue("OPS-1", None)]);
        frame.upsert(sample_issue("OPS-1", Some(60.0)));
        frame.upsert(sample_issue("OPS-3", None));

        assert_eq!(frame.len(), 2);
        assert_eq!(frame.get("OPS-1").unwrap().time_spent, Some(60.0));
        assert_eq!(frame.shape(), (2, 16));
    }

    #[test]
    fn test_upsert_keeps_row_order() {
        let mut frame = IssueFrame::from_issues(
            (1..=2000).map(|n| Issue::new(format!("OPS-{}", n))).collect(),
        );
        frame.upsert(Issue::new("OPS-1000").with_time_spent(60.0));
        frame.upsert(Issue::new("OPS-2001"));

        let keys: Vec<&str> = frame.issues().iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys.len(), 2001);
        assert_eq!(keys[999], "OPS-1000");
        assert_eq!(keys[2000], "OPS-2001");
        assert_eq!(frame.get("OPS-1000").unwrap().time_spent, Some(60.0));
        assert!(frame.get("OPS-9999").is_none());
    }

    #[test]
    fn test_duplicate_keys_in_csv_collapse() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("issues.csv");
        let row = |key: &str, spent: &str| format!("{},,,,,,,,,,,,,,,{}\n", key, spent);
        fs::write(
            &path,
            format!(
                "{}\n{}{}{}",
                HEADER.join(","),
                row("OPS-1", "60"),
                row("OPS-2", ""),
                row("OPS-1", "120")
            ),
        )
        .unwrap();

        let frame = IssueFrame::read_csv(&path).unwrap();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.get("OPS-1").unwrap().time_spent, Some(120.0));
    }
}
