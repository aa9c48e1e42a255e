use crate::error::Result;
use crate::ml::models::{FeatureConfig, TrainingConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Dataset and model locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Issue tracker connection
    #[serde(default)]
    pub jira: JiraConfig,

    /// Model training parameters
    #[serde(default)]
    pub training: TrainingConfig,

    /// Text vectorization parameters
    #[serde(default)]
    pub features: FeatureConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the embedded defaults, an optional file and the environment.
    ///
    /// The file is `path` when given, otherwise `TICKET_ESTIMATOR_CONFIG` or
    /// `config/local.toml`; a missing file is skipped. Environment variables use the
    /// `TICKET_EST` prefix with `__` between sections, e.g. `TICKET_EST__JIRA__API_TOKEN`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => std::env::var("TICKET_ESTIMATOR_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("config/local.toml")),
        };

        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .add_source(
                config::File::from(config_path.as_path())
                    .format(config::FileFormat::Toml)
                    .required(path.is_some()),
            )
            .add_source(
                config::Environment::with_prefix("TICKET_EST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.training.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// CSV dataset of collected issues
    #[serde(default = "default_dataset_path")]
    pub dataset: PathBuf,

    /// Serialized model artifact
    #[serde(default = "default_model_path")]
    pub model: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dataset: default_dataset_path(),
            model: default_model_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraConfig {
    /// Base URL of the Jira instance, e.g. `https://company.atlassian.net`
    #[serde(default)]
    pub base_url: String,

    /// Project key prefixed to issue numbers (`PROJ` → `PROJ-123`)
    #[serde(default)]
    pub project_key: String,

    /// Basic auth user
    pub username: Option<String>,

    /// API token paired with `username`
    pub api_token: Option<String>,

    /// Request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            project_key: String::new(),
            username: None,
            api_token: None,
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("issues.csv")
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model.bin")
}

fn default_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "ticket_estimator=info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();
        assert_eq!(config.paths.dataset, PathBuf::from("issues.csv"));
        assert_eq!(config.paths.model, PathBuf::from("model.bin"));
        assert_eq!(config.jira.timeout_secs, 30);
        assert!(!config.logging.json_logs);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[paths]
dataset = "data/tickets.csv"

[jira]
base_url = "https://example.atlassian.net"
project_key = "OPS"

[training]
max_depth = 4
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.paths.dataset, PathBuf::from("data/tickets.csv"));
        assert_eq!(config.paths.model, PathBuf::from("model.bin"));
        assert_eq!(config.jira.project_key, "OPS");
        assert_eq!(config.training.max_depth, 4);
        assert_eq!(config.training.min_samples_leaf, 5);
    }

    #[test]
    fn test_load_rejects_invalid_test_size() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[training]\ntest_size = 1.5").unwrap();

        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_load_requires_explicit_file() {
        let missing = Path::new("/nonexistent/ticket-estimator.toml");
        assert!(Config::load(Some(missing)).is_err());
    }
}
