use crate::dataset::Table;
use crate::error::{AppError, Result};
use crate::models::{KEY_COLUMN, TARGET_COLUMN};
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use strum::{Display, EnumString};
use validator::Validate;

/// Model training configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TrainingConfig {
    /// Which decision tree to fit
    #[serde(default)]
    pub model_kind: ModelKind,

    /// Fraction of the training subset held out for scoring
    #[serde(default = "default_test_size")]
    #[validate(range(min = 0.01, max = 0.99))]
    pub test_size: f64,

    /// Seed for the train/test shuffle
    #[serde(default = "default_random_state")]
    pub random_state: u64,

    /// Maximum tree depth
    #[serde(default = "default_max_depth")]
    #[validate(range(min = 1))]
    pub max_depth: u16,

    /// Minimum number of samples in a leaf
    #[serde(default = "default_min_samples_leaf")]
    #[validate(range(min = 1))]
    pub min_samples_leaf: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model_kind: ModelKind::default(),
            test_size: default_test_size(),
            random_state: default_random_state(),
            max_depth: default_max_depth(),
            min_samples_leaf: default_min_samples_leaf(),
        }
    }
}

fn default_test_size() -> f64 {
    0.3
}

fn default_random_state() -> u64 {
    100
}

fn default_max_depth() -> u16 {
    3
}

fn default_min_samples_leaf() -> usize {
    5
}

/// Feature extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Keep only the most frequent terms per text column
    #[serde(default)]
    pub max_features: Option<usize>,

    /// Minimum document frequency for terms
    #[serde(default = "default_min_doc_freq")]
    pub min_doc_freq: usize,

    /// Lowercase text before tokenizing
    #[serde(default = "default_lowercase")]
    pub lowercase: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            max_features: None,
            min_doc_freq: default_min_doc_freq(),
            lowercase: default_lowercase(),
        }
    }
}

fn default_min_doc_freq() -> usize {
    1
}

fn default_lowercase() -> bool {
    true
}

/// Predicted time spent for one ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Issue key
    pub key: String,

    /// Predicted time spent (seconds)
    pub time_spent: f64,
}

impl Prediction {
    pub fn new(key: impl Into<String>, time_spent: f64) -> Self {
        Self {
            key: key.into(),
            time_spent,
        }
    }

    pub fn hours(&self) -> f64 {
        self.time_spent / 3600.0
    }
}

/// Training dataset
#[derive(Debug, Clone)]
pub struct TrainingDataset {
    /// Feature matrix (n_samples × n_features)
    pub features: Array2<f64>,

    /// Time spent per sample (seconds)
    pub targets: Vec<f64>,

    /// Issue key per sample
    pub keys: Vec<String>,

    /// Column name per feature
    pub feature_names: Vec<String>,

    /// Number of samples
    pub n_samples: usize,

    /// Number of features
    pub n_features: usize,
}

impl TrainingDataset {
    /// Build `x` from every column but the key and target, `y` from `time_spent`.
    ///
    /// Every row must carry a target; use `create_training_subset` first.
    pub fn from_table(table: &Table) -> Result<Self> {
        let keys = table.keys()?;
        let targets = table
            .numeric(TARGET_COLUMN)?
            .iter()
            .zip(keys.iter())
            .map(|(value, key)| {
                value.ok_or_else(|| {
                    AppError::Validation(format!("{} has no {}", key, TARGET_COLUMN))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        let (features, feature_names) = table.feature_matrix(&[TARGET_COLUMN, KEY_COLUMN])?;
        let (n_samples, n_features) = features.dim();

        Ok(Self {
            features,
            targets,
            keys,
            feature_names,
            n_samples,
            n_features,
        })
    }

    /// Shuffle rows with a seeded RNG and hold out `ceil(n * test_size)` of them.
    ///
    /// Returns `(train, test)`. Either side ending up empty is an error.
    pub fn train_test_split(
        &self,
        test_size: f64,
        random_state: u64,
    ) -> Result<(TrainingDataset, TrainingDataset)> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(AppError::Validation(format!(
                "test_size must be in (0, 1), got {}",
                test_size
            )));
        }

        let n_test = (self.n_samples as f64 * test_size).ceil() as usize;
        let n_train = self.n_samples.saturating_sub(n_test);
        if n_test == 0 || n_train == 0 {
            return Err(AppError::Validation(format!(
                "{} samples cannot be split with test_size {}",
                self.n_samples, test_size
            )));
        }

        let mut indices: Vec<usize> = (0..self.n_samples).collect();
        let mut rng = StdRng::seed_from_u64(random_state);
        indices.shuffle(&mut rng);

        let (train_idx, test_idx) = indices.split_at(n_train);
        Ok((self.select(train_idx), self.select(test_idx)))
    }

    fn select(&self, rows: &[usize]) -> TrainingDataset {
        TrainingDataset {
            features: self.features.select(Axis(0), rows),
            targets: rows.iter().map(|&i| self.targets[i]).collect(),
            keys: rows.iter().map(|&i| self.keys[i].clone()).collect(),
            feature_names: self.feature_names.clone(),
            n_samples: rows.len(),
            n_features: self.n_features,
        }
    }
}

/// Model evaluation metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Number of scored samples
    pub n_samples: usize,

    /// Share of exact matches (classifier only)
    pub accuracy: Option<f64>,

    /// Macro-averaged F1 over the classes seen (classifier only)
    pub macro_f1: Option<f64>,

    /// Coefficient of determination (regressor only)
    pub r2_score: Option<f64>,

    /// Mean absolute error in seconds
    pub mean_absolute_error: f64,

    /// Per-class metrics keyed by class label (classifier only)
    pub per_class_metrics: BTreeMap<String, ClassMetrics>,
}

/// Per-class evaluation metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

impl ModelMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accuracy and per-class precision/recall for label predictions
    pub fn classification(y_true: &[i32], y_pred: &[i32]) -> Self {
        let n_samples = y_true.len();
        if n_samples == 0 {
            return Self::new();
        }

        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| t == p)
            .count();
        let accuracy = correct as f64 / n_samples as f64;

        let mut classes: Vec<i32> = y_true.iter().chain(y_pred.iter()).copied().collect();
        classes.sort_unstable();
        classes.dedup();

        let mut per_class = BTreeMap::new();
        for class in &classes {
            let tp = y_true
                .iter()
                .zip(y_pred.iter())
                .filter(|(t, p)| *t == class && *p == class)
                .count();
            let fp = y_true
                .iter()
                .zip(y_pred.iter())
                .filter(|(t, p)| *t != class && *p == class)
                .count();
            let fn_count = y_true
                .iter()
                .zip(y_pred.iter())
                .filter(|(t, p)| *t == class && *p != class)
                .count();

            let precision = if tp + fp > 0 {
                tp as f64 / (tp + fp) as f64
            } else {
                0.0
            };
            let recall = if tp + fn_count > 0 {
                tp as f64 / (tp + fn_count) as f64
            } else {
                0.0
            };
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            per_class.insert(
                class.to_string(),
                ClassMetrics {
                    precision,
                    recall,
                    f1_score: f1,
                    support: y_true.iter().filter(|t| *t == class).count(),
                },
            );
        }

        let macro_f1 =
            per_class.values().map(|m| m.f1_score).sum::<f64>() / per_class.len() as f64;
        let mae = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| (*t as f64 - *p as f64).abs())
            .sum::<f64>()
            / n_samples as f64;

        Self {
            n_samples,
            accuracy: Some(accuracy),
            macro_f1: Some(macro_f1),
            r2_score: None,
            mean_absolute_error: mae,
            per_class_metrics: per_class,
        }
    }

    /// R² and mean absolute error for continuous predictions
    pub fn regression(y_true: &[f64], y_pred: &[f64]) -> Self {
        let n_samples = y_true.len();
        if n_samples == 0 {
            return Self::new();
        }

        let mean = y_true.iter().sum::<f64>() / n_samples as f64;
        let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
        let ss_res: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| (t - p).powi(2))
            .sum();
        // A constant target scores 1.0 only when predicted exactly
        let r2 = if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else if ss_res == 0.0 {
            1.0
        } else {
            0.0
        };
        let mae = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| (t - p).abs())
            .sum::<f64>()
            / n_samples as f64;

        Self {
            n_samples,
            accuracy: None,
            macro_f1: None,
            r2_score: Some(r2),
            mean_absolute_error: mae,
            per_class_metrics: BTreeMap::new(),
        }
    }
}

/// Model metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name
    pub name: String,

    /// Model version
    pub version: String,

    /// Model kind
    pub model_kind: ModelKind,

    /// Training timestamp
    pub trained_at: chrono::DateTime<chrono::Utc>,

    /// Number of training samples
    pub n_training_samples: usize,

    /// Number of features
    pub n_features: usize,

    /// Training metrics
    pub training_metrics: ModelMetrics,

    /// Metrics on the held-out split
    pub validation_metrics: Option<ModelMetrics>,

    /// Hyperparameters
    pub hyperparameters: HashMap<String, String>,
}

impl ModelMetadata {
    pub fn new(name: &str, model_kind: ModelKind, hyperparameters: HashMap<String, String>) -> Self {
        Self {
            name: name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            model_kind,
            trained_at: chrono::Utc::now(),
            n_training_samples: 0,
            n_features: 0,
            training_metrics: ModelMetrics::new(),
            validation_metrics: None,
            hyperparameters,
        }
    }
}

/// Which decision tree predicts time spent
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelKind {
    /// Gini decision tree over whole-second labels
    #[default]
    Classifier,

    /// Variance-reducing decision tree over seconds
    Regressor,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Column, ColumnData};

    fn table(n: usize, with_missing_target: bool) -> Table {
        let keys = (0..n).map(|i| Some(format!("A-{}", i))).collect();
        let target = (0..n)
            .map(|i| {
                if with_missing_target && i == 0 {
                    None
                } else {
                    Some(i as f64 * 60.0)
                }
            })
            .collect();
        Table::new(vec![
            Column {
                name: "key".to_string(),
                data: ColumnData::Text(keys),
            },
            Column {
                name: "created_datetime".to_string(),
                data: ColumnData::Numeric((0..n).map(|i| Some(737000.0 + i as f64)).collect()),
            },
            Column {
                name: "summary".to_string(),
                data: ColumnData::Vector((0..n).map(|i| vec![i as f64, 1.0]).collect()),
            },
            Column {
                name: "time_spent".to_string(),
                data: ColumnData::Numeric(target),
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_training_dataset_from_table() {
        let dataset = TrainingDataset::from_table(&table(4, false)).unwrap();

        assert_eq!(dataset.n_samples, 4);
        assert_eq!(dataset.n_features, 3);
        assert_eq!(dataset.features.shape(), &[4, 3]);
        assert_eq!(dataset.targets, vec![0.0, 60.0, 120.0, 180.0]);
        assert_eq!(
            dataset.feature_names,
            vec!["created_datetime", "summary[0]", "summary[1]"]
        );
    }

    #[test]
    fn test_training_dataset_requires_targets() {
        assert!(TrainingDataset::from_table(&table(3, true)).is_err());
    }

    #[test]
    fn test_train_test_split_sizes() {
        let dataset = TrainingDataset::from_table(&table(10, false)).unwrap();
        let (train, test) = dataset.train_test_split(0.3, 100).unwrap();

        assert_eq!(train.n_samples, 7);
        assert_eq!(test.n_samples, 3);
        assert_eq!(train.features.shape(), &[7, 3]);

        let mut all: Vec<String> = train.keys.iter().chain(test.keys.iter()).cloned().collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn test_train_test_split_is_deterministic() {
        let dataset = TrainingDataset::from_table(&table(20, false)).unwrap();
        let (_, first) = dataset.train_test_split(0.3, 100).unwrap();
        let (_, second) = dataset.train_test_split(0.3, 100).unwrap();

        assert_eq!(first.keys, second.keys);
        // rows stay aligned with their targets
        for (key, target) in first.keys.iter().zip(first.targets.iter()) {
            let idx: f64 = key.trim_start_matches("A-").parse().unwrap();
            assert_eq!(*target, idx * 60.0);
        }
    }

    #[test]
    fn test_train_test_split_rejects_tiny_datasets() {
        let dataset = TrainingDataset::from_table(&table(1, false)).unwrap();
        assert!(dataset.train_test_split(0.3, 100).is_err());
        assert!(dataset.train_test_split(1.5, 100).is_err());
    }

    #[test]
    fn test_classification_metrics() {
        let metrics = ModelMetrics::classification(&[60, 60, 120, 120], &[60, 120, 120, 120]);

        assert_eq!(metrics.accuracy, Some(0.75));
        assert_eq!(metrics.per_class_metrics["60"].recall, 0.5);
        assert_eq!(metrics.per_class_metrics["120"].precision, 2.0 / 3.0);
        assert_eq!(metrics.mean_absolute_error, 15.0);
    }

    #[test]
    fn test_regression_metrics() {
        let perfect = ModelMetrics::regression(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert_eq!(perfect.r2_score, Some(1.0));
        assert_eq!(perfect.mean_absolute_error, 0.0);

        let mean_only = ModelMetrics::regression(&[1.0, 2.0, 3.0], &[2.0, 2.0, 2.0]);
        assert_eq!(mean_only.r2_score, Some(0.0));
    }

    #[test]
    fn test_training_config_default() {
        let config = TrainingConfig::default();
        assert_eq!(config.model_kind, ModelKind::Classifier);
        assert_eq!(config.test_size, 0.3);
        assert_eq!(config.random_state, 100);
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.min_samples_leaf, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_model_kind_display() {
        assert_eq!(ModelKind::Classifier.to_string(), "classifier");
        assert_eq!(ModelKind::Regressor.to_string(), "regressor");
    }
}
