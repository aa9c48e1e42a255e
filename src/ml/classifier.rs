use crate::error::{AppError, Result};
use crate::ml::models::{ModelKind, ModelMetadata, ModelMetrics, TrainingConfig, TrainingDataset};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_classifier::{
    DecisionTreeClassifier, DecisionTreeClassifierParameters, SplitCriterion,
};
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};
use std::collections::HashMap;

/// Trait for time-spent estimators
pub trait Estimator {
    /// Fit on `dataset` and return metrics on the same data
    fn train(&mut self, dataset: &TrainingDataset) -> Result<ModelMetrics>;

    /// Predict time spent (seconds) per row
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>>;

    /// Score predictions on a labelled dataset
    fn score(&self, dataset: &TrainingDataset) -> Result<ModelMetrics>;

    /// Get model metadata
    fn metadata(&self) -> &ModelMetadata;

    /// Get model kind
    fn model_kind(&self) -> ModelKind;

    /// Check if model is trained
    fn is_trained(&self) -> bool;
}

fn ndarray_to_densematrix(arr: &Array2<f64>) -> DenseMatrix<f64> {
    let shape = arr.shape();
    let data: Vec<f64> = arr.iter().copied().collect();
    DenseMatrix::new(shape[0], shape[1], data, false)
}

/// Whole seconds as class labels
fn targets_to_labels(targets: &[f64]) -> Result<Vec<i32>> {
    targets
        .iter()
        .map(|&t| {
            if t.is_finite() && t >= 0.0 && t <= i32::MAX as f64 {
                Ok(t.round() as i32)
            } else {
                Err(AppError::Validation(format!(
                    "time spent {} is not a valid label",
                    t
                )))
            }
        })
        .collect()
}

fn check_trainable(dataset: &TrainingDataset) -> Result<()> {
    if dataset.n_samples == 0 {
        return Err(AppError::Validation(
            "cannot train on an empty dataset".to_string(),
        ));
    }
    if dataset.n_features == 0 {
        return Err(AppError::Validation(
            "cannot train without features".to_string(),
        ));
    }
    Ok(())
}

fn check_width(metadata: &ModelMetadata, features: &Array2<f64>) -> Result<()> {
    if features.ncols() != metadata.n_features {
        return Err(AppError::Model(format!(
            "model expects {} features, got {}",
            metadata.n_features,
            features.ncols()
        )));
    }
    Ok(())
}

fn tree_hyperparameters(config: &TrainingConfig, criterion: &str) -> HashMap<String, String> {
    [
        ("criterion".to_string(), criterion.to_string()),
        ("seed".to_string(), config.random_state.to_string()),
        ("max_depth".to_string(), config.max_depth.to_string()),
        (
            "min_samples_leaf".to_string(),
            config.min_samples_leaf.to_string(),
        ),
    ]
    .into_iter()
    .collect()
}

/// Decision tree classifier over whole-second labels
#[derive(Serialize, Deserialize)]
pub struct DecisionTreeClassifierWrapper {
    /// Model metadata
    metadata: ModelMetadata,

    /// Trained model
    model: Option<DecisionTreeClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>>,

    /// Single label seen in training; the tree is a lone leaf
    constant: Option<i32>,

    /// Maximum depth
    max_depth: u16,

    /// Minimum samples per leaf
    min_samples_leaf: usize,

    /// Seed passed to the tree
    seed: u64,

    /// Is trained
    trained: bool,
}

impl DecisionTreeClassifierWrapper {
    pub fn new(config: &TrainingConfig) -> Self {
        Self {
            metadata: ModelMetadata::new(
                "Decision Tree Classifier",
                ModelKind::Classifier,
                tree_hyperparameters(config, "gini"),
            ),
            model: None,
            constant: None,
            max_depth: config.max_depth,
            min_samples_leaf: config.min_samples_leaf,
            seed: config.random_state,
            trained: false,
        }
    }

    fn predict_labels(&self, features: &Array2<f64>) -> Result<Vec<i32>> {
        if !self.trained {
            return Err(AppError::Model("Model not trained".to_string()));
        }
        check_width(&self.metadata, features)?;

        if let Some(label) = self.constant {
            return Ok(vec![label; features.nrows()]);
        }
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| AppError::Model("Model not trained".to_string()))?;

        let x = ndarray_to_densematrix(features);
        model
            .predict(&x)
            .map_err(|e| AppError::Model(format!("Prediction failed: {}", e)))
    }
}

impl Estimator for DecisionTreeClassifierWrapper {
    fn train(&mut self, dataset: &TrainingDataset) -> Result<ModelMetrics> {
        check_trainable(dataset)?;
        let labels = targets_to_labels(&dataset.targets)?;

        // smartcore refuses fewer than two classes
        let first = labels[0];
        if labels.iter().all(|&label| label == first) {
            self.model = None;
            self.constant = Some(first);
        } else {
            let x = ndarray_to_densematrix(&dataset.features);
            let mut params = DecisionTreeClassifierParameters::default()
                .with_criterion(SplitCriterion::Gini)
                .with_max_depth(self.max_depth)
                .with_min_samples_leaf(self.min_samples_leaf);
            params.seed = Some(self.seed);

            let model = DecisionTreeClassifier::fit(&x, &labels, params)
                .map_err(|e| AppError::Model(format!("Failed to train decision tree: {}", e)))?;
            self.model = Some(model);
            self.constant = None;
        }
        self.trained = true;
        self.metadata.n_training_samples = dataset.n_samples;
        self.metadata.n_features = dataset.n_features;
        self.metadata.trained_at = chrono::Utc::now();

        let metrics = self.score(dataset)?;
        self.metadata.training_metrics = metrics.clone();

        Ok(metrics)
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        Ok(self
            .predict_labels(features)?
            .into_iter()
            .map(|label| label as f64)
            .collect())
    }

    fn score(&self, dataset: &TrainingDataset) -> Result<ModelMetrics> {
        let y_true = targets_to_labels(&dataset.targets)?;
        let y_pred = self.predict_labels(&dataset.features)?;
        Ok(ModelMetrics::classification(&y_true, &y_pred))
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn model_kind(&self) -> ModelKind {
        ModelKind::Classifier
    }

    fn is_trained(&self) -> bool {
        self.trained
    }
}

/// Decision tree regressor over seconds
#[derive(Serialize, Deserialize)]
pub struct DecisionTreeRegressorWrapper {
    metadata: ModelMetadata,
    model: Option<DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>>,
    max_depth: u16,
    min_samples_leaf: usize,
    seed: u64,
    trained: bool,
}

impl DecisionTreeRegressorWrapper {
    pub fn new(config: &TrainingConfig) -> Self {
        Self {
            metadata: ModelMetadata::new(
                "Decision Tree Regressor",
                ModelKind::Regressor,
                tree_hyperparameters(config, "mse"),
            ),
            model: None,
            max_depth: config.max_depth,
            min_samples_leaf: config.min_samples_leaf,
            seed: config.random_state,
            trained: false,
        }
    }
}

impl Estimator for DecisionTreeRegressorWrapper {
    fn train(&mut self, dataset: &TrainingDataset) -> Result<ModelMetrics> {
        check_trainable(dataset)?;
        let x = ndarray_to_densematrix(&dataset.features);
        let y = dataset.targets.clone();

        let mut params = DecisionTreeRegressorParameters::default()
            .with_max_depth(self.max_depth)
            .with_min_samples_leaf(self.min_samples_leaf);
        params.seed = Some(self.seed);

        let model = DecisionTreeRegressor::fit(&x, &y, params)
            .map_err(|e| AppError::Model(format!("Failed to train decision tree: {}", e)))?;

        self.model = Some(model);
        self.trained = true;
        self.metadata.n_training_samples = dataset.n_samples;
        self.metadata.n_features = dataset.n_features;
        self.metadata.trained_at = chrono::Utc::now();

        let metrics = self.score(dataset)?;
        self.metadata.training_metrics = metrics.clone();

        Ok(metrics)
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        let model = match (&self.model, self.trained) {
            (Some(model), true) => model,
            _ => return Err(AppError::Model("Model not trained".to_string())),
        };
        check_width(&self.metadata, features)?;

        let x = ndarray_to_densematrix(features);
        model
            .predict(&x)
            .map_err(|e| AppError::Model(format!("Prediction failed: {}", e)))
    }

    fn score(&self, dataset: &TrainingDataset) -> Result<ModelMetrics> {
        let y_pred = self.predict(&dataset.features)?;
        Ok(ModelMetrics::regression(&dataset.targets, &y_pred))
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn model_kind(&self) -> ModelKind {
        ModelKind::Regressor
    }

    fn is_trained(&self) -> bool {
        self.trained
    }
}

/// The configured estimator, serializable as part of a model artifact
#[derive(Serialize, Deserialize)]
pub enum TimeSpentModel {
    Classifier(DecisionTreeClassifierWrapper),
    Regressor(DecisionTreeRegressorWrapper),
}

impl TimeSpentModel {
    /// Create an untrained estimator of the configured kind
    pub fn new(config: &TrainingConfig) -> Self {
        match config.model_kind {
            ModelKind::Classifier => {
                TimeSpentModel::Classifier(DecisionTreeClassifierWrapper::new(config))
            }
            ModelKind::Regressor => {
                TimeSpentModel::Regressor(DecisionTreeRegressorWrapper::new(config))
            }
        }
    }

    fn inner(&self) -> &dyn Estimator {
        match self {
            TimeSpentModel::Classifier(m) => m,
            TimeSpentModel::Regressor(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Estimator {
        match self {
            TimeSpentModel::Classifier(m) => m,
            TimeSpentModel::Regressor(m) => m,
        }
    }

    /// Record held-out metrics in the model metadata
    pub fn set_validation_metrics(&mut self, metrics: ModelMetrics) {
        match self {
            TimeSpentModel::Classifier(m) => m.metadata.validation_metrics = Some(metrics),
            TimeSpentModel::Regressor(m) => m.metadata.validation_metrics = Some(metrics),
        }
    }
}

impl Estimator for TimeSpentModel {
    fn train(&mut self, dataset: &TrainingDataset) -> Result<ModelMetrics> {
        self.inner_mut().train(dataset)
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<f64>> {
        self.inner().predict(features)
    }

    fn score(&self, dataset: &TrainingDataset) -> Result<ModelMetrics> {
        self.inner().score(dataset)
    }

    fn metadata(&self) -> &ModelMetadata {
        self.inner().metadata()
    }

    fn model_kind(&self) -> ModelKind {
        self.inner().model_kind()
    }

    fn is_trained(&self) -> bool {
        self.inner().is_trained()
    }
}
