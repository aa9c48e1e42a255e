/// Machine learning for time-spent estimation
///
/// This module provides:
/// - TF-IDF vectorization of free-text issue fields
/// - Seeded train/test splitting
/// - Decision tree classifier and regressor over time spent
/// - Model persistence and prediction for open issues

pub mod classifier;
pub mod features;
pub mod models;
pub mod service;

pub use classifier::{
    DecisionTreeClassifierWrapper, DecisionTreeRegressorWrapper, Estimator, TimeSpentModel,
};
pub use features::{vectorize_text_fields, FeaturePipeline, TfidfVectorizer};
pub use models::{
    FeatureConfig, ModelKind, ModelMetadata, ModelMetrics, Prediction, TrainingConfig,
    TrainingDataset,
};
pub use service::{load_model, predict_open_issues, save_model, update_or_create_model, ModelArtifact};
