use crate::dataset::{
    convert_datetimes_to_ordinals, create_training_subset, IssueFrame, PreparedDataset, Table,
};
use crate::error::{AppError, Result};
use crate::ml::classifier::{Estimator, TimeSpentModel};
use crate::ml::features::FeaturePipeline;
use crate::ml::models::{ModelMetadata, ModelMetrics, Prediction, TrainingConfig, TrainingDataset};
use crate::models::{KEY_COLUMN, TARGET_COLUMN};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::Path;
use tracing::{debug, info, warn};

/// Everything needed to predict on new rows: the fitted vectorizers and the tree
#[derive(Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Vectorizers the model was trained against
    pub pipeline: FeaturePipeline,

    /// Feature names in matrix column order
    pub feature_names: Vec<String>,

    /// Trained estimator
    pub model: TimeSpentModel,
}

impl ModelArtifact {
    pub fn metadata(&self) -> &ModelMetadata {
        self.model.metadata()
    }

    /// Metrics on the held-out split
    pub fn validation_metrics(&self) -> Option<&ModelMetrics> {
        self.model.metadata().validation_metrics.as_ref()
    }
}

/// Train a fresh model on the rows that carry a time-spent value.
///
/// Holds out `test_size` of them, scores the tree on that part and records the
/// score in the model metadata. Incremental updates of an existing model are not
/// supported; this always creates a new one.
pub fn update_or_create_model(
    prepared: &PreparedDataset,
    config: &TrainingConfig,
) -> Result<ModelArtifact> {
    let training_set = create_training_subset(&prepared.table)?;
    let dataset = TrainingDataset::from_table(&training_set)?;

    info!(
        rows = prepared.table.n_rows(),
        training_rows = dataset.n_samples,
        features = dataset.n_features,
        "training dataset shape"
    );
    debug!("training table\n{}", training_set);

    let (train, test) = dataset.train_test_split(config.test_size, config.random_state)?;

    let mut model = TimeSpentModel::new(config);
    info!(
        model = %model.metadata().name,
        train = train.n_samples,
        test = test.n_samples,
        "fitting model"
    );
    let training_metrics = model.train(&train)?;
    debug!(?training_metrics, "training metrics");

    let test_metrics = model.score(&test)?;
    match (test_metrics.accuracy, test_metrics.r2_score) {
        (Some(accuracy), _) => info!(accuracy, mae = test_metrics.mean_absolute_error, "test score"),
        (None, Some(r2)) => info!(r2, mae = test_metrics.mean_absolute_error, "test score"),
        (None, None) => warn!("no test score available"),
    }
    model.set_validation_metrics(test_metrics);

    Ok(ModelArtifact {
        pipeline: prepared.pipeline.clone(),
        feature_names: dataset.feature_names,
        model,
    })
}

/// Persist a model artifact with bincode
pub fn save_model(artifact: &ModelArtifact, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, artifact)?;
    info!(path = %path.display(), "model saved");
    Ok(())
}

/// Load a model artifact written by [`save_model`]
pub fn load_model(path: &Path) -> Result<ModelArtifact> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::Model(format!(
                "model file {} not found; train one with --update-model",
                path.display()
            )))
        }
        Err(e) => return Err(e.into()),
    };
    let artifact: ModelArtifact = bincode::deserialize_from(BufReader::new(file))?;
    info!(
        path = %path.display(),
        model = %artifact.metadata().name,
        trained_at = %artifact.metadata().trained_at,
        "model loaded"
    );
    Ok(artifact)
}

/// Predict time spent for every ticket that has none logged yet.
///
/// Rows are encoded with the artifact's own vectorizers, not ones refitted on the
/// current dataset, so the feature layout matches what the tree was trained on.
pub fn predict_open_issues(artifact: &ModelArtifact, frame: &IssueFrame) -> Result<Vec<Prediction>> {
    let table = convert_datetimes_to_ordinals(Table::from_frame(frame))?;
    let table = artifact.pipeline.transform(table)?;

    let target = table.numeric(TARGET_COLUMN)?;
    let open = table.filter_rows(|i| target[i].is_none());
    if open.n_rows() == 0 {
        return Ok(Vec::new());
    }

    let (features, names) = open.feature_matrix(&[TARGET_COLUMN, KEY_COLUMN])?;
    if names != artifact.feature_names {
        return Err(AppError::Model(format!(
            "dataset yields {} features, model was trained on {}",
            names.len(),
            artifact.feature_names.len()
        )));
    }

    let predictions = artifact.model.predict(&features)?;
    Ok(open
        .keys()?
        .into_iter()
        .zip(predictions)
        .map(|(key, seconds)| Prediction::new(key, seconds))
        .collect())
}
