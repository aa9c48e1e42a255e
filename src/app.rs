use crate::config::Config;
use crate::dataset::{fetch_data, FetchRequest, IssueSource};
use crate::error::Result;
use crate::ml::models::{ModelMetrics, Prediction};
use crate::ml::service::{load_model, predict_open_issues, save_model, update_or_create_model};
use tracing::info;

/// What one run of the estimator should do
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub fetch: FetchRequest,

    /// Retrain and overwrite the stored model instead of loading it
    pub update_model: bool,
}

/// Outcome of a run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub dataset_rows: usize,

    /// Held-out metrics of the model used for prediction, when known
    pub metrics: Option<ModelMetrics>,

    pub predictions: Vec<Prediction>,
}

/// Refresh the dataset, obtain a model and estimate every open issue.
pub async fn run(
    config: &Config,
    options: &RunOptions,
    source: Option<&dyn IssueSource>,
) -> Result<RunReport> {
    let prepared = fetch_data(&config.paths, &config.features, &options.fetch, source).await?;
    info!(rows = prepared.raw.len(), "dataset ready");

    let artifact = if options.update_model {
        let artifact = update_or_create_model(&prepared, &config.training)?;
        save_model(&artifact, &config.paths.model)?;
        artifact
    } else {
        load_model(&config.paths.model)?
    };

    let predictions = predict_open_issues(&artifact, &prepared.raw)?;
    for prediction in &predictions {
        info!(
            key = %prediction.key,
            seconds = prediction.time_spent,
            hours = prediction.hours(),
            "estimated time spent"
        );
    }

    Ok(RunReport {
        dataset_rows: prepared.raw.len(),
        metrics: artifact.validation_metrics().cloned(),
        predictions,
    })
}
