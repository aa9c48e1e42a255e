/// Integration tests for the estimation pipeline
///
/// These tests drive a full run against files in a temporary directory:
/// - Training and persisting a model from a stored dataset
/// - Reusing the persisted model
/// - Failure modes for missing files and unsupported update modes

mod common;

use common::{config_in, labelled_frame, DAY, HOUR};
use ticket_estimator::{
    dataset::{FetchRequest, IssueFrame},
    models::UpdateMode,
    run, AppError, RunOptions,
};
use tempfile::TempDir;

#[tokio::test]
async fn test_train_then_reuse_model() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());
    labelled_frame(40).write_csv(&config.paths.dataset).unwrap();

    let options = RunOptions {
        update_model: true,
        ..RunOptions::default()
    };
    let report = run(&config, &options, None).await.unwrap();

    assert_eq!(report.dataset_rows, 42);
    assert!(config.paths.model.exists());
    let metrics = report.metrics.expect("validation metrics recorded");
    assert_eq!(metrics.n_samples, 12);
    assert_eq!(report.predictions.len(), 2);
    assert_eq!(report.predictions[0].key, "PROJ-open-1");
    assert_eq!(report.predictions[0].time_spent, DAY);
    assert_eq!(report.predictions[1].time_spent, HOUR);

    let reused = run(&config, &RunOptions::default(), None).await.unwrap();
    assert_eq!(reused.predictions, report.predictions);
}

#[tokio::test]
async fn test_missing_model_without_update() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());
    labelled_frame(10).write_csv(&config.paths.dataset).unwrap();

    let result = run(&config, &RunOptions::default(), None).await;
    match result {
        Err(AppError::Model(msg)) => assert!(msg.contains("--update-model")),
        other => panic!("expected model error, got {:?}", other.map(|r| r.dataset_rows)),
    }
}

#[tokio::test]
async fn test_missing_dataset_without_update() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());

    let result = run(&config, &RunOptions::default(), None).await;
    assert!(matches!(result, Err(AppError::DatasetNotFound(_))));
}

#[tokio::test]
async fn test_append_mode_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());
    labelled_frame(10).write_csv(&config.paths.dataset).unwrap();

    let options = RunOptions {
        fetch: FetchRequest {
            update_mode: Some(UpdateMode::Append),
            ..FetchRequest::default()
        },
        update_model: true,
    };
    let result = run(&config, &options, None).await;

    assert!(matches!(result, Err(AppError::NotImplemented(_))));
    assert!(!config.paths.model.exists());
}

#[tokio::test]
async fn test_dataset_survives_csv_round_trip() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path());
    let frame = labelled_frame(6);
    frame.write_csv(&config.paths.dataset).unwrap();

    let raw = std::fs::read_to_string(&config.paths.dataset).unwrap();
    assert!(raw.starts_with("key,summary,description,"));

    let loaded = IssueFrame::read_csv(&config.paths.dataset).unwrap();
    assert_eq!(loaded, frame);
    assert_eq!(loaded.shape(), (8, 16));
}
