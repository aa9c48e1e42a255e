/// Issue dataset: CSV persistence, column table and data preparation
///
/// This module provides:
/// - Loading and saving the issue CSV
/// - Refreshing the dataset from an issue source
/// - Date normalization and text vectorization ahead of training

pub mod frame;
pub mod table;
pub mod transform;

pub use frame::IssueFrame;
pub use table::{Column, ColumnData, Table};
pub use transform::{convert_datetimes_to_ordinals, create_training_subset};

use crate::config::PathsConfig;
use crate::error::{AppError, Result};
use crate::ml::features::{vectorize_text_fields, FeaturePipeline};
use crate::ml::models::FeatureConfig;
use crate::models::{IssueRange, UpdateMode};
use async_trait::async_trait;
use tracing::{info, warn};

/// Something that can pull issues into a frame, e.g. the Jira client
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Fetch every issue in `range` and upsert it into `frame`
    async fn collect_issues(&self, frame: IssueFrame, range: IssueRange) -> Result<IssueFrame>;
}

/// What the caller asked for on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchRequest {
    pub update_mode: Option<UpdateMode>,
    pub start_issue: Option<u32>,
    pub end_issue: Option<u32>,
}

/// Dataset after date conversion and text vectorization
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    /// Rows as stored on disk
    pub raw: IssueFrame,

    /// Model-ready columns
    pub table: Table,

    /// Vectorizers fitted on `raw`
    pub pipeline: FeaturePipeline,
}

/// Load the dataset, refresh it from `source` when requested, and prepare it.
///
/// A missing dataset file is fatal unless an update mode was requested, in which
/// case the frame starts empty. `UpdateMode::All` pulls the requested issue range
/// and rewrites the CSV; `UpdateMode::Append` is not implemented.
pub async fn fetch_data(
    paths: &PathsConfig,
    features: &FeatureConfig,
    request: &FetchRequest,
    source: Option<&dyn IssueSource>,
) -> Result<PreparedDataset> {
    let mut frame = match IssueFrame::read_csv(&paths.dataset) {
        Ok(frame) => frame,
        Err(AppError::DatasetNotFound(path)) if request.update_mode.is_some() => {
            warn!(path = %path.display(), "dataset not found, starting from an empty frame");
            IssueFrame::new()
        }
        Err(e) => return Err(e),
    };

    match request.update_mode {
        Some(UpdateMode::All) => {
            info!("Updating all issue data");
            let source = source.ok_or_else(|| {
                AppError::Configuration("no issue source configured for update".to_string())
            })?;
            let range = IssueRange::from_bounds(request.start_issue, request.end_issue)?;
            frame = source.collect_issues(frame, range).await?;
            frame.write_csv(&paths.dataset)?;
            info!(
                path = %paths.dataset.display(),
                rows = frame.len(),
                "dataset written"
            );
        }
        Some(UpdateMode::Append) => {
            return Err(AppError::NotImplemented(
                "Append new data not implemented. Use -U to update entire dataset.".to_string(),
            ));
        }
        None => {}
    }

    prepare(frame, features)
}

/// Convert dates to ordinals and vectorize text fields
pub fn prepare(frame: IssueFrame, features: &FeatureConfig) -> Result<PreparedDataset> {
    let table = Table::from_frame(&frame);
    let table = convert_datetimes_to_ordinals(table)?;
    let (table, pipeline) = vectorize_text_fields(table, features)?;

    Ok(PreparedDataset {
        raw: frame,
        table,
        pipeline,
    })
}
