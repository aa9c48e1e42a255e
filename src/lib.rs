//! Ticket Estimator
//!
//! Collects issue-tracker tickets into a CSV dataset, turns them into numeric
//! features and trains a decision tree that predicts how long open tickets will take.

pub mod app;
pub mod config;
pub mod dataset;
pub mod error;
pub mod jira;
pub mod ml;
pub mod models;

pub use app::{run, RunOptions, RunReport};
pub use config::Config;
pub use error::{AppError, Result};
