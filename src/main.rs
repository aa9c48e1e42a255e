use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use ticket_estimator::{
    config::{Config, LoggingConfig},
    dataset::{FetchRequest, IssueSource},
    jira::JiraClient,
    models::UpdateMode,
    run, RunOptions,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "ticket-estimator", version)]
#[command(about = "Predict time spent on issue-tracker tickets", long_about = None)]
struct Cli {
    /// Append new issues to the dataset
    #[arg(short = 'u', long, conflicts_with = "update_all_issues")]
    update_issues: bool,

    /// Re-pull every issue in the range and rewrite the dataset
    #[arg(short = 'U', long)]
    update_all_issues: bool,

    /// First issue number to pull
    #[arg(short = 's', long, value_name = "N")]
    start_issue: Option<u32>,

    /// Last issue number to pull
    #[arg(short = 'e', long, value_name = "N")]
    end_issue: Option<u32>,

    /// Retrain the model and overwrite the stored one
    #[arg(short = 'm', long)]
    update_model: bool,

    /// Configuration file
    #[arg(short = 'c', long, env = "TICKET_ESTIMATOR_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    fn update_mode(&self) -> Option<UpdateMode> {
        if self.update_all_issues {
            Some(UpdateMode::All)
        } else if self.update_issues {
            Some(UpdateMode::Append)
        } else {
            None
        }
    }

    fn run_options(&self) -> RunOptions {
        RunOptions {
            fetch: FetchRequest {
                update_mode: self.update_mode(),
                start_issue: self.start_issue,
                end_issue: self.end_issue,
            },
            update_model: self.update_model,
        }
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.log_level.as_str().into());

    if logging.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config.logging);

    tracing::info!("Starting ticket-estimator v{}", env!("CARGO_PKG_VERSION"));

    let options = cli.run_options();
    let jira = match options.fetch.update_mode {
        Some(UpdateMode::All) => Some(JiraClient::new(config.jira.clone())?),
        _ => None,
    };
    let source = jira.as_ref().map(|client| client as &dyn IssueSource);

    let report = run(&config, &options, source).await?;
    tracing::info!(
        rows = report.dataset_rows,
        predictions = report.predictions.len(),
        "run complete"
    );

    Ok(())
}
