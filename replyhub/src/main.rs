mod config;

use clap::{Parser, Subcommand};
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use store::Store;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "replyhub", about = "Email reply routing and delivery service")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run the ingest HTTP service
    Serve {
        #[arg(long, default_value = "replyhub.yaml")]
        config: PathBuf,
    },
    /// Create the database schema and exit
    InitDb {
        #[arg(long, default_value = "replyhub.yaml")]
        config: PathBuf,
    },
    /// Replay every retryable error entry through a running service
    RetryAll {
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        url: String,
    },
}

#[derive(thiserror::Error, Debug)]
enum MainError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Ingest(#[from] ingest::errors::IngestError),
    #[error(transparent)]
    Store(#[from] store::StoreError),
    #[error("could not install metrics recorder: {0}")]
    Metrics(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Defaults to "info" when REPLYHUB_LOG is not set.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("REPLYHUB_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_metrics(statsd: Option<&ingest::config::StatsdConfig>) -> Result<(), MainError> {
    let Some(statsd) = statsd else {
        return Ok(());
    };
    let recorder = StatsdBuilder::from(&statsd.host, statsd.port)
        .build(Some(&statsd.prefix))
        .map_err(|error| MainError::Metrics(error.to_string()))?;
    metrics::set_global_recorder(recorder)
        .map_err(|error| MainError::Metrics(error.to_string()))?;
    shared::metrics_defs::describe_all(ingest::metrics_defs::ALL);
    Ok(())
}

async fn retry_all(base_url: &str) -> Result<(), MainError> {
    let client = reqwest::Client::new();
    let listing: serde_json::Value = client
        .get(format!("{base_url}/errors/retryable"))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let ids: Vec<i64> = listing["ids"]
        .as_array()
        .map(|array| array.iter().filter_map(|id| id.as_i64()).collect())
        .unwrap_or_default();

    let total = ids.len();
    let mut failed = 0usize;
    for (index, id) in ids.iter().enumerate() {
        let result = client
            .post(format!("{base_url}/errors/retry"))
            .json(&serde_json::json!({ "id": id }))
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {
                tracing::info!(id, done = index + 1, total, "replayed");
            }
            Ok(response) => {
                failed += 1;
                tracing::warn!(id, status = %response.status(), "replay failed");
            }
            Err(error) => {
                failed += 1;
                tracing::warn!(id, %error, "replay failed");
            }
        }
    }

    println!(
        "{}",
        serde_json::json!({ "done": total - failed, "total": total, "failed": failed })
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), MainError> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        CliCommand::Serve { config } => {
            let config = config::from_file(&config)?;
            init_metrics(config.statsd.as_ref())?;
            ingest::run(config).await?;
        }
        CliCommand::InitDb { config } => {
            let config = config::from_file(&config)?;
            let store = Store::connect(&config.database.url).await?;
            store.init_schema().await?;
            tracing::info!(url = %config.database.url, "schema initialized");
        }
        CliCommand::RetryAll { url } => {
            retry_all(url.trim_end_matches('/')).await?;
        }
    }

    Ok(())
}
