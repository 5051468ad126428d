mod config;

use clap::{Parser, Subcommand};
use config::{Config, ConfigError, StatsdConfig};
use metrics_exporter_statsd::StatsdBuilder;
use resolver::store::RepositoryStore;
use resolver::{ConfigResolver, GitStore, StoreError};
use server::api::{self, AppState};
use server::{SlidingWindowLimiter, UpdateQueue, worker};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "confhub", about = "Git-backed configuration distribution service")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run the HTTP service
    Serve,
}

#[derive(thiserror::Error, Debug)]
enum ServeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("repository error: {0}")]
    Store(#[from] StoreError),

    #[error("server error: {0}")]
    Api(#[from] server::ApiError),

    #[error("metrics exporter error: {0}")]
    Metrics(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        CliCommand::Serve => {
            if let Err(err) = serve() {
                tracing::error!(error = %err, "confhub failed to start");
                std::process::exit(1);
            }
        }
    }
}

fn serve() -> Result<(), ServeError> {
    let config = Config::from_env()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<(), ServeError> {
    install_metrics(config.statsd.as_ref())?;

    let store = Arc::new(GitStore::new(config.repo_path.clone(), &config.repo_url));
    // The service cannot answer for branches it has never seen; a failing
    // clone at boot is fatal.
    store.init_all_branches().await?;

    let (queue, updates) = UpdateQueue::bounded(config.queue_size);
    let state = Arc::new(AppState {
        resolver: ConfigResolver::new(store.clone(), config.default_branch.clone()),
        queue,
        limiter: SlidingWindowLimiter::new(config.rate_limit, config.rate_limit_window),
        auth_token: config.auth_token.clone(),
        webhook_secret: config.webhook_secret.clone(),
    });
    let sync_worker = worker::spawn(updates, store.clone());

    let served = api::serve(config.port, state.clone()).await;

    // Orderly shutdown: stop the limiter sweep, close the queue by dropping
    // its last producer, then wait for the worker to finish draining.
    state.limiter.stop().await;
    drop(state);
    if let Err(err) = sync_worker.await {
        tracing::error!(error = %err, "sync worker did not exit cleanly");
    }

    served.map_err(ServeError::from)
}

fn install_metrics(statsd: Option<&StatsdConfig>) -> Result<(), ServeError> {
    let Some(statsd) = statsd else {
        tracing::debug!("statsd not configured, metrics recording is a no-op");
        return Ok(());
    };

    let recorder = StatsdBuilder::from(statsd.host.as_str(), statsd.port)
        .with_queue_size(5000)
        .with_buffer_size(1024)
        .build(Some("confhub"))
        .map_err(|err| ServeError::Metrics(err.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|err| ServeError::Metrics(err.to_string()))?;

    shared::describe(&server::metrics_defs::ALL);
    tracing::info!(host = %statsd.host, port = statsd.port, "statsd exporter installed");
    Ok(())
}
