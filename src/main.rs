//! thanos-remote-read server
//!
//! Serves the Prometheus remote read API from a Thanos StoreAPI endpoint.
//!
//! Configuration is layered: built-in defaults, then the config file, then
//! `THANOS_REMOTE_READ_*` environment variables, then command line flags.
//! `RUST_LOG` overrides the configured log level.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use thanos_remote_read::api::{serve, ApiConfig, AppState};
use thanos_remote_read::config::{generate_default_config, Config, LoggingConfig};
use thanos_remote_read::labels::ReplicaLabels;
use thanos_remote_read::metrics::Metrics;
use thanos_remote_read::read::{RemoteReader, WarningPolicy};
use thanos_remote_read::store::GrpcStore;

#[derive(Parser)]
#[command(name = "thanos-remote-read")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Prometheus remote read adapter for the Thanos StoreAPI")]
struct Cli {
    /// Config file (default: search the usual locations)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to serve the remote read API on
    #[arg(long)]
    listen: Option<String>,

    /// Thanos StoreAPI gRPC endpoint
    #[arg(long)]
    store: Option<String>,

    /// Comma separated replica label names to deduplicate across
    #[arg(long)]
    replica_labels: Option<String>,

    /// What to do with store warnings (fail, ignore)
    #[arg(long)]
    warning_policy: Option<WarningPolicy>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long)]
    log_format: Option<String>,

    /// Print the default config file and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(listen) = &self.listen {
            config.server.listen = listen.clone();
        }
        if let Some(store) = &self.store {
            config.store.endpoint = store.clone();
        }
        if let Some(labels) = &self.replica_labels {
            config.read.replica_labels = ReplicaLabels::from_csv(labels);
        }
        if let Some(policy) = self.warning_policy {
            config.read.warning_policy = policy;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    // No subscriber yet: load errors must be returned, not logged
    let (mut config, source) = match &cli.config {
        Some(path) => (Config::load_with_env(path)?, Some(path.clone())),
        None => Config::load_default()?,
    };
    cli.apply(&mut config);
    config.validate()?;

    init_tracing(&config.logging);

    tracing::info!(
        "Starting thanos-remote-read v{}",
        env!("CARGO_PKG_VERSION")
    );
    match &source {
        Some(path) => tracing::info!("Loaded config from {:?}", path),
        None => tracing::info!("Using default config with environment overrides"),
    }
    tracing::info!(
        store = %config.store.endpoint,
        replica_labels = ?config.read.replica_labels.names(),
        warning_policy = %config.read.warning_policy,
        "Read configuration"
    );

    let metrics = Arc::new(Metrics::new());
    let store = GrpcStore::new(&config.store.endpoint, config.store.connect_timeout())
        .with_context(|| format!("invalid store endpoint {:?}", config.store.endpoint))?
        .with_metrics(Arc::clone(&metrics));

    let reader = RemoteReader::new(Arc::new(store), config.read_options(), Arc::clone(&metrics));
    let state = AppState::new(reader, metrics, ApiConfig::from_config(&config)?);

    serve(state).await?;

    tracing::info!("thanos-remote-read stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "thanos_remote_read={level},tower_http={level}",
            level = logging.level
        )
        .into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format.as_str() {
        "json" => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
