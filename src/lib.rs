pub mod api;
pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod domain;
pub mod library;
pub mod services;
pub mod state;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use cli::{Cli, Commands};
pub use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use state::SharedState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Entry point once the runtime is up. `config_path` is where the config
/// was loaded from and where settings saves go.
pub async fn run(cli: Cli, config: Config, config_path: PathBuf) -> anyhow::Result<()> {
    config.validate()?;
    init_tracing(&config);
    log_config_source(&config_path);

    match cli.command {
        None => run_server(config, config_path, None).await,
        Some(Commands::Serve { port }) => run_server(config, config_path, port).await,
        Some(Commands::List { path }) => cli::cmd_list(&config, &path).await,
        Some(Commands::Rename { old_path, new_name }) => {
            cli::cmd_rename(&config, &old_path, &new_name).await
        }
        Some(Commands::InitConfig) => cli::cmd_init_config(&config_path),
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if let Err(e) = registry.try_init() {
        eprintln!("Tracing already initialized: {e}");
    }
}

// Config is loaded before the subscriber exists, so where it came from is
// reported here instead.
fn log_config_source(config_path: &Path) {
    if config_path.exists() {
        info!("Loaded config from: {}", config_path.display());
    } else {
        info!(
            "No config file at {}, using defaults",
            config_path.display()
        );
    }
}

fn init_metrics(config: &Config) -> anyhow::Result<Option<PrometheusHandle>> {
    if !config.observability.metrics_enabled {
        return Ok(None);
    }

    use metrics_exporter_prometheus::PrometheusBuilder;
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    info!("Prometheus metrics recorder initialized");
    Ok(Some(handle))
}

async fn run_server(
    mut config: Config,
    config_path: PathBuf,
    port_override: Option<u16>,
) -> anyhow::Result<()> {
    info!("Mediabox v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Some(port) = port_override {
        config.server.port = port;
    }

    if !config.server.enabled {
        info!("Web server disabled in config; nothing to do");
        return Ok(());
    }

    let prometheus_handle = init_metrics(&config)?;
    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    info!(media_root = %config.library.media_root, "Serving media library");

    let shared = Arc::new(SharedState::new(config, config_path).await?);
    let api_state = api::create_app_state(shared.clone(), prometheus_handle);
    let app = api::router(api_state).await;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("🌐 Web Server running at http://{}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Web server error: {}", e);
    }

    shared.shutdown().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}
