use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use phishguard_node::config::DetectorConfig;
use phishguard_node::loader::ModelLoader;
use phishguard_node::server::{create_router, initialize_metrics, DetectorState};

const CONFIG_PATH: &str = "config/default";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from file if available, otherwise use defaults
    let (config, config_error) = match DetectorConfig::from_file(CONFIG_PATH) {
        Ok(config) => (config, None),
        Err(e) => (DetectorConfig::default(), Some(e)),
    };

    init_logging(&config);

    info!(
        "Starting PhishGuard Detector v{} - Phishing URL Detection System",
        env!("CARGO_PKG_VERSION")
    );

    match config_error {
        None => info!("Configuration loaded from {}.toml", CONFIG_PATH),
        Some(e) => warn!("Failed to load config file: {}, using defaults", e),
    }

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Invalid configuration: {}", e));
    }

    let listen_addr = config
        .listen_addr()
        .context("Failed to parse server listen address")?;

    // Initialize metrics
    initialize_metrics();
    if config.metrics.enabled {
        let metrics_addr = config
            .metrics_addr()
            .context("Failed to parse metrics listen address")?;
        start_metrics_exporter(metrics_addr)?;
    }

    // The artifact is read on the first render, not here
    info!(
        artifact_path = %config.model.artifact_path,
        "Classifier artifact will be loaded on first use"
    );
    let state = DetectorState::new(ModelLoader::new(&config.model.artifact_path));

    let app = create_router(state);

    info!(listen_addr = %listen_addr, "Starting detector page server");

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Page server error")?;

    info!("PhishGuard Detector stopped");
    Ok(())
}

/// Initialize structured logging
fn init_logging(config: &DetectorConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("phishguard_node={}", config.logging.level).into());

    if config.json_logs() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_thread_ids(true)
            .with_line_number(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .with_line_number(true)
            .init();
    }
}

/// Start Prometheus metrics exporter
fn start_metrics_exporter(addr: SocketAddr) -> Result<()> {
    info!(metrics_addr = %addr, "Starting Prometheus metrics server");

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!(metrics_addr = %addr, "Prometheus metrics server started");
    Ok(())
}

/// Resolves on Ctrl+C
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
