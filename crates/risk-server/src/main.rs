//! Health risk prediction server
//!
//! Serves the input form, the JSON prediction API, health checks and
//! Prometheus metrics over a directory of model artifacts.

use anyhow::{Context, Result};
use risk_lib::{
    health::{components, HealthRegistry},
    store::ArtifactWatcher,
    ArtifactStore, Dispatcher, FsBackend, ModelResolver, RiskMetrics, StructuredLogger,
};
use risk_server::{api, config::ServerConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting risk-server");

    let config = ServerConfig::load()?;
    let schema = Arc::new(config.schema()?);
    let families = config.families()?;
    info!(
        node_name = %config.node_name,
        targets = schema.targets().len(),
        features = schema.features().len(),
        families = families.len(),
        "Server configured"
    );

    if !config.model_dir.exists() {
        std::fs::create_dir_all(&config.model_dir).with_context(|| {
            format!("Failed to create model directory {:?}", config.model_dir)
        })?;
        warn!(dir = %config.model_dir.display(), "Model directory did not exist, created empty");
    }

    let health_registry = HealthRegistry::new();
    health_registry.register(components::DISPATCHER).await;

    let metrics = RiskMetrics::new();
    let logger = StructuredLogger::new(&config.node_name);
    logger.log_startup(
        SERVER_VERSION,
        &config.model_dir.display().to_string(),
        config.artifact_format.suffix(),
    );

    let backend = Arc::new(FsBackend::new(&config.model_dir));
    let store = Arc::new(ArtifactStore::new(backend.clone()).with_logger(logger.clone()));
    let dispatcher = Dispatcher::new(
        schema,
        families,
        ModelResolver::new(backend, config.artifact_format),
        store.clone(),
    )
    .with_logger(logger.clone());

    let coverage = dispatcher.coverage();
    health_registry.record_coverage(&coverage).await;
    for entry in coverage.missing() {
        warn!(target_name = %entry.target, family = %entry.family, artifact = %entry.artifact, "Model artifact missing");
    }
    info!(
        available = coverage.available(),
        total = coverage.total(),
        "Model artifact coverage"
    );

    // Dropping the watcher stops it, so it lives until shutdown.
    let _watcher = if config.watch_models {
        match ArtifactWatcher::spawn(&config.model_dir, store.clone()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!(error = %e, "Model directory watch disabled");
                None
            }
        }
    } else {
        None
    };

    let app_state = Arc::new(api::AppState::new(
        dispatcher,
        store,
        health_registry.clone(),
        metrics,
    ));

    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.port, app_state));

    tokio::select! {
        result = api_handle => {
            let reason = match result {
                Ok(Ok(())) => "server exited".to_string(),
                Ok(Err(e)) => format!("server error: {e}"),
                Err(e) => format!("server task failed: {e}"),
            };
            logger.log_shutdown(&reason);
            anyhow::bail!(reason);
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
