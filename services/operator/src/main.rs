//! Langfuse operator
//!
//! Reconciles declarative Langfuse records (projects, API keys, models,
//! prompts, score configs) against a Langfuse instance.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use lfo_langfuse::LangfuseClient;
use lfo_operator::{
    config::Config,
    controllers::Context,
    manager::{ControllerManager, ManagerConfig},
    manifests::ManifestLoader,
    store::{MemoryStore, RecordStore},
};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to LFO_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Langfuse operator");
    info!(
        langfuse_host = %config.langfuse.base_url,
        workers = config.workers,
        manifest_dir = ?config.manifest_dir,
        "Configuration loaded"
    );

    let langfuse =
        LangfuseClient::new(&config.langfuse).context("failed to build Langfuse client")?;
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let ctx = Context::new(Arc::clone(&store), Arc::new(langfuse));

    // Create shutdown channel for graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start manifest loader in background
    let loader_handle = config.manifest_dir.clone().map(|dir| {
        let loader = ManifestLoader::new(Arc::clone(&store), dir, config.manifest_resync);
        tokio::spawn(loader.run(shutdown_rx.clone()))
    });
    if loader_handle.is_none() {
        warn!("LFO_MANIFEST_DIR not set, no records will be loaded");
    }

    // Start controllers in background
    let manager = ControllerManager::new(
        ctx,
        ManagerConfig {
            workers: config.workers,
            queue: config.queue.clone(),
        },
    );
    let manager_handle = tokio::spawn(manager.run(shutdown_rx));

    // Wait for shutdown signal (Ctrl+C)
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Received shutdown signal");

    // Signal shutdown to all workers
    let _ = shutdown_tx.send(true);

    info!("Waiting for workers to shut down...");
    let shutdown_timeout = Duration::from_secs(10);

    if let Some(handle) = loader_handle {
        match tokio::time::timeout(shutdown_timeout, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Manifest loader task failed"),
            Err(_) => warn!("Manifest loader did not shut down in time"),
        }
    }

    match tokio::time::timeout(shutdown_timeout, manager_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Controller manager task failed"),
        Err(_) => warn!("Controller manager did not shut down in time"),
    }

    info!("Langfuse operator shutdown complete");
    Ok(())
}
