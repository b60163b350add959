//! authlens inference server binary.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use authlens_core::backend::AdNdArray;
use authlens_model::XceptionNetConfig;
use authlens_server::config::ServerConfig;
use authlens_server::{app, DetectionEngine};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();

    // Setup logging
    let log_level = match config.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let device = Default::default();
    let model_config = XceptionNetConfig::default();

    let model = if config.random_init {
        tracing::warn!("running with random weights; predictions are meaningless");
        model_config.init::<AdNdArray>(&device)
    } else {
        // clap guarantees the path is present when --random-init is absent
        let path = config.weights.as_ref().context("missing --weights")?;
        tracing::info!(path = %path.display(), "loading detector checkpoint");
        authlens_model::load_model::<AdNdArray>(&model_config, path, &device)
            .with_context(|| format!("loading weights from {}", path.display()))?
    };

    let engine = DetectionEngine::new(model, config.target_layer, device)
        .context("configuring inference engine")?;
    tracing::info!(layer = %engine.target(), "explanation target layer");

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "authlens server listening");

    axum::serve(listener, app(Arc::new(engine)))
        .await
        .context("serving")?;

    Ok(())
}
