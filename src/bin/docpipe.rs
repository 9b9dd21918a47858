//! docpipe server binary.
//!
//! Loads configuration, wires the Qdrant-backed pipelines, and serves the
//! HTTP API until shutdown.

use std::sync::Arc;

use docpipe::config::AppConfig;
use docpipe::embed::provider_from;
use docpipe::server::{serve, AppState};
use docpipe::store::QdrantIndex;
use docpipe::synthesis::{HostedSynthesizer, Synthesizer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(&config.server.log_level)
        .with_target(false)
        .json()
        .init();

    let index = Arc::new(QdrantIndex::connect(&config.qdrant)?);
    let embedder = provider_from(&config.embedding)?;

    let synthesizer: Option<Arc<dyn Synthesizer>> = match &config.synthesis {
        Some(settings) => Some(Arc::new(HostedSynthesizer::new(settings)?)),
        None => None,
    };

    let state = AppState::new(config.clone(), index, embedder, synthesizer);
    serve(&config, state).await
}
