//! HTTP request layer over the pipelines.
//!
//! Thin by design: schema validation and routing live here, all semantics
//! live in the pipelines. `build_router` is separate from `serve` so route
//! tests can drive the router directly.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppConfig;

mod error;
mod routes;
mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = if state.config.server.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(routes::health))
        .route("/documents/process", post(routes::process_documents))
        .route("/search", post(routes::search))
        .layer(TimeoutLayer::new(state.config.server.timeout()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until SIGTERM or Ctrl+C.
pub async fn serve(config: &AppConfig, state: AppState) -> anyhow::Result<()> {
    let addr = config.server.socket_addr()?;
    let app = build_router(state);

    info!(%addr, "starting docpipe server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
