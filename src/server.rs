//! HTTP server: relay endpoint, health check and static front-end assets.

use std::{future::Future, sync::Arc};

use anyhow::Context;
use axum::{response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::{
    config::RelayConfig,
    relay::{realtime_handler, AssemblyAiConnector, UpstreamConnector, RELAY_PATH},
};

/// Shared, read-only state handed to every request.
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub connector: Arc<dyn UpstreamConnector>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> anyhow::Result<Self> {
        let connector = AssemblyAiConnector::from_config(&config)
            .context("failed to build upstream connector")?;
        Ok(Self::with_connector(config, Arc::new(connector)))
    }

    pub fn with_connector(config: RelayConfig, connector: Arc<dyn UpstreamConnector>) -> Self {
        Self {
            config: Arc::new(config),
            connector,
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

pub fn build_app(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();

    let mut app = Router::new()
        .route(RELAY_PATH, get(realtime_handler))
        .route("/health", get(health))
        .with_state(state);

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(TraceLayer::new_for_http())
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")
}

pub async fn run(config: RelayConfig) -> anyhow::Result<()> {
    let addr = config.bind_addr();
    let port = config.port;
    let state = Arc::new(AppState::new(config)?);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        upstream = %state.config.upstream_url,
        static_dir = ?state.config.static_dir,
        "Proxy server running on http://localhost:{port}"
    );

    serve(listener, state, shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server");
}
