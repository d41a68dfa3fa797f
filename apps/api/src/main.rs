mod analysis;
mod config;
mod control_room;
mod errors;
mod optimizer;
mod routes;
mod state;

use anyhow::Result;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::risk::DeclaredRiskScorer;
use crate::config::Config;
use crate::control_room::RuntimeStateStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; malformed values abort startup
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting FactoryFix API v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Optimizer: max {} new machines, overload x{}, transfer {}, early stop x{}",
        config.optimizer.max_new_machines,
        config.optimizer.overload_threshold,
        config.optimizer.transfer_fraction,
        config.optimizer.early_stop_fraction
    );
    info!("Control room broadcast period: {:?}", config.broadcast_period);

    let shutdown = CancellationToken::new();

    // Build app state
    let state = AppState {
        config: config.clone(),
        runtime: Arc::new(RuntimeStateStore::new()),
        risk_scorer: Arc::new(DeclaredRiskScorer),
        shutdown: shutdown.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM and cancels every control-room stream.
async fn shutdown_signal(shutdown: CancellationToken) {
    cancel_on(shutdown, os_signal()).await;
}

async fn os_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    // Only Ctrl+C exists off unix.
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Waits for `signal` (or an earlier cancel) and then cancels `shutdown`.
async fn cancel_on<F>(shutdown: CancellationToken, signal: F)
where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = signal => info!("Shutdown requested"),
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();
}
