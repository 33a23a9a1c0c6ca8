//! # deedshare-api — Binary Entry Point
//!
//! Starts the Axum HTTP server. Binds to `DEEDSHARE_PORT` (default 8080) and
//! shuts down gracefully on Ctrl-C or SIGTERM.

use deedshare_api::state::{AppConfig, AppState, LogFormat};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    // Initialize structured tracing.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::debug!(?config, "configuration loaded");

    // Open snapshot persistence; without a data directory state is in-memory only.
    let data_dir = deedshare_api::db::init_data_dir(config.data_dir.as_deref()).map_err(|e| {
        tracing::error!("data directory initialization failed: {e}");
        e
    })?;

    let port = config.port;
    let state = match &data_dir {
        Some(dir) => AppState::open(config, dir).map_err(|e| {
            tracing::error!("snapshot hydration failed: {e}");
            e
        })?,
        None => AppState::with_config(config),
    };

    let app = deedshare_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("deedshare API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl-C, draining connections"),
        _ = terminate => tracing::info!("received SIGTERM, draining connections"),
    }
}
