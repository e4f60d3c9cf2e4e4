use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use tokio::net::TcpListener;
use tower_http::{decompression::RequestDecompressionLayer, trace::TraceLayer};
use tracing::info;

use super::{
    services::{
        abort_resource, board, health, link_signal, list_resources, metrics, scan_links,
        update_network,
    },
    state::AppState,
};
use crate::config::Config;
use crate::issuer::HintIssuer;
use crate::links::spawn_periodic_scan;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/links/scan", post(scan_links))
        .route("/links/signal", post(link_signal))
        .route("/resources", get(list_resources))
        .route("/resources/abort", post(abort_resource))
        .route("/board", get(board))
        .route("/metrics", get(metrics))
        .route("/network", put(update_network))
        .with_state(state)
        .layer(RequestDecompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Serves the API until Ctrl+C or SIGTERM.
///
/// Also runs the board fader and, when `links_file` is given, rescans it every
/// `links.scan_interval`.
pub async fn run(
    config: Config,
    issuer: Arc<dyn HintIssuer>,
    links_file: Option<PathBuf>,
) -> Result<(), AnyError> {
    let address = config.server.bind_addr;
    let fade_period = config.board.fadeout_delay.as_duration();
    let scan_interval = config.links.scan_interval.as_duration();

    let state = AppState::new(config, issuer)?;

    let fader = (!fade_period.is_zero())
        .then(|| state.board.spawn_fader(state.scheduler.clone(), fade_period));

    let scanner = match links_file {
        Some(path) if !scan_interval.is_zero() => {
            info!(path = %path.display(), interval = ?scan_interval, "Periodic link scan enabled");
            Some(spawn_periodic_scan(Arc::clone(&state.feed), path, scan_interval))
        }
        _ => None,
    };

    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "hintbox API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for task in fader.into_iter().chain(scanner) {
        task.abort();
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}
