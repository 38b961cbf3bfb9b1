//! Server module
//!
//! HTTP and WebSocket endpoints in front of one session hub.

pub mod connect_info;
pub mod http;
pub mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::session::SessionHub;

/// Routes: `/ws`, `/health`, `/api/history`.
pub fn router(hub: Arc<SessionHub>) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(http::health_handler))
        .route("/api/history", get(http::history_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(hub)
}

/// Bind and serve until the listener fails.
pub async fn serve(listener: TcpListener, hub: Arc<SessionHub>) -> std::io::Result<()> {
    axum::serve(
        listener,
        router(hub).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

/// Run the server from configuration until ctrl-c or SIGTERM.
pub async fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let hub = SessionHub::new(config.session_settings());
    let address = config.bind_address();
    let listener = TcpListener::bind(&address).await?;
    info!(address = %listener.local_addr()?, "livepoll listening");

    axum::serve(
        listener,
        router(hub).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("failed to install ctrl-c handler: {}", err);
            std::future::pending::<()>().await;
        }
        info!("received ctrl-c, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(err) => {
                warn!("failed to install SIGTERM handler: {}", err);
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
}
