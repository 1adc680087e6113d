//! HTTP Server
//!
//! Exposes the catalog and the image proxy over HTTP.

pub mod routes;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

pub use routes::{router, AppState};

/// Bind `addr` and serve the API until `shutdown` resolves
///
/// Returns the bound address (useful with port 0) and the server task.
pub async fn serve<F>(
    addr: SocketAddr,
    state: AppState,
    shutdown: F,
) -> Result<(SocketAddr, JoinHandle<()>)>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state).layer(cors);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let local_addr = listener
        .local_addr()
        .context("Failed to read bound address")?;

    info!(addr = %local_addr, "HTTP server listening");

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!(error = %e, "HTTP server error");
        }
        info!("HTTP server stopped");
    });

    Ok((local_addr, handle))
}
