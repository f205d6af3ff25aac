//! ==============================================================================
//! server.rs - http router and listener
//! ==============================================================================
//!
//! purpose:
//!     wires the handlers onto their paths, adds cors for the mobile app,
//!     binds the listener and serves until shutdown.
//!
//! relationships:
//!     - used by: main.rs (run), handlers.rs tests (build_router)
//!     - mounts: handlers.rs
//!
//! ==============================================================================

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::handlers::{self, AppState};

pub fn build_router(state: AppState, cors: bool) -> Router {
    let router = Router::new()
        .route("/update-waste", post(handlers::update_waste))
        .route("/update-coordinates", post(handlers::update_coordinates))
        .route("/update-bin-fill", post(handlers::update_bin_fill))
        .route("/latest-data", get(handlers::latest_data))
        .with_state(state);

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// serve on an already-bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("listener has no local address")?;
    tracing::info!("Server listening at http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("http server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

pub async fn run(addr: &str, router: Router) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    serve(listener, router, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    })
    .await
}
