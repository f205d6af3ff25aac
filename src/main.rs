//! ==============================================================================
//! main.rs - telemetry relay entry point
//! ==============================================================================
//!
//! purpose:
//!     the relay sits between the smart bin's esp32 boards and the mobile
//!     app. the boards push whatever they have whenever they have it; the
//!     app polls (every ~5s) for the latest of everything.
//!
//! responsibilities:
//!     - load relay.toml (or defaults)
//!     - initialise tracing
//!     - own the telemetry store for the lifetime of the process
//!     - serve the ingestion + query endpoints until ctrl-c
//!
//! relationships:
//!     - uses: config.rs (RelayConfig)
//!     - uses: store.rs (TelemetryStore, injected into handlers)
//!     - uses: server.rs (router, listener, shutdown)
//!
//! architecture:
//!
//!     ┌──────────────┐  POST /update-waste        ┌──────────────────────┐
//!     │  esp32 bin   │ ─────────────────────────▶ │                      │
//!     │  (classifier,│  POST /update-coordinates  │   relay (this crate) │
//!     │   gps, fill) │ ─────────────────────────▶ │                      │
//!     │              │  POST /update-bin-fill     │  ┌────────────────┐  │
//!     │              │ ─────────────────────────▶ │  │ TelemetryStore │  │
//!     └──────────────┘                            │  │ message        │  │
//!                                                 │  │ coordinates    │  │
//!     ┌──────────────┐  GET /latest-data          │  │ bin fill       │  │
//!     │  mobile app  │ ◀───────────────────────── │  └────────────────┘  │
//!     │  (polls 5s)  │                            └──────────────────────┘
//!     └──────────────┘
//!
//! ==============================================================================

mod config;
mod domain;
mod error;
mod handlers;
mod server;
mod store;

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // startup banner
    println!("===========================================================");
    println!("  Smart Bin Telemetry Relay");
    println!("  \"Push anytime, poll the latest\"");
    println!("===========================================================");

    // step 1: load configuration
    let config = config::RelayConfig::load_or_default();
    config.print_summary();

    // step 2: logging (RUST_LOG wins over the config file)
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // step 3: the one store for this process
    let store = Arc::new(store::TelemetryStore::new());
    let state = handlers::AppState::new(store, config.logging.show_telemetry);

    // step 4: serve until ctrl-c
    let router = server::build_router(state, config.cors.enabled);
    if let Err(e) = server::run(&config.bind_addr(), router).await {
        tracing::error!("Fatal: {:#}", e);
        return Err(e);
    }
    Ok(())
}
