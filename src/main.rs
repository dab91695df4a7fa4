// =============================================================================
// Signal Desk — Main Entry Point
// =============================================================================
//
// Boots the signal poller and the dashboard API. The poller fetches hourly
// prices for every configured symbol, derives the 1h / 4h / 1d signal tables
// and publishes them into `AppState`; the API only reads those snapshots.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod error;
mod indicators;
mod market_data;
mod poller;
mod runtime_config;
mod signals;
mod types;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::market_data::BinanceClient;
use crate::runtime_config::{RuntimeConfig, DEFAULT_CONFIG_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Signal Desk starting up");

    let config_path = std::env::var("SIGNAL_DESK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    if let Ok(syms) = std::env::var("SIGNAL_DESK_SYMBOLS") {
        config.apply_symbols_override(&syms);
    }
    if let Ok(addr) = std::env::var("SIGNAL_DESK_BIND_ADDR") {
        config.bind_addr = addr;
    }

    info!(
        symbols = ?config.symbols,
        lookback_days = config.lookback_days,
        params = ?config.signal_params,
        "Configuration ready"
    );

    let bind_addr = config.bind_addr.clone();
    let client = Arc::new(BinanceClient::new(&config.api_base_url)?);
    let state = Arc::new(AppState::new(config, config_path.clone()));

    // ── 2. Signal poller ─────────────────────────────────────────────────
    let poller = poller::start(state.clone(), client);

    // ── 3. API server ────────────────────────────────────────────────────
    let api_state = state.clone();
    tokio::spawn(async move {
        let app = api::rest::router(api_state);
        let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
            Ok(l) => l,
            Err(e) => {
                error!(addr = %bind_addr, error = %e, "Failed to bind API server");
                return;
            }
        };
        info!(addr = %bind_addr, "API server listening");
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server failed");
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 4. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received, stopping");

    poller.stop().await;

    let config = state.runtime_config.read().clone();
    if let Err(e) = config.save(&config_path) {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("Signal Desk shut down complete.");
    Ok(())
}
