// =============================================================================
// Sentimeter: Main Entry Point
// =============================================================================
//
// Serves the index-futures sentiment dashboard. Market data is fetched from
// the broker on demand (`/api/refresh-data`) and, when `auto_refresh_secs` is
// configured, on a fixed background schedule.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod broker;
mod catalog;
mod config;
mod market_data;
mod sentiment;
mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::{AppConfig, BrokerCredentials};

const DEFAULT_CONFIG_PATH: &str = "sentimeter.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Sentimeter starting up");

    let config_path =
        std::env::var("SENTIMETER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut config = AppConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, path = %config_path, "Failed to load config, using defaults");
        AppConfig::default()
    });
    config.apply_env_overrides();

    let credentials = BrokerCredentials::from_env();
    if let Some(missing) = credentials.missing() {
        warn!(missing, "Broker credentials incomplete; refreshes will fail until set");
    }

    let admin_token = std::env::var("SENTIMETER_ADMIN_TOKEN").ok();
    if admin_token.as_deref().map_or(true, |t| t.trim().is_empty()) {
        info!("SENTIMETER_ADMIN_TOKEN not set; diagnostic endpoints disabled");
    }

    // ── 2. Shared state ──────────────────────────────────────────────────
    let state = Arc::new(
        AppState::new(config.clone(), credentials, admin_token)
            .context("failed to initialise application state")?,
    );

    // ── 3. Optional auto-refresh ─────────────────────────────────────────
    if let Some(secs) = config.auto_refresh_secs.filter(|s| *s > 0) {
        let refresh_state = state.clone();
        tokio::spawn(async move {
            info!(period_secs = secs, "Auto-refresh loop starting");
            let mut interval = tokio::time::interval(Duration::from_secs(secs));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(e) = refresh_state.refresh().await {
                    error!(error = %e, "Scheduled refresh failed");
                }
            }
        });
    }

    // ── 4. HTTP server ───────────────────────────────────────────────────
    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            warn!("Shutdown signal received; stopping gracefully");
        })
        .await
        .context("API server failed")?;

    info!("Sentimeter shut down complete.");
    Ok(())
}
