//! `observing-server`: the REST API as a standalone process.
//!
//! Loads `observing.toml`, builds the name resolver and site registry, and
//! serves the REST API.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin observing-server
//!
//! # Offline, with only the local name table
//! OBSERVING_CONFIG=./observing.toml cargo run --bin observing-server --no-default-features --features http-server
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8080)
//! - `OBSERVING_CONFIG`: Path to the configuration file (default: search
//!   `observing.toml`, `backend/observing.toml`, `../observing.toml`)
//! - `RUST_LOG`: Log filter directives (default: info)

use std::env;
use std::net::SocketAddr;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use observing_suite::http::{create_router, AppState};
use observing_suite::PlannerConfig;

fn load_config() -> anyhow::Result<PlannerConfig> {
    if let Ok(path) = env::var("OBSERVING_CONFIG") {
        return Ok(PlannerConfig::from_file(&path)?);
    }
    match PlannerConfig::from_default_location() {
        Ok(config) => Ok(config),
        Err(e) => {
            warn!("{}; using built-in defaults", e);
            Ok(PlannerConfig::default())
        }
    }
}

fn bind_address() -> anyhow::Result<SocketAddr> {
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = match env::var("PORT") {
        Ok(port) => port.parse::<u16>()?,
        Err(_) => 8080,
    };
    Ok(format!("{}:{}", host, port).parse()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `log` records from the library are bridged into the subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = load_config()?;
    let state = AppState::new(&config)?;
    info!(
        "Observing Suite: {} resolver, {} known sites",
        state.resolver.service_name(),
        state.sites.len()
    );

    let addr = bind_address()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{} (health check at /health)", addr);

    axum::serve(listener, create_router(state)).await?;
    Ok(())
}
