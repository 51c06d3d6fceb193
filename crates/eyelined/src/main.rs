use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod registry;
mod session;

use config::Config;
use dbus_interface::EyelineService;

const BUS_NAME: &str = "org.freedesktop.Eyeline1";
const OBJECT_PATH: &str = "/org/freedesktop/Eyeline1";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("eyelined starting");

    let config = Config::from_env().context("failed to load configuration")?;
    tracing::info!(
        config_path = ?config.config_path,
        contact_policy = ?config.engine.contact_policy,
        confidence_policy = ?config.engine.confidence_policy,
        history_len = config.engine.history_len,
        max_sessions = config.max_sessions,
        "configuration loaded"
    );

    let session_bus = config.session_bus;
    let builder = if session_bus {
        zbus::connection::Builder::session()?
    } else {
        zbus::connection::Builder::system()?
    };
    let _connection = builder
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, EyelineService::new(config))?
        .build()
        .await
        .with_context(|| format!("failed to acquire {BUS_NAME}"))?;

    tracing::info!(
        bus = if session_bus { "session" } else { "system" },
        "eyelined ready"
    );

    // Keep running until signaled
    tokio::signal::ctrl_c().await?;
    tracing::info!("eyelined shutting down");

    Ok(())
}
