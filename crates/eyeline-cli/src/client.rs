//! D-Bus client for a running `eyelined`.

use anyhow::{bail, Context, Result};

#[zbus::proxy(
    interface = "org.freedesktop.Eyeline1",
    default_service = "org.freedesktop.Eyeline1",
    default_path = "/org/freedesktop/Eyeline1"
)]
trait Eyeline {
    fn latest(&self, session_id: &str) -> zbus::Result<String>;
    fn summary(&self, session_id: &str) -> zbus::Result<String>;
    fn status(&self) -> zbus::Result<String>;
}

async fn connect(session_bus: bool) -> Result<EyelineProxy<'static>> {
    let connection = if session_bus {
        zbus::Connection::session().await
    } else {
        zbus::Connection::system().await
    }
    .context("failed to connect to D-Bus")?;
    EyelineProxy::new(&connection)
        .await
        .context("failed to create eyelined proxy")
}

pub async fn status(session_bus: bool) -> Result<String> {
    let proxy = connect(session_bus).await?;
    let raw = proxy.status().await.context("is eyelined running?")?;
    pretty(&raw)
}

pub async fn latest(session_bus: bool, session_id: &str) -> Result<String> {
    let proxy = connect(session_bus).await?;
    let raw = proxy
        .latest(session_id)
        .await
        .with_context(|| format!("failed to query session {session_id}"))?;
    if raw.is_empty() {
        bail!("session {session_id} has not scored any frames yet");
    }
    pretty(&raw)
}

pub async fn summary(session_bus: bool, session_id: &str) -> Result<String> {
    let proxy = connect(session_bus).await?;
    let raw = proxy
        .summary(session_id)
        .await
        .with_context(|| format!("failed to query session {session_id}"))?;
    pretty(&raw)
}

fn pretty(raw: &str) -> Result<String> {
    let value: serde_json::Value =
        serde_json::from_str(raw).context("daemon returned malformed JSON")?;
    Ok(serde_json::to_string_pretty(&value)?)
}
