//! `agentwatch tail` — accepted live events as JSON lines.

use tokio::sync::broadcast;

use crate::session::Session;
use crate::state::StateNotification;
use crate::transport::TransportConfig;

/// Entry point for `agentwatch tail`.
pub async fn cmd_tail(url: &str) -> anyhow::Result<()> {
    let session = Session::start(TransportConfig::new(url));
    session.connect().await;
    let mut notifications = session.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            notification = notifications.recv() => match notification {
                Ok(StateNotification::Event(event)) => {
                    println!("{}", serde_json::to_string(&event)?);
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "tail lagged, dropped events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    session.shutdown().await;
    Ok(())
}
