//! `agentwatch watch` — live-refresh view of the current monitor state.

use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::broadcast;

use crate::session::Session;
use crate::state::MonitorState;
use crate::transport::TransportConfig;

/// Entry point for `agentwatch watch`.
pub async fn cmd_watch(url: &str, interval: u64) -> anyhow::Result<()> {
    let session = Session::start(TransportConfig::new(url));
    session.connect().await;
    let mut notifications = session.subscribe();

    loop {
        {
            let state = session.state().read().await;
            // Clear screen + cursor home
            print!("\x1b[2J\x1b[H");
            print!("{}", render_state(&state));
            println!("\nagentwatch \u{2014} Ctrl-C to quit");
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_secs(interval.max(1))) => {}
            changed = notifications.recv() => {
                // Lagged just means we redraw from current state anyway.
                if matches!(changed, Err(broadcast::error::RecvError::Closed)) {
                    break;
                }
            }
        }
    }

    session.shutdown().await;
    Ok(())
}

/// Format the state for the terminal.
///
/// Extracted from the redraw loop so it can be unit-tested.
pub fn render_state(state: &MonitorState) -> String {
    let mut out = String::new();
    let conn = state.connection();

    let status = if conn.connected {
        "connected"
    } else if conn.connecting {
        "connecting..."
    } else {
        "disconnected"
    };
    out.push_str(&format!("stream: {status}\n"));
    if let Some(error) = &conn.error {
        out.push_str(&format!("  error: {error}\n"));
    }

    match &state.projections.active_agent {
        Some(agent) => {
            out.push_str(&format!("agent: {} ({})", agent.name, agent.id));
            if let Some(persona) = &agent.persona {
                out.push_str(&format!(" \u{2014} {persona}"));
            }
            out.push_str(&format!("  since {}\n", fmt_ts(agent.activated_at)));
        }
        None => out.push_str("agent: (none active)\n"),
    }

    match &state.projections.current_command {
        Some(command) => {
            out.push_str(&format!(
                "command: {} [{}]  started {}\n",
                command.name,
                command.status,
                fmt_ts(command.started_at),
            ));
        }
        None => out.push_str("command: (none)\n"),
    }

    out.push_str(&format!("events: {}\n", state.store.len()));
    out
}

fn fmt_ts(timestamp_ms: i64) -> String {
    match DateTime::from_timestamp_millis(timestamp_ms) {
        Some(at) => at.with_timezone(&Local).format("%H:%M:%S").to_string(),
        None => format!("@{timestamp_ms}"),
    }
}
