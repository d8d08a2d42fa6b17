//! WebSocket transport driver.
//!
//! The only component that touches the network. Owns the socket and all
//! connection timers, and drives the pure link state machine from
//! `agentwatch-core`: every transition happens on the single driver
//! task, so there is exactly one close transition per connection and no
//! double-close races. User-facing control (`connect` / `disconnect` /
//! `reconnect`) arrives as messages on a channel and is serialized onto
//! the same task.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use agentwatch_core::decode::{Frame, PING_FRAME, PONG_FRAME, decode_frame};
use agentwatch_core::link::{
    CloseAction, HEARTBEAT_INTERVAL_MS, LinkStatus, MAX_RECONNECT_ATTEMPTS, RECONNECT_INTERVAL_MS,
};

use crate::scheduler::ClearScheduler;
use crate::state::{SharedState, StateNotification, ingest_envelope};

/// Default event stream endpoint.
pub const DEFAULT_STREAM_URL: &str = "ws://localhost:4001/stream";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ─── Config ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub url: String,
    /// Fixed delay between reconnect attempts.
    pub reconnect_interval: Duration,
    /// Interval between heartbeat pings while open.
    pub heartbeat_interval: Duration,
}

impl TransportConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_interval: Duration::from_millis(RECONNECT_INTERVAL_MS),
            heartbeat_interval: Duration::from_millis(HEARTBEAT_INTERVAL_MS),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STREAM_URL)
    }
}

// ─── Control surface ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlMsg {
    Connect,
    Disconnect,
    Reconnect,
}

/// Handle for issuing connection commands to the driver task.
#[derive(Clone)]
pub struct TransportHandle {
    control_tx: mpsc::Sender<ControlMsg>,
}

impl TransportHandle {
    /// Request a connection. Idempotent while already open or connecting.
    pub async fn connect(&self) {
        let _ = self.control_tx.send(ControlMsg::Connect).await;
    }

    /// Close the socket, cancel any pending reconnect, and stay idle.
    pub async fn disconnect(&self) {
        let _ = self.control_tx.send(ControlMsg::Disconnect).await;
    }

    /// Disconnect and dial again with a fresh reconnect budget,
    /// regardless of prior exhaustion.
    pub async fn reconnect(&self) {
        let _ = self.control_tx.send(ControlMsg::Reconnect).await;
    }
}

// ─── Driver ───────────────────────────────────────────────────────

pub struct Transport {
    cfg: TransportConfig,
    state: SharedState,
    scheduler: ClearScheduler,
    notify_tx: broadcast::Sender<StateNotification>,
    cancel: CancellationToken,
    control_rx: mpsc::Receiver<ControlMsg>,
}

impl Transport {
    pub fn new(
        cfg: TransportConfig,
        state: SharedState,
        scheduler: ClearScheduler,
        notify_tx: broadcast::Sender<StateNotification>,
        cancel: CancellationToken,
    ) -> (Self, TransportHandle) {
        let (control_tx, control_rx) = mpsc::channel(16);
        (
            Self {
                cfg,
                state,
                scheduler,
                notify_tx,
                cancel,
                control_rx,
            },
            TransportHandle { control_tx },
        )
    }

    /// Drive the link until cancelled. Dispatches on the state machine:
    /// `Connecting` dials, `Reconnecting` waits out the retry interval,
    /// everything else parks until a control command arrives.
    pub async fn run(mut self) {
        loop {
            let status = { self.state.read().await.link.status() };
            let keep_going = match status {
                LinkStatus::Connecting => self.dial_and_drive().await,
                LinkStatus::Reconnecting => self.wait_retry().await,
                LinkStatus::Idle | LinkStatus::Open | LinkStatus::Failed => {
                    self.wait_control().await
                }
            };
            if !keep_going {
                tracing::debug!("transport driver stopped");
                return;
            }
        }
    }

    fn notify_connection(&self) {
        let _ = self.notify_tx.send(StateNotification::Connection);
    }

    async fn apply_control(&mut self, msg: ControlMsg) {
        {
            let mut s = self.state.write().await;
            match msg {
                ControlMsg::Connect => {
                    s.link.connect();
                }
                ControlMsg::Disconnect => {
                    s.link.disconnect();
                    tracing::info!("transport disconnected");
                }
                ControlMsg::Reconnect => {
                    s.link.reconnect();
                    tracing::info!("manual reconnect, budget reset");
                }
            }
        }
        self.notify_connection();
    }

    /// Park until a control command or cancellation.
    async fn wait_control(&mut self) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            msg = self.control_rx.recv() => match msg {
                Some(msg) => {
                    self.apply_control(msg).await;
                    true
                }
                None => false,
            },
        }
    }

    /// Sit out the reconnect interval. A disconnect arriving here drops
    /// the pending retry on the floor, which is exactly the cancellation
    /// the state machine asked for.
    async fn wait_retry(&mut self) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => return false,
            msg = self.control_rx.recv() => {
                match msg {
                    Some(msg) => {
                        self.apply_control(msg).await;
                        return true;
                    }
                    None => return false,
                }
            }
            _ = tokio::time::sleep(self.cfg.reconnect_interval) => {}
        }
        {
            let mut s = self.state.write().await;
            s.link.connect();
        }
        self.notify_connection();
        true
    }

    /// One dial attempt; on success, drive the open connection.
    async fn dial_and_drive(&mut self) -> bool {
        let url = self.cfg.url.clone();
        tracing::debug!(url = %url, "dialing");
        let mut dial = std::pin::pin!(tokio_tungstenite::connect_async(url));
        let result = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return false,
                msg = self.control_rx.recv() => match msg {
                    None => return false,
                    // Already connecting; idempotent no-op.
                    Some(ControlMsg::Connect) => {}
                    Some(msg) => {
                        self.apply_control(msg).await;
                        return true;
                    }
                },
                result = &mut dial => break result,
            }
        };

        match result {
            Ok((stream, _response)) => {
                {
                    let mut s = self.state.write().await;
                    s.link.opened();
                }
                self.notify_connection();
                tracing::info!(url = %self.cfg.url, "transport connected");
                self.drive_connection(stream).await
            }
            Err(e) => {
                tracing::warn!(url = %self.cfg.url, error = %e, "dial failed");
                {
                    let mut s = self.state.write().await;
                    s.link.transport_error(e.to_string());
                }
                self.notify_connection();
                self.handle_close().await;
                true
            }
        }
    }

    /// Read frames, send heartbeats, and honor control commands until
    /// the connection ends one way or another.
    async fn drive_connection(&mut self, stream: WsStream) -> bool {
        let (mut ws_tx, mut ws_rx) = stream.split();
        let mut heartbeat = tokio::time::interval_at(
            tokio::time::Instant::now() + self.cfg.heartbeat_interval,
            self.cfg.heartbeat_interval,
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    return false;
                }

                msg = self.control_rx.recv() => {
                    let Some(msg) = msg else {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        return false;
                    };
                    match msg {
                        // Already open; idempotent no-op.
                        ControlMsg::Connect => {}
                        ControlMsg::Disconnect | ControlMsg::Reconnect => {
                            let _ = ws_tx.send(Message::Close(None)).await;
                            self.apply_control(msg).await;
                            return true;
                        }
                    }
                }

                // Half-open connections through intermediaries that drop
                // traffic silently are detected indirectly: a dead peer
                // eventually surfaces as a close, not as a pong timeout.
                _ = heartbeat.tick() => {
                    if let Err(e) = ws_tx.send(Message::Text(PING_FRAME.to_string())).await {
                        tracing::warn!(error = %e, "heartbeat send failed");
                        {
                            let mut s = self.state.write().await;
                            s.link.transport_error(e.to_string());
                        }
                        self.notify_connection();
                        self.handle_close().await;
                        return true;
                    }
                    tracing::trace!("heartbeat ping sent");
                }

                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => self.on_frame(&text).await,
                        Some(Ok(Message::Ping(payload))) => {
                            let _ = ws_tx.send(Message::Pong(payload)).await;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!("connection closed by peer");
                            self.handle_close().await;
                            return true;
                        }
                        Some(Ok(_)) => {} // binary / protocol pong frames
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "transport read error");
                            {
                                let mut s = self.state.write().await;
                                s.link.transport_error(e.to_string());
                            }
                            self.notify_connection();
                            self.handle_close().await;
                            return true;
                        }
                    }
                }
            }
        }
    }

    /// One inbound text frame. Decode failures are logged and dropped
    /// here, at the per-frame boundary; they never propagate to the
    /// connection.
    async fn on_frame(&self, text: &str) {
        if text == PONG_FRAME {
            tracing::trace!("heartbeat pong received");
            return;
        }
        match decode_frame(text) {
            Ok(Frame::Pong) => {}
            Ok(Frame::Envelope(envelope)) => {
                ingest_envelope(&self.state, &self.scheduler, &self.notify_tx, envelope).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable frame");
            }
        }
    }

    /// The single close transition for a connection that ended.
    async fn handle_close(&mut self) {
        let (action, attempts) = {
            let mut s = self.state.write().await;
            let action = s.link.closed();
            (action, s.link.attempts())
        };
        self.notify_connection();
        match action {
            CloseAction::Retry => {
                tracing::info!(
                    attempt = attempts,
                    max = MAX_RECONNECT_ATTEMPTS,
                    interval_ms = self.cfg.reconnect_interval.as_millis() as u64,
                    "scheduling reconnect"
                );
            }
            CloseAction::GiveUp => {
                tracing::warn!(attempts, "not reconnecting");
            }
        }
    }
}
