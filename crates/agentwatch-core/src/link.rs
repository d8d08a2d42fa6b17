//! Transport link state machine.
//!
//! Pure transitions, no sockets and no timers: each operation returns
//! the action the async driver must take (dial now, retry after the
//! fixed interval, give up). This keeps the whole reconnect policy unit
//! testable without a connection.

use serde::Serialize;
use std::fmt;

/// Reconnect budget. Exhausted after this many consecutive close events
/// with no intervening successful open.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;
/// Fixed delay between reconnect attempts.
pub const RECONNECT_INTERVAL_MS: u64 = 3_000;
/// Interval between heartbeat pings while the link is open.
pub const HEARTBEAT_INTERVAL_MS: u64 = 30_000;

/// Terminal error once the reconnect budget is exhausted.
pub const EXHAUSTED_ERROR: &str = "Connection lost. Max reconnect attempts reached.";

// ─── Status ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Idle,
    Connecting,
    Open,
    Reconnecting,
    Failed,
}

impl LinkStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Reconnecting => "reconnecting",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the driver must do after a close event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// Schedule a dial after [`RECONNECT_INTERVAL_MS`].
    Retry,
    /// Stop. Either the budget is exhausted or the close was solicited.
    GiveUp,
}

/// UI-facing view of the link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    pub connected: bool,
    pub connecting: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ─── State machine ────────────────────────────────────────────────

/// `Idle → Connecting → Open → (Reconnecting | Failed)`, with
/// `Open → Idle` on manual disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkState {
    status: LinkStatus,
    attempts: u32,
    error: Option<String>,
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkState {
    pub fn new() -> Self {
        Self {
            status: LinkStatus::Idle,
            attempts: 0,
            error: None,
        }
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Request a connection. Idempotent: returns whether the driver
    /// should dial now; a no-op while already `Open` or `Connecting`.
    /// Clears any prior error.
    pub fn connect(&mut self) -> bool {
        match self.status {
            LinkStatus::Open | LinkStatus::Connecting => false,
            LinkStatus::Idle | LinkStatus::Reconnecting | LinkStatus::Failed => {
                self.status = LinkStatus::Connecting;
                self.error = None;
                true
            }
        }
    }

    /// The underlying socket opened: fresh reconnect budget, no error.
    pub fn opened(&mut self) {
        self.status = LinkStatus::Open;
        self.attempts = 0;
        self.error = None;
    }

    /// Record a non-fatal transport error. Does not transition by
    /// itself; the close event drives the state machine.
    pub fn transport_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// An unsolicited close (or failed dial). Consumes one reconnect
    /// attempt; once the budget is spent the link fails terminally
    /// until an explicit [`reconnect`](Self::reconnect).
    pub fn closed(&mut self) -> CloseAction {
        if self.status == LinkStatus::Idle {
            // Solicited close after a manual disconnect.
            return CloseAction::GiveUp;
        }
        self.attempts += 1;
        if self.attempts >= MAX_RECONNECT_ATTEMPTS {
            self.status = LinkStatus::Failed;
            self.error = Some(EXHAUSTED_ERROR.to_owned());
            CloseAction::GiveUp
        } else {
            self.status = LinkStatus::Reconnecting;
            CloseAction::Retry
        }
    }

    /// Manual disconnect: suppress auto-reconnect by spending the whole
    /// budget, and settle in `Idle`.
    pub fn disconnect(&mut self) {
        self.attempts = MAX_RECONNECT_ATTEMPTS;
        self.status = LinkStatus::Idle;
    }

    /// Manual reconnect: disconnect, then connect with a fresh budget,
    /// regardless of prior exhaustion. Always dials.
    pub fn reconnect(&mut self) -> bool {
        self.disconnect();
        self.attempts = 0;
        self.connect()
    }

    pub fn connection_state(&self) -> ConnectionState {
        ConnectionState {
            connected: self.status == LinkStatus::Open,
            connecting: matches!(self.status, LinkStatus::Connecting | LinkStatus::Reconnecting),
            error: self.error.clone(),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────
