//! Wire-level event type shared by the store, projector, and decoder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Recognized event kinds ───────────────────────────────────────

/// Event kinds the projector reacts to. Anything else is retained in
/// the log for display/audit but never touches the projections.
pub mod kind {
    pub const AGENT_ACTIVATED: &str = "AgentActivated";
    pub const AGENT_DEACTIVATED: &str = "AgentDeactivated";
    pub const COMMAND_START: &str = "CommandStart";
    pub const COMMAND_COMPLETE: &str = "CommandComplete";
    pub const COMMAND_ERROR: &str = "CommandError";
}

// ─── MonitorEvent ─────────────────────────────────────────────────

/// One event as produced by the remote stream. Immutable once created.
///
/// Ordering key is `timestamp` (producer-clock epoch milliseconds);
/// ties are broken by arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: i64,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl MonitorEvent {
    /// Fetch a string field from the payload, if present and a string.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// Producer timestamp as a `DateTime<Utc>`, if it is a representable
    /// instant. Display-only; ordering always uses the raw milliseconds.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

// ─── Tests ────────────────────────────────────────────────────────
