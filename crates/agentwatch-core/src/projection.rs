//! Projection of the event log into UI-facing state.
//!
//! A deterministic reducer `(projections, event) -> projections`, applied
//! in timestamp order. ActiveAgent and CurrentCommand are singleton
//! projections: a new authoritative event of the same category fully
//! replaces the prior value, never merges with it.
//!
//! Terminal command transitions return a [`ClearRequest`] so the caller
//! can install a TTL timer; the reducer itself has no notion of time
//! beyond event timestamps.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::event::{MonitorEvent, kind};

/// How long a completed command stays visible before auto-clear.
pub const TTL_COMPLETE_MS: u64 = 3_000;
/// How long a failed command stays visible before auto-clear.
pub const TTL_ERROR_MS: u64 = 5_000;

// ─── Projected types ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Running,
    Complete,
    Error,
}

impl CommandStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// TTL after which a terminal status is eligible for auto-clear.
    /// `None` for non-terminal statuses.
    pub fn clear_ttl_ms(self) -> Option<u64> {
        match self {
            Self::Running => None,
            Self::Complete => Some(TTL_COMPLETE_MS),
            Self::Error => Some(TTL_ERROR_MS),
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The agent currently active. At most one at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveAgent {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    pub activated_at: i64,
}

/// The command currently tracked. At most one at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentCommand {
    pub name: String,
    pub started_at: i64,
    pub status: CommandStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

/// A TTL clear to install for a terminal command transition.
///
/// `status` and `started_at` identify the command the timer belongs to;
/// the scheduler re-checks both against the live projection at fire time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearRequest {
    pub status: CommandStatus,
    pub started_at: i64,
    pub delay_ms: u64,
}

impl ClearRequest {
    /// Build the clear for a command in a terminal status, with a fresh
    /// full TTL. `None` while the command is still running.
    pub fn for_terminal(command: &CurrentCommand) -> Option<Self> {
        command.status.clear_ttl_ms().map(|delay_ms| Self {
            status: command.status,
            started_at: command.started_at,
            delay_ms,
        })
    }
}

// ─── Reducer ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Projections {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_agent: Option<ActiveAgent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_command: Option<CurrentCommand>,
}

impl Projections {
    /// Apply one event. Events with unrecognized kinds are ignored here
    /// (they stay in the log for display only).
    ///
    /// Returns the TTL clear to install when the event moved the current
    /// command into a terminal status.
    pub fn apply(&mut self, event: &MonitorEvent) -> Option<ClearRequest> {
        match event.kind.as_str() {
            kind::AGENT_ACTIVATED => {
                self.active_agent = Some(ActiveAgent {
                    id: event.data_str("agentId").unwrap_or("unknown").to_owned(),
                    name: event
                        .data_str("agentName")
                        .unwrap_or("Unknown Agent")
                        .to_owned(),
                    persona: event.data_str("persona").map(str::to_owned),
                    activated_at: event.timestamp,
                });
                None
            }
            kind::AGENT_DEACTIVATED => {
                self.active_agent = None;
                None
            }
            kind::COMMAND_START => {
                self.current_command = Some(CurrentCommand {
                    name: event.data_str("command").unwrap_or("unknown").to_owned(),
                    started_at: event.timestamp,
                    status: CommandStatus::Running,
                    agent_id: event.data_str("agentId").map(str::to_owned),
                });
                None
            }
            kind::COMMAND_COMPLETE => self.finish_command(CommandStatus::Complete),
            kind::COMMAND_ERROR => self.finish_command(CommandStatus::Error),
            _ => None,
        }
    }

    /// Move the current command (if any) into a terminal status,
    /// preserving its other fields.
    fn finish_command(&mut self, status: CommandStatus) -> Option<ClearRequest> {
        let command = self.current_command.as_mut()?;
        command.status = status;
        ClearRequest::for_terminal(command)
    }

    /// Project an ordered batch from scratch.
    ///
    /// Yields the same projections as sequential live application, but
    /// intermediate terminal transitions install no timers: only the
    /// batch's final command state, if terminal, is eligible, and it gets
    /// a fresh full TTL, never one measured against its original timestamp.
    pub fn replay<'a, I>(events: I) -> (Self, Option<ClearRequest>)
    where
        I: IntoIterator<Item = &'a MonitorEvent>,
    {
        let mut projections = Self::default();
        for event in events {
            let _ = projections.apply(event);
        }
        let pending = projections
            .current_command
            .as_ref()
            .and_then(ClearRequest::for_terminal);
        (projections, pending)
    }

    /// Clear the current command iff it is still the one a TTL timer was
    /// installed for. Returns whether anything was cleared.
    pub fn clear_command_if_still(&mut self, status: CommandStatus, started_at: i64) -> bool {
        let still_current = self
            .current_command
            .as_ref()
            .is_some_and(|c| c.status == status && c.started_at == started_at);
        if still_current {
            self.current_command = None;
        }
        still_current
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: &str, timestamp: i64, data: serde_json::Value) -> MonitorEvent {
        let serde_json::Value::Object(data) = data else {
            panic!("test data must be an object");
        };
        MonitorEvent {
            kind: kind.into(),
            timestamp,
            data,
        }
    }

    #[test]
    fn agent_activated_sets_singleton() {
        let mut p = Projections::default();
        p.apply(&event(
            "AgentActivated",
            100,
            serde_json::json!({"agentId": "a-1", "agentName": "Analyst", "persona": "dry"}),
        ));
        let agent = p.active_agent.as_ref().unwrap();
        assert_eq!(agent.id, "a-1");
        assert_eq!(agent.name, "Analyst");
        assert_eq!(agent.persona.as_deref(), Some("dry"));
        assert_eq!(agent.activated_at, 100);
    }

    #[test]
    fn agent_activated_defaults_when_fields_missing() {
        let mut p = Projections::default();
        p.apply(&event("AgentActivated", 100, serde_json::json!({})));
        let agent = p.active_agent.as_ref().unwrap();
        assert_eq!(agent.id, "unknown");
        assert_eq!(agent.name, "Unknown Agent");
        assert_eq!(agent.persona, None);
    }

    #[test]
    fn new_activation_replaces_never_merges() {
        let mut p = Projections::default();
        p.apply(&event(
            "AgentActivated",
            100,
            serde_json::json!({"agentId": "a-1", "agentName": "First", "persona": "x"}),
        ));
        p.apply(&event(
            "AgentActivated",
            200,
            serde_json::json!({"agentId": "a-2", "agentName": "Second"}),
        ));
        let agent = p.active_agent.as_ref().unwrap();
        assert_eq!(agent.id, "a-2");
        assert_eq!(agent.persona, None, "persona must not leak from the prior agent");
        assert_eq!(agent.activated_at, 200);
    }

    #[test]
    fn agent_deactivated_clears() {
        let mut p = Projections::default();
        p.apply(&event("AgentActivated", 100, serde_json::json!({"agentId": "a-1"})));
        p.apply(&event("AgentDeactivated", 200, serde_json::json!({})));
        assert_eq!(p.active_agent, None);
    }

    #[test]
    fn command_start_sets_running() {
        let mut p = Projections::default();
        let pending = p.apply(&event(
            "CommandStart",
            1000,
            serde_json::json!({"command": "build", "agentId": "a-1"}),
        ));
        assert_eq!(pending, None);
        let cmd = p.current_command.as_ref().unwrap();
        assert_eq!(cmd.name, "build");
        assert_eq!(cmd.started_at, 1000);
        assert_eq!(cmd.status, CommandStatus::Running);
        assert_eq!(cmd.agent_id.as_deref(), Some("a-1"));
    }

    #[test]
    fn command_complete_preserves_fields_and_requests_clear() {
        let mut p = Projections::default();
        p.apply(&event("CommandStart", 1000, serde_json::json!({"command": "build"})));
        let pending = p.apply(&event("CommandComplete", 1500, serde_json::json!({})));
        let cmd = p.current_command.as_ref().unwrap();
        assert_eq!(cmd.name, "build");
        assert_eq!(cmd.started_at, 1000);
        assert_eq!(cmd.status, CommandStatus::Complete);
        assert_eq!(
            pending,
            Some(ClearRequest {
                status: CommandStatus::Complete,
                started_at: 1000,
                delay_ms: TTL_COMPLETE_MS,
            })
        );
    }

    #[test]
    fn command_error_uses_error_ttl() {
        let mut p = Projections::default();
        p.apply(&event("CommandStart", 1000, serde_json::json!({"command": "deploy"})));
        let pending = p.apply(&event("CommandError", 1200, serde_json::json!({})));
        assert_eq!(p.current_command.as_ref().unwrap().status, CommandStatus::Error);
        assert_eq!(pending.unwrap().delay_ms, TTL_ERROR_MS);
    }

    #[test]
    fn terminal_event_without_current_command_is_a_noop() {
        let mut p = Projections::default();
        let pending = p.apply(&event("CommandComplete", 1500, serde_json::json!({})));
        assert_eq!(pending, None);
        assert_eq!(p.current_command, None);
    }

    #[test]
    fn unrecognized_kinds_do_not_touch_projections() {
        let mut p = Projections::default();
        p.apply(&event("AgentActivated", 100, serde_json::json!({"agentId": "a-1"})));
        p.apply(&event("CommandStart", 200, serde_json::json!({"command": "lint"})));
        let before = p.clone();
        let pending = p.apply(&event("TokenUsage", 300, serde_json::json!({"tokens": 9000})));
        assert_eq!(pending, None);
        assert_eq!(p, before);
    }

    #[test]
    fn command_start_defaults_name_to_unknown() {
        let mut p = Projections::default();
        p.apply(&event("CommandStart", 1000, serde_json::json!({})));
        assert_eq!(p.current_command.as_ref().unwrap().name, "unknown");
    }

    #[test]
    fn replay_yields_only_trailing_terminal_ttl() {
        let events = vec![
            event("CommandStart", 1000, serde_json::json!({"command": "build"})),
            event("CommandComplete", 1500, serde_json::json!({})),
            event("CommandStart", 1600, serde_json::json!({"command": "test"})),
        ];
        let (p, pending) = Projections::replay(&events);
        assert_eq!(p.current_command.as_ref().unwrap().name, "test");
        assert_eq!(p.current_command.as_ref().unwrap().status, CommandStatus::Running);
        assert_eq!(pending, None, "a running trailing command installs no timer");
    }

    #[test]
    fn replay_terminal_command_gets_fresh_ttl() {
        // The complete event is ancient relative to any wall clock; replay
        // still presents it and asks for a full TTL from replay time.
        let events = vec![
            event("CommandStart", 1000, serde_json::json!({"command": "build"})),
            event("CommandComplete", 1500, serde_json::json!({})),
        ];
        let (p, pending) = Projections::replay(&events);
        assert_eq!(p.current_command.as_ref().unwrap().status, CommandStatus::Complete);
        assert_eq!(
            pending,
            Some(ClearRequest {
                status: CommandStatus::Complete,
                started_at: 1000,
                delay_ms: TTL_COMPLETE_MS,
            })
        );
    }

    #[test]
    fn clear_command_if_still_respects_identity() {
        let mut p = Projections::default();
        p.apply(&event("CommandStart", 1000, serde_json::json!({"command": "build"})));
        p.apply(&event("CommandComplete", 1500, serde_json::json!({})));

        // A different command took over; the stale timer must not fire.
        p.apply(&event("CommandStart", 1600, serde_json::json!({"command": "test"})));
        assert!(!p.clear_command_if_still(CommandStatus::Complete, 1000));
        assert_eq!(p.current_command.as_ref().unwrap().name, "test");

        // The matching timer does clear.
        p.apply(&event("CommandComplete", 1700, serde_json::json!({})));
        assert!(p.clear_command_if_still(CommandStatus::Complete, 1600));
        assert_eq!(p.current_command, None);
    }

    #[test]
    fn clear_command_if_still_rejects_same_status_newer_command() {
        let mut p = Projections::default();
        p.apply(&event("CommandStart", 1000, serde_json::json!({"command": "build"})));
        p.apply(&event("CommandComplete", 1500, serde_json::json!({})));
        p.apply(&event("CommandStart", 2000, serde_json::json!({"command": "test"})));
        p.apply(&event("CommandComplete", 2100, serde_json::json!({})));
        // Timer installed for the first completion; the second command is
        // also complete, but it is not the timer's command.
        assert!(!p.clear_command_if_still(CommandStatus::Complete, 1000));
        assert_eq!(p.current_command.as_ref().unwrap().name, "test");
    }
}
