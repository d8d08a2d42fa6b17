//! Shared state container and envelope ingestion.
//!
//! One explicitly owned `MonitorState` behind `Arc<RwLock>` is injected
//! into the transport driver, the scheduler, and the viewer commands;
//! there is no ambient global store. Projections are only ever mutated
//! here (on accepted events) and by the scheduler (on TTL expiry); the
//! transport layer never touches them directly.

use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};

use agentwatch_core::decode::Envelope;
use agentwatch_core::event::MonitorEvent;
use agentwatch_core::link::{ConnectionState, LinkState};
use agentwatch_core::projection::Projections;
use agentwatch_core::store::EventStore;

use crate::scheduler::ClearScheduler;

/// Push notification for viewers.
#[derive(Debug, Clone)]
pub enum StateNotification {
    /// Link status or connection error changed.
    Connection,
    /// Projections changed (snapshot replay or TTL clear).
    Projection,
    /// A live event was accepted into the log.
    Event(MonitorEvent),
}

#[derive(Debug, Default)]
pub struct MonitorState {
    pub link: LinkState,
    pub store: EventStore,
    pub projections: Projections,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// UI-facing connection view.
    pub fn connection(&self) -> ConnectionState {
        self.link.connection_state()
    }
}

pub type SharedState = Arc<RwLock<MonitorState>>;

pub fn new_shared() -> SharedState {
    Arc::new(RwLock::new(MonitorState::new()))
}

/// Apply one decoded envelope to the shared state.
///
/// `init` is authoritative: the log is replaced wholesale and the
/// projections are re-derived from the timestamp-ordered view, with at
/// most the trailing terminal command becoming eligible for a TTL clear.
///
/// A live `event` is appended and applied incrementally; an arrival
/// older than the newest stored timestamp instead re-derives from the
/// ordered view, with replay scheduling semantics.
pub async fn ingest_envelope(
    state: &SharedState,
    scheduler: &ClearScheduler,
    notify_tx: &broadcast::Sender<StateNotification>,
    envelope: Envelope,
) {
    match envelope {
        Envelope::Init { events } => {
            let pending = {
                let mut s = state.write().await;
                s.store.replace_snapshot(events);
                let (projections, pending) = Projections::replay(s.store.by_timestamp());
                s.projections = projections;
                tracing::debug!(events = s.store.len(), "snapshot ingested");
                pending
            };
            if let Some(request) = pending {
                scheduler.schedule(request);
            }
            let _ = notify_tx.send(StateNotification::Projection);
        }
        Envelope::Event { event } => {
            let pending = {
                let mut s = state.write().await;
                let out_of_order = s
                    .store
                    .newest_timestamp()
                    .is_some_and(|newest| event.timestamp < newest);
                s.store.append(event.clone());
                if out_of_order {
                    tracing::debug!(
                        kind = %event.kind,
                        timestamp = event.timestamp,
                        "stale-timestamped event, re-deriving projections"
                    );
                    let (projections, pending) = Projections::replay(s.store.by_timestamp());
                    s.projections = projections;
                    pending
                } else {
                    s.projections.apply(&event)
                }
            };
            if let Some(request) = pending {
                scheduler.schedule(request);
            }
            let _ = notify_tx.send(StateNotification::Event(event));
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────
