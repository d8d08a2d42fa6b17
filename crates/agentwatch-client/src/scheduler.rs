//! Time-based invalidation of terminal command states.
//!
//! A scheduled clear never captures the projection it saw at schedule
//! time: when the timer fires it re-evaluates its predicate against the
//! current live state and clears only if the predicate still holds.
//! Message arrivals and timer firings are not ordered relative to each
//! other, and the re-check is what keeps a stale timer from erasing a
//! command that started after the original one finished.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use agentwatch_core::projection::{ClearRequest, CurrentCommand};

use crate::state::{SharedState, StateNotification};

#[derive(Clone)]
pub struct ClearScheduler {
    state: SharedState,
    notify_tx: broadcast::Sender<StateNotification>,
    cancel: CancellationToken,
}

impl ClearScheduler {
    pub fn new(
        state: SharedState,
        notify_tx: broadcast::Sender<StateNotification>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            state,
            notify_tx,
            cancel,
        }
    }

    /// After `delay`, clear the current command iff `predicate` still
    /// holds against the live projection. The timer dies with the
    /// session's cancellation token.
    pub fn schedule_clear<P>(&self, predicate: P, delay: Duration)
    where
        P: Fn(&CurrentCommand) -> bool + Send + Sync + 'static,
    {
        let state = Arc::clone(&self.state);
        let notify_tx = self.notify_tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let cleared = {
                        let mut s = state.write().await;
                        let still_holds = s
                            .projections
                            .current_command
                            .as_ref()
                            .is_some_and(|command| predicate(command));
                        if still_holds {
                            s.projections.current_command = None;
                        }
                        still_holds
                    };
                    if cleared {
                        tracing::debug!("ephemeral command state cleared");
                        let _ = notify_tx.send(StateNotification::Projection);
                    }
                }
            }
        });
    }

    /// Install the clear for a terminal command transition. The request
    /// pins the command's status and start time, so the fire-time check
    /// only matches the exact command the timer was installed for.
    pub fn schedule(&self, request: ClearRequest) {
        let ClearRequest {
            status,
            started_at,
            delay_ms,
        } = request;
        self.schedule_clear(
            move |command| command.status == status && command.started_at == started_at,
            Duration::from_millis(delay_ms),
        );
    }
}

// ─── Tests ────────────────────────────────────────────────────────
