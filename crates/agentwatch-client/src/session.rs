//! Session wiring: state container + scheduler + transport driver.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::scheduler::ClearScheduler;
use crate::state::{SharedState, StateNotification, new_shared};
use crate::transport::{Transport, TransportConfig, TransportHandle};

/// One monitoring session against one stream endpoint.
///
/// Owns the cancellation token that scopes the socket and every timer:
/// shutdown tears all of them down as one unit.
pub struct Session {
    state: SharedState,
    notify_tx: broadcast::Sender<StateNotification>,
    transport: TransportHandle,
    cancel: CancellationToken,
    driver: tokio::task::JoinHandle<()>,
}

impl Session {
    /// Wire everything up and spawn the transport driver. Does not dial;
    /// call [`connect`](Self::connect).
    pub fn start(cfg: TransportConfig) -> Self {
        let cancel = CancellationToken::new();
        let state = new_shared();
        let (notify_tx, _) = broadcast::channel(256);
        let scheduler = ClearScheduler::new(
            Arc::clone(&state),
            notify_tx.clone(),
            cancel.clone(),
        );
        let (transport, handle) = Transport::new(
            cfg,
            Arc::clone(&state),
            scheduler,
            notify_tx.clone(),
            cancel.clone(),
        );
        let driver = tokio::spawn(transport.run());
        Self {
            state,
            notify_tx,
            transport: handle,
            cancel,
            driver,
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateNotification> {
        self.notify_tx.subscribe()
    }

    pub async fn connect(&self) {
        self.transport.connect().await;
    }

    pub async fn disconnect(&self) {
        self.transport.disconnect().await;
    }

    pub async fn reconnect(&self) {
        self.transport.reconnect().await;
    }

    /// Cancel every outstanding timer, close the socket, and wait for
    /// the driver to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.driver.await;
    }
}
