//! # Realtime Subscription Bridge
//!
//! Listens to a backend change feed and folds inserts into the reconciler.
//! Each listener is owned by a [`Subscription`]; dropping the handle stops it.

use std::sync::Arc;

use ik_core::{RealtimeSource, Table};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::reconciler::Reconciler;

/// Scoped handle over one realtime listener.
#[derive(Debug)]
pub struct Subscription {
    table: Table,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn table(&self) -> Table {
        self.table
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the listener and waits for it to exit.
    pub async fn close(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub struct RealtimeBridge {
    reconciler: Arc<Reconciler>,
    source: Arc<dyn RealtimeSource>,
}

impl RealtimeBridge {
    pub fn new(reconciler: Arc<Reconciler>, source: Arc<dyn RealtimeSource>) -> Self {
        Self { reconciler, source }
    }

    /// Opens a channel for `table`. Must be called inside a tokio runtime.
    pub fn subscribe(&self, table: Table) -> Subscription {
        let mut rx = self.source.subscribe(table);
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let reconciler = self.reconciler.clone();

        let handle = tokio::spawn(async move {
            info!(%table, "Realtime channel opened");
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(event) if event.table == table => {
                            let outcome = reconciler.apply_remote_insert(event);
                            debug!(%table, ?outcome, "Realtime insert applied");
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(%table, skipped, "Realtime channel lagged, notifications lost");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            info!(%table, "Realtime channel closed");
        });

        Subscription {
            table,
            token,
            handle: Some(handle),
        }
    }
}
