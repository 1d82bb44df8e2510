//! Per-tab page observer actor.
//!
//! Each loaded page gets its own task owning the page snapshot. Callers talk
//! to it through an [`ObserverHandle`]: one request, one reply. The actor also
//! turns a page-hidden signal into a `PageHidden` event for the coordinator.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use readwatch_observer::{ObserverRequest, ObserverResponse, PageSnapshot};
use readwatch_shared::{LocalStore, Result};

use crate::browser::unavailable;
use crate::coordinator::CoordinatorHandle;

/// Commands queued per observer. Small: a page only ever has a couple in flight.
const OBSERVER_CHANNEL_CAPACITY: usize = 8;

enum ObserverCommand {
    Request {
        request: ObserverRequest,
        reply: oneshot::Sender<ObserverResponse>,
    },
    Hidden,
}

/// Sending half of a page observer. Dropping every handle stops the actor.
#[derive(Debug, Clone)]
pub struct ObserverHandle {
    tx: mpsc::Sender<ObserverCommand>,
}

impl ObserverHandle {
    /// Spawn the observer task for `snapshot`.
    pub fn spawn(
        snapshot: PageSnapshot,
        store: Arc<LocalStore>,
        coordinator: Option<CoordinatorHandle>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(OBSERVER_CHANNEL_CAPACITY);
        tokio::spawn(run(snapshot, rx, store, coordinator));
        Self { tx }
    }

    /// Send `request` and wait at most `timeout` for the reply.
    pub async fn request(
        &self,
        request: ObserverRequest,
        timeout: Duration,
    ) -> Result<ObserverResponse> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(ObserverCommand::Request { request, reply })
            .await
            .map_err(|_| unavailable(&request, "page observer is gone"))?;

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(unavailable(&request, "page observer dropped the request")),
            Err(_) => Err(unavailable(
                &request,
                format!("no reply within {}ms", timeout.as_millis()),
            )),
        }
    }

    /// Tell the observer its page was hidden or left.
    pub async fn page_hidden(&self) {
        if self.tx.send(ObserverCommand::Hidden).await.is_err() {
            debug!("page observer already stopped");
        }
    }
}

async fn run(
    snapshot: PageSnapshot,
    mut rx: mpsc::Receiver<ObserverCommand>,
    store: Arc<LocalStore>,
    coordinator: Option<CoordinatorHandle>,
) {
    let url = snapshot.url().to_string();
    trace!(%url, "page observer started");

    while let Some(command) = rx.recv().await {
        match command {
            ObserverCommand::Request { request, reply } => {
                let response = snapshot.handle(&request);
                // The caller may have given up (timeout, navigation); nothing to do then.
                let _ = reply.send(response);
            }
            ObserverCommand::Hidden => {
                let signal = store.user().is_some()
                    && store.is_authenticated()
                    && store.settings().auto_analyze;
                match (&coordinator, signal) {
                    (Some(coordinator), true) => coordinator.page_hidden(url.clone()),
                    _ => debug!(%url, "page hidden, not signalling"),
                }
            }
        }
    }

    trace!(%url, "page observer stopped");
}
