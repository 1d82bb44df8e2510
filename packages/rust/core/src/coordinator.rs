//! The background coordinator actor.
//!
//! Owns the readiness flag, the pending-analysis queue and the per-tab
//! classification results. Every mutation happens inside [`Coordinator::run`],
//! one event at a time, so a drain always completes before the next trigger
//! is looked at.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use readwatch_observer::{ObserverRequest, ObserverResponse};
use readwatch_shared::{
    Classification, ContentType, CoordinatorConfig, LocalStore, Notification, TabId, TabMarker,
    is_web_url,
};

use crate::browser::Browser;
use crate::queue::PendingQueue;

/// Events accepted by the coordinator.
#[derive(Debug)]
pub enum CoordinatorEvent {
    NavigationComplete { tab_id: TabId, url: String },
    PageHidden { url: String },
    TabClosed(TabId),
    ModelReady(bool),
    DrainTick,
    QueryReadiness(oneshot::Sender<bool>),
    Snapshot(oneshot::Sender<CoordinatorSnapshot>),
    Shutdown,
}

/// Point-in-time view of the coordinator's state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinatorSnapshot {
    pub model_ready: bool,
    /// Queued URLs in drain order.
    pub pending: Vec<String>,
    /// Tabs whose last classification was interesting, sorted.
    pub marked_tabs: Vec<TabId>,
}

/// What a single drain attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Nothing was dequeued: empty queue, model not ready or signed out.
    Skipped,
    /// One item was dequeued and discarded.
    Dropped { url: String },
    /// One item was dequeued and the user was notified.
    Notified { url: String, title: String },
}

/// Cloneable sending side of the coordinator.
///
/// Sends never block. Once the coordinator has stopped they are dropped and
/// queries answer with defaults.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<CoordinatorEvent>,
}

impl CoordinatorHandle {
    pub fn navigation_complete(&self, tab_id: TabId, url: impl Into<String>) {
        self.send(CoordinatorEvent::NavigationComplete {
            tab_id,
            url: url.into(),
        });
    }

    pub fn page_hidden(&self, url: impl Into<String>) {
        self.send(CoordinatorEvent::PageHidden { url: url.into() });
    }

    pub fn tab_closed(&self, tab_id: TabId) {
        self.send(CoordinatorEvent::TabClosed(tab_id));
    }

    pub fn model_ready(&self, ready: bool) {
        self.send(CoordinatorEvent::ModelReady(ready));
    }

    /// Ask for one drain attempt outside the timer.
    pub fn drain(&self) {
        self.send(CoordinatorEvent::DrainTick);
    }

    pub fn shutdown(&self) {
        self.send(CoordinatorEvent::Shutdown);
    }

    /// Current readiness; `false` when the coordinator is gone.
    pub async fn is_model_ready(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        self.send(CoordinatorEvent::QueryReadiness(reply));
        rx.await.unwrap_or(false)
    }

    /// Current state, processed after every event sent before it.
    pub async fn snapshot(&self) -> Option<CoordinatorSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(CoordinatorEvent::Snapshot(reply));
        rx.await.ok()
    }

    fn send(&self, event: CoordinatorEvent) {
        if self.tx.send(event).is_err() {
            debug!("coordinator stopped, event dropped");
        }
    }
}

pub struct Coordinator {
    browser: Arc<dyn Browser>,
    store: Arc<LocalStore>,
    is_model_ready: bool,
    pending: PendingQueue,
    tab_markers: HashMap<TabId, Classification>,
}

impl Coordinator {
    pub fn new(browser: Arc<dyn Browser>, store: Arc<LocalStore>) -> Self {
        Self {
            browser,
            store,
            is_model_ready: false,
            pending: PendingQueue::new(),
            tab_markers: HashMap::new(),
        }
    }

    /// Start the event loop with a drain timer of `config.drain_interval()`.
    pub fn spawn(
        browser: Arc<dyn Browser>,
        store: Arc<LocalStore>,
        config: &CoordinatorConfig,
    ) -> (CoordinatorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let coordinator = Self::new(browser, store);
        let task = tokio::spawn(coordinator.run(rx, config.drain_interval()));
        (CoordinatorHandle { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<CoordinatorEvent>, period: Duration) {
        let mut timer = tokio::time::interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        timer.tick().await;

        info!(interval_secs = period.as_secs(), "coordinator started");
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(CoordinatorEvent::Shutdown) | None => break,
                    Some(event) => self.handle(event).await,
                },
                _ = timer.tick() => {
                    self.drain_queue().await;
                }
            }
        }
        info!(pending = self.pending.len(), "coordinator stopped");
    }

    async fn handle(&mut self, event: CoordinatorEvent) {
        match event {
            CoordinatorEvent::NavigationComplete { tab_id, url } => {
                self.on_navigation_complete(tab_id, &url).await;
            }
            CoordinatorEvent::PageHidden { url } => self.on_page_hidden(&url),
            CoordinatorEvent::TabClosed(tab_id) => self.on_tab_closed(tab_id),
            CoordinatorEvent::ModelReady(ready) => self.on_model_ready(ready).await,
            CoordinatorEvent::DrainTick => {
                self.drain_queue().await;
            }
            CoordinatorEvent::QueryReadiness(reply) => {
                let _ = reply.send(self.is_model_ready);
            }
            CoordinatorEvent::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            // `run` intercepts shutdown.
            CoordinatorEvent::Shutdown => {}
        }
    }

    fn analysis_enabled(&self) -> bool {
        self.store.is_authenticated() && self.store.settings().auto_analyze
    }

    /// Classify a freshly loaded tab and mark it when it looks interesting.
    ///
    /// The previous page's verdict is cleared first, so a page that cannot
    /// be classified counts as not interesting.
    #[instrument(skip(self))]
    pub async fn on_navigation_complete(&mut self, tab_id: TabId, url: &str) {
        self.tab_markers.insert(tab_id, Classification::default());
        if !is_web_url(url) || !self.analysis_enabled() {
            return;
        }

        let Some(identity) = self.browser.page_identity(tab_id).await else {
            debug!("tab closed before classification");
            self.tab_markers.remove(&tab_id);
            return;
        };
        if identity.url != url {
            debug!(current = %identity.url, "tab already moved on");
            return;
        }

        let classification = match self
            .browser
            .send_to_observer(tab_id, ObserverRequest::Classify)
            .await
        {
            Ok(ObserverResponse::Classified(c)) => c,
            Ok(other) => {
                warn!(?other, "unexpected observer reply to classify");
                return;
            }
            Err(e) => {
                debug!(error = %e, "classification unavailable");
                return;
            }
        };

        if self.browser.page_identity(tab_id).await.as_ref() != Some(&identity) {
            debug!("classification result is stale, dropped");
            return;
        }

        self.tab_markers.insert(tab_id, classification);
        if classification.is_interesting() {
            debug!(?classification, "marking tab");
            self.browser.set_marker(&identity, TabMarker::interesting()).await;
        }
    }

    /// Forget everything known about a closed tab.
    pub fn on_tab_closed(&mut self, tab_id: TabId) {
        if self.tab_markers.remove(&tab_id).is_some() {
            debug!(%tab_id, "classification forgotten");
        }
    }

    /// Queue `url` for background analysis. Re-queueing a pending URL is a no-op.
    pub fn on_page_hidden(&mut self, url: &str) {
        if !is_web_url(url) || !self.analysis_enabled() {
            return;
        }
        if self.pending.insert(url.to_string()) {
            debug!(url, pending = self.pending.len(), "queued for analysis");
        }
    }

    /// Record readiness. Only the first transition to ready counts, and it
    /// triggers one drain attempt.
    pub async fn on_model_ready(&mut self, ready: bool) {
        if self.is_model_ready {
            if !ready {
                debug!("ignoring readiness downgrade");
            }
            return;
        }
        if !ready {
            return;
        }

        self.is_model_ready = true;
        info!(pending = self.pending.len(), "model ready");
        self.drain_queue().await;
    }

    /// Process at most one queued URL.
    pub async fn drain_queue(&mut self) -> DrainOutcome {
        if self.pending.is_empty() || !self.is_model_ready {
            return DrainOutcome::Skipped;
        }
        if !self.store.is_authenticated() || self.store.user().is_none() {
            debug!(pending = self.pending.len(), "signed out, drain skipped");
            return DrainOutcome::Skipped;
        }
        let Some(url) = self.pending.pop_front() else {
            return DrainOutcome::Skipped;
        };

        let Some(tab_id) = self.browser.find_tab_by_url(&url).await else {
            debug!(%url, "no open tab for queued url, dropped");
            return DrainOutcome::Dropped { url };
        };

        let content_type = self
            .tab_markers
            .get(&tab_id)
            .and_then(Classification::preferred_type)
            .unwrap_or(ContentType::Article);

        match self
            .browser
            .send_to_observer(tab_id, ObserverRequest::Extract { content_type })
            .await
        {
            Ok(ObserverResponse::Extracted(draft)) => {
                info!(%url, title = %draft.title, "background analysis complete");
                self.browser
                    .notify(Notification::content_found(&draft.title))
                    .await;
                DrainOutcome::Notified {
                    url,
                    title: draft.title,
                }
            }
            Ok(other) => {
                warn!(%url, ?other, "unexpected observer reply to extract");
                DrainOutcome::Dropped { url }
            }
            Err(e) => {
                debug!(%url, error = %e, "extraction unavailable, dropped");
                DrainOutcome::Dropped { url }
            }
        }
    }

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        let mut marked_tabs: Vec<TabId> = self
            .tab_markers
            .iter()
            .filter(|(_, c)| c.is_interesting())
            .map(|(tab, _)| *tab)
            .collect();
        marked_tabs.sort();

        CoordinatorSnapshot {
            model_ready: self.is_model_ready,
            pending: self.pending.to_vec(),
            marked_tabs,
        }
    }
}
