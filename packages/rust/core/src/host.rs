//! In-process tab host.
//!
//! [`TabHost`] plays the browser: it owns the open tabs, spawns a page
//! observer per loaded page and reports navigations to the coordinator.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use readwatch_observer::{ObserverRequest, ObserverResponse, PageSnapshot};
use readwatch_shared::{
    LocalStore, Notification, PageIdentity, ReadWatchError, Result, TabId, TabMarker,
};

use crate::browser::{Browser, BrowserTab, unavailable};
use crate::coordinator::CoordinatorHandle;
use crate::observer::ObserverHandle;

struct TabEntry {
    url: String,
    title: Option<String>,
    generation: u64,
    observer: ObserverHandle,
    marker: Option<TabMarker>,
}

#[derive(Default)]
struct HostState {
    tabs: BTreeMap<TabId, TabEntry>,
    active: Option<TabId>,
    next_id: u32,
    notifications: Vec<Notification>,
}

pub struct TabHost {
    store: Arc<LocalStore>,
    probe_timeout: Duration,
    coordinator: OnceLock<CoordinatorHandle>,
    notification_sink: Option<mpsc::UnboundedSender<Notification>>,
    state: Mutex<HostState>,
}

impl TabHost {
    pub fn new(store: Arc<LocalStore>, probe_timeout: Duration) -> Self {
        Self {
            store,
            probe_timeout,
            coordinator: OnceLock::new(),
            notification_sink: None,
            state: Mutex::new(HostState {
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    /// Forward every notification to `sink` as well as recording it.
    pub fn with_notification_sink(mut self, sink: mpsc::UnboundedSender<Notification>) -> Self {
        self.notification_sink = Some(sink);
        self
    }

    /// Attach the coordinator that receives navigation and page-hidden
    /// events. Only the first call takes effect.
    pub fn connect(&self, coordinator: CoordinatorHandle) {
        if self.coordinator.set(coordinator).is_err() {
            warn!("tab host already connected to a coordinator");
        }
    }

    fn spawn_observer(&self, snapshot: PageSnapshot) -> ObserverHandle {
        ObserverHandle::spawn(snapshot, self.store.clone(), self.coordinator.get().cloned())
    }

    fn navigation_complete(&self, tab: TabId, url: &str) {
        if let Some(coordinator) = self.coordinator.get() {
            coordinator.navigation_complete(tab, url);
        }
    }

    /// Open a new tab showing `html` at `url` and make it active.
    ///
    /// Tabs report the parsed, normalized form of `url`.
    pub async fn open_tab(&self, url: &str, html: impl Into<String>) -> Result<TabId> {
        let snapshot = PageSnapshot::new(url, html)?;
        let url = snapshot.url().to_string();
        let title = snapshot.title();
        let observer = self.spawn_observer(snapshot);

        let id = {
            let mut state = self.state.lock().await;
            let id = TabId(state.next_id);
            state.next_id += 1;
            state.tabs.insert(
                id,
                TabEntry {
                    url: url.clone(),
                    title,
                    generation: 0,
                    observer,
                    marker: None,
                },
            );
            state.active = Some(id);
            id
        };

        info!(tab = %id, %url, "tab opened");
        self.navigation_complete(id, &url);
        Ok(id)
    }

    /// Load a new page into `tab`. The previous page counts as hidden.
    pub async fn navigate(&self, tab: TabId, url: &str, html: impl Into<String>) -> Result<()> {
        let snapshot = PageSnapshot::new(url, html)?;
        let url = snapshot.url().to_string();
        let title = snapshot.title();
        let observer = self.spawn_observer(snapshot);

        let previous = {
            let mut state = self.state.lock().await;
            let entry = state
                .tabs
                .get_mut(&tab)
                .ok_or_else(|| ReadWatchError::validation(format!("no tab {tab}")))?;
            entry.url = url.clone();
            entry.title = title;
            entry.generation += 1;
            entry.marker = None;
            std::mem::replace(&mut entry.observer, observer)
        };

        previous.page_hidden().await;
        debug!(%tab, %url, "tab navigated");
        self.navigation_complete(tab, &url);
        Ok(())
    }

    /// The user switched away from `tab`, or minimized it.
    pub async fn hide(&self, tab: TabId) -> Result<()> {
        let observer = {
            let mut state = self.state.lock().await;
            let observer = state
                .tabs
                .get(&tab)
                .map(|entry| entry.observer.clone())
                .ok_or_else(|| ReadWatchError::validation(format!("no tab {tab}")))?;
            if state.active == Some(tab) {
                state.active = None;
            }
            observer
        };
        observer.page_hidden().await;
        Ok(())
    }

    pub async fn activate(&self, tab: TabId) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.tabs.contains_key(&tab) {
            return Err(ReadWatchError::validation(format!("no tab {tab}")));
        }
        state.active = Some(tab);
        Ok(())
    }

    /// Close `tab`. Its page is hidden first, then its observer stops.
    pub async fn close(&self, tab: TabId) -> Result<()> {
        self.hide(tab).await?;
        self.state.lock().await.tabs.remove(&tab);
        debug!(%tab, "tab closed");
        if let Some(coordinator) = self.coordinator.get() {
            coordinator.tab_closed(tab);
        }
        Ok(())
    }

    /// Tabs currently showing a marker.
    pub async fn markers(&self) -> Vec<(TabId, TabMarker)> {
        let state = self.state.lock().await;
        state
            .tabs
            .iter()
            .filter_map(|(id, entry)| entry.marker.clone().map(|m| (*id, m)))
            .collect()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.lock().await.notifications.clone()
    }
}

#[async_trait]
impl Browser for TabHost {
    async fn active_tab(&self) -> Option<BrowserTab> {
        let state = self.state.lock().await;
        let id = state.active?;
        state.tabs.get(&id).map(|entry| BrowserTab {
            id,
            url: entry.url.clone(),
            title: entry.title.clone(),
        })
    }

    async fn find_tab_by_url(&self, url: &str) -> Option<TabId> {
        let state = self.state.lock().await;
        state
            .tabs
            .iter()
            .find(|(_, entry)| entry.url == url)
            .map(|(id, _)| *id)
    }

    async fn page_identity(&self, tab: TabId) -> Option<PageIdentity> {
        let state = self.state.lock().await;
        state.tabs.get(&tab).map(|entry| PageIdentity {
            tab_id: tab,
            url: entry.url.clone(),
            generation: entry.generation,
        })
    }

    async fn send_to_observer(
        &self,
        tab: TabId,
        request: ObserverRequest,
    ) -> Result<ObserverResponse> {
        let observer = {
            let state = self.state.lock().await;
            state.tabs.get(&tab).map(|entry| entry.observer.clone())
        };
        let observer = observer.ok_or_else(|| unavailable(&request, format!("tab {tab} is closed")))?;
        observer.request(request, self.probe_timeout).await
    }

    async fn set_marker(&self, page: &PageIdentity, marker: TabMarker) {
        let mut state = self.state.lock().await;
        match state.tabs.get_mut(&page.tab_id) {
            Some(entry) if entry.generation == page.generation && entry.url == page.url => {
                entry.marker = Some(marker);
            }
            Some(_) => debug!(tab = %page.tab_id, "marker for a previous page ignored"),
            None => debug!(tab = %page.tab_id, "marker for closed tab ignored"),
        }
    }

    async fn notify(&self, notification: Notification) {
        info!(title = %notification.title, message = %notification.message, "notification");
        if let Some(sink) = &self.notification_sink {
            let _ = sink.send(notification.clone());
        }
        self.state.lock().await.notifications.push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readwatch_shared::{Classification, LocalState};

    const ARTICLE: &str = "<html><head><title>Post</title></head><body><article><h1>Post</h1></article></body></html>";
    const PLAIN: &str = "<html><body><p>Hello</p></body></html>";

    fn host() -> TabHost {
        TabHost::new(
            Arc::new(LocalStore::in_memory(LocalState::default())),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn open_tab_becomes_active() {
        let host = host();
        let first = host.open_tab("https://a.example.com/", PLAIN).await.unwrap();
        let second = host.open_tab("https://b.example.com/", ARTICLE).await.unwrap();

        assert_ne!(first, second);
        let active = host.active_tab().await.unwrap();
        assert_eq!(active.id, second);
        assert_eq!(active.title.as_deref(), Some("Post"));
    }

    #[tokio::test]
    async fn requests_reach_the_current_page() {
        let host = host();
        let tab = host.open_tab("https://a.example.com/", PLAIN).await.unwrap();
        host.navigate(tab, "https://b.example.com/post", ARTICLE)
            .await
            .unwrap();

        let reply = host
            .send_to_observer(tab, ObserverRequest::Classify)
            .await
            .unwrap();
        assert_eq!(
            reply.into_classification(),
            Some(Classification {
                is_article: true,
                is_video: false
            })
        );
    }

    #[tokio::test]
    async fn navigation_bumps_generation_and_clears_marker() {
        let host = host();
        let tab = host.open_tab("https://a.example.com/", ARTICLE).await.unwrap();
        let before = host.page_identity(tab).await.unwrap();
        host.set_marker(&before, TabMarker::interesting()).await;
        assert_eq!(host.markers().await, vec![(tab, TabMarker::interesting())]);

        host.navigate(tab, "https://a.example.com/next", PLAIN)
            .await
            .unwrap();
        let after = host.page_identity(tab).await.unwrap();

        assert_eq!(after.generation, before.generation + 1);
        assert_ne!(after, before);
        assert!(host.markers().await.is_empty());
    }

    #[tokio::test]
    async fn marker_for_previous_page_is_ignored() {
        let host = host();
        let tab = host.open_tab("https://a.example.com/", ARTICLE).await.unwrap();
        let old = host.page_identity(tab).await.unwrap();

        host.navigate(tab, "https://a.example.com/next", PLAIN)
            .await
            .unwrap();
        host.set_marker(&old, TabMarker::interesting()).await;
        assert!(host.markers().await.is_empty());

        // Same url, later generation.
        host.navigate(tab, "https://a.example.com/", ARTICLE)
            .await
            .unwrap();
        host.set_marker(&old, TabMarker::interesting()).await;
        assert!(host.markers().await.is_empty());

        let current = host.page_identity(tab).await.unwrap();
        host.set_marker(&current, TabMarker::interesting()).await;
        assert_eq!(host.markers().await.len(), 1);
    }

    #[tokio::test]
    async fn closed_tab_is_unavailable() {
        let host = host();
        let tab = host.open_tab("https://a.example.com/", ARTICLE).await.unwrap();
        host.close(tab).await.unwrap();

        assert!(host.page_identity(tab).await.is_none());
        assert!(host.find_tab_by_url("https://a.example.com/").await.is_none());
        let err = host
            .send_to_observer(tab, ObserverRequest::Classify)
            .await
            .unwrap_err();
        assert!(matches!(err, ReadWatchError::ClassificationUnavailable(_)));
    }

    #[tokio::test]
    async fn notifications_reach_the_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let host = host().with_notification_sink(tx);
        host.notify(Notification::content_found("Post")).await;

        assert_eq!(rx.recv().await, Some(Notification::content_found("Post")));
        assert_eq!(host.notifications().await.len(), 1);
    }

    #[tokio::test]
    async fn unknown_tab_operations_fail() {
        let host = host();
        assert!(host.activate(TabId(9)).await.is_err());
        assert!(host.hide(TabId(9)).await.is_err());
    }
}
