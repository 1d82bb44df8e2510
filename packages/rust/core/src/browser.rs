//! The host capabilities the coordinator and review session rely on.
//!
//! A [`Browser`] knows which tabs exist, routes requests to each tab's page
//! observer and shows markers and notifications. [`crate::host::TabHost`] is
//! the in-process implementation.

use async_trait::async_trait;

use readwatch_observer::{ObserverRequest, ObserverResponse};
use readwatch_shared::{Notification, PageIdentity, ReadWatchError, Result, TabId, TabMarker};

/// A tab as seen from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserTab {
    pub id: TabId,
    pub url: String,
    pub title: Option<String>,
}

#[async_trait]
pub trait Browser: Send + Sync {
    /// The tab the user is looking at.
    async fn active_tab(&self) -> Option<BrowserTab>;

    /// Some open tab currently showing exactly `url`.
    async fn find_tab_by_url(&self, url: &str) -> Option<TabId>;

    /// What `tab` shows right now; `None` once the tab is closed.
    async fn page_identity(&self, tab: TabId) -> Option<PageIdentity>;

    /// One request/reply exchange with the tab's page observer.
    ///
    /// Every failure (closed tab, dropped reply, timeout) is final for this attempt.
    async fn send_to_observer(&self, tab: TabId, request: ObserverRequest)
    -> Result<ObserverResponse>;

    /// Show the marker on the tab while it still shows `page`.
    ///
    /// Ignored once the tab has navigated away or closed. The host drops the
    /// marker when the tab navigates.
    async fn set_marker(&self, page: &PageIdentity, marker: TabMarker);

    async fn notify(&self, notification: Notification);
}

/// The "unavailable" error matching the kind of request that failed.
pub(crate) fn unavailable(request: &ObserverRequest, reason: impl Into<String>) -> ReadWatchError {
    match request {
        ObserverRequest::Classify => ReadWatchError::ClassificationUnavailable(reason.into()),
        ObserverRequest::Extract { .. } => ReadWatchError::ExtractionUnavailable(reason.into()),
    }
}
