//! Recording [`Browser`] double shared by the actor tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use readwatch_observer::{ObserverRequest, ObserverResponse};
use readwatch_shared::{
    Classification, ContentDraft, LocalState, LocalStore, Notification, PageIdentity, Result,
    TabId, TabMarker, User,
};

use crate::browser::{Browser, BrowserTab, unavailable};

pub(crate) fn signed_in_store() -> Arc<LocalStore> {
    Arc::new(LocalStore::in_memory(LocalState {
        token: Some("token-1".into()),
        user: Some(User {
            id: "u1".into(),
            username: "reader".into(),
            email: None,
            profile_picture: None,
        }),
        settings: Default::default(),
    }))
}

#[derive(Debug, Clone)]
pub(crate) struct FakeTab {
    pub id: TabId,
    pub url: String,
    pub generation: u64,
    pub classification: Classification,
    pub responsive: bool,
    pub extractable: bool,
}

impl FakeTab {
    fn new(id: u32, url: &str, classification: Classification) -> Self {
        Self {
            id: TabId(id),
            url: url.to_string(),
            generation: 0,
            classification,
            responsive: true,
            extractable: true,
        }
    }

    pub fn article(id: u32, url: &str) -> Self {
        Self::new(
            id,
            url,
            Classification {
                is_article: true,
                is_video: false,
            },
        )
    }

    pub fn video(id: u32, url: &str) -> Self {
        Self::new(
            id,
            url,
            Classification {
                is_article: false,
                is_video: true,
            },
        )
    }

    pub fn plain(id: u32, url: &str) -> Self {
        Self::new(id, url, Classification::default())
    }

    pub fn unresponsive(mut self) -> Self {
        self.responsive = false;
        self
    }

    /// Answers classification but never extraction.
    pub fn extract_fails(mut self) -> Self {
        self.extractable = false;
        self
    }
}

#[derive(Default)]
struct FakeState {
    tabs: Vec<FakeTab>,
    active: Option<TabId>,
    requests: Vec<(TabId, ObserverRequest)>,
    markers: Vec<(TabId, TabMarker)>,
    notifications: Vec<Notification>,
    navigate_during: Option<ObserverRequest>,
}

#[derive(Default)]
pub(crate) struct FakeBrowser {
    state: Mutex<FakeState>,
}

impl FakeBrowser {
    fn with<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    /// Add a tab and make it active.
    pub fn add_tab(&self, tab: FakeTab) {
        self.with(|s| {
            s.active = Some(tab.id);
            s.tabs.push(tab);
        });
    }

    /// Replace the tab with the same id, as a new page load.
    pub fn navigate(&self, mut tab: FakeTab) {
        self.with(|s| {
            if let Some(existing) = s.tabs.iter_mut().find(|t| t.id == tab.id) {
                tab.generation = existing.generation + 1;
                *existing = tab;
            }
        });
    }

    /// Count a reload of the tab without changing what it shows.
    pub fn bump_generation(&self, id: TabId) {
        self.with(|s| {
            if let Some(tab) = s.tabs.iter_mut().find(|t| t.id == id) {
                tab.generation += 1;
            }
        });
    }

    pub fn close(&self, id: TabId) {
        self.with(|s| s.tabs.retain(|t| t.id != id));
    }

    /// Bump the generation of the requested tab right after answering `request`.
    pub fn navigate_during(&self, request: ObserverRequest) {
        self.with(|s| s.navigate_during = Some(request));
    }

    pub fn requests(&self) -> Vec<(TabId, ObserverRequest)> {
        self.with(|s| s.requests.clone())
    }

    pub fn markers(&self) -> Vec<(TabId, TabMarker)> {
        self.with(|s| s.markers.clone())
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.with(|s| s.notifications.clone())
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn active_tab(&self) -> Option<BrowserTab> {
        self.with(|s| {
            let active = s.active?;
            s.tabs.iter().find(|t| t.id == active).map(|t| BrowserTab {
                id: t.id,
                url: t.url.clone(),
                title: None,
            })
        })
    }

    async fn find_tab_by_url(&self, url: &str) -> Option<TabId> {
        self.with(|s| s.tabs.iter().find(|t| t.url == url).map(|t| t.id))
    }

    async fn page_identity(&self, tab: TabId) -> Option<PageIdentity> {
        self.with(|s| {
            s.tabs.iter().find(|t| t.id == tab).map(|t| PageIdentity {
                tab_id: t.id,
                url: t.url.clone(),
                generation: t.generation,
            })
        })
    }

    async fn send_to_observer(
        &self,
        tab: TabId,
        request: ObserverRequest,
    ) -> Result<ObserverResponse> {
        self.with(|s| {
            s.requests.push((tab, request));
            let navigate = s.navigate_during == Some(request);
            let entry = s
                .tabs
                .iter_mut()
                .find(|t| t.id == tab)
                .ok_or_else(|| unavailable(&request, "tab closed"))?;
            if !entry.responsive {
                return Err(unavailable(&request, "no reply"));
            }

            let response = match request {
                ObserverRequest::Classify => ObserverResponse::Classified(entry.classification),
                ObserverRequest::Extract { .. } if !entry.extractable => {
                    return Err(unavailable(&request, "extraction failed"));
                }
                ObserverRequest::Extract { content_type } => {
                    ObserverResponse::Extracted(ContentDraft {
                        url: entry.url.clone(),
                        title: format!("Article {}", entry.id),
                        content_type,
                        source: "blog.example.com".into(),
                        thumbnail: None,
                        text_content: "Body text".into(),
                        summary: None,
                    })
                }
            };
            if navigate {
                entry.generation += 1;
            }
            Ok(response)
        })
    }

    async fn set_marker(&self, page: &PageIdentity, marker: TabMarker) {
        self.with(|s| {
            let current = s
                .tabs
                .iter()
                .any(|t| t.id == page.tab_id && t.url == page.url && t.generation == page.generation);
            if current {
                s.markers.push((page.tab_id, marker));
            }
        });
    }

    async fn notify(&self, notification: Notification) {
        self.with(|s| s.notifications.push(notification));
    }
}
