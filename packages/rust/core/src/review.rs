//! Interactive review of the active tab.
//!
//! A [`ReviewSession`] walks
//! `Idle → Classifying → {NoContent | Classified → Summarizing → Ready}` and
//! from `Ready` either saves or discards the draft. Nothing reaches the
//! backend unless [`ReviewSession::accept`] is called.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use readwatch_api::ContentApi;
use readwatch_inference::{InferenceEngine, SUMMARY_UNAVAILABLE, summarize};
use readwatch_observer::{ObserverRequest, ObserverResponse, source_from_url};
use readwatch_shared::{
    Classification, ContentDraft, ContentRecord, ContentType, LocalStore, NewContent,
    PageIdentity, is_web_url,
};

use crate::browser::{Browser, BrowserTab};
use crate::coordinator::CoordinatorHandle;

/// Shown when the backend already holds this URL for the user.
pub const DUPLICATE_MESSAGE: &str = "This content is already in your list";

/// Shown when accepting while signed out.
pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to save content";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewState {
    Idle,
    Classifying,
    NoContent,
    Classified(Classification),
    Summarizing,
    Ready,
    Saved,
    Discarded,
    SaveFailed { message: String },
}

/// How a classification pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// A draft is waiting for accept or discard.
    Ready,
    /// The active tab has nothing worth saving.
    NoContent,
    /// The tab changed while a result was in flight; the result was dropped.
    Stale,
}

#[derive(Debug, Clone)]
pub enum AcceptOutcome {
    Saved(ContentRecord),
    Failed { message: String },
    /// No draft is awaiting a decision.
    NothingToSave,
}

pub struct ReviewSession {
    id: Uuid,
    browser: Arc<dyn Browser>,
    coordinator: CoordinatorHandle,
    engine: Arc<dyn InferenceEngine>,
    api: Arc<dyn ContentApi>,
    store: Arc<LocalStore>,
    state: ReviewState,
    history: Vec<ReviewState>,
    draft: Option<ContentDraft>,
    identity: Option<PageIdentity>,
}

impl ReviewSession {
    pub fn new(
        browser: Arc<dyn Browser>,
        coordinator: CoordinatorHandle,
        engine: Arc<dyn InferenceEngine>,
        api: Arc<dyn ContentApi>,
        store: Arc<LocalStore>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            browser,
            coordinator,
            engine,
            api,
            store,
            state: ReviewState::Idle,
            history: vec![ReviewState::Idle],
            draft: None,
            identity: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &ReviewState {
        &self.state
    }

    /// Every state entered so far, oldest first.
    pub fn history(&self) -> &[ReviewState] {
        &self.history
    }

    pub fn draft(&self) -> Option<&ContentDraft> {
        self.draft.as_ref()
    }

    fn transition(&mut self, next: ReviewState) {
        debug!(session = %self.id, from = ?self.state, to = ?next, "review transition");
        self.state = next.clone();
        self.history.push(next);
    }

    fn stale(&mut self) -> ReviewOutcome {
        debug!(session = %self.id, "tab changed during review, result dropped");
        self.draft = None;
        self.identity = None;
        self.transition(ReviewState::Idle);
        ReviewOutcome::Stale
    }

    fn no_content(&mut self) -> ReviewOutcome {
        self.transition(ReviewState::NoContent);
        ReviewOutcome::NoContent
    }

    async fn is_current(&self, identity: &PageIdentity) -> bool {
        self.browser.page_identity(identity.tab_id).await.as_ref() == Some(identity)
    }

    /// Classify the active tab and, when it is interesting, build and
    /// summarize a draft.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn open(&mut self) -> ReviewOutcome {
        self.draft = None;
        self.identity = None;

        let Some(tab) = self.browser.active_tab().await else {
            return self.no_content();
        };
        if !is_web_url(&tab.url) {
            debug!(url = %tab.url, "not a web page");
            return self.no_content();
        }
        let Some(identity) = self.browser.page_identity(tab.id).await else {
            return self.no_content();
        };

        self.transition(ReviewState::Classifying);
        let classification = match self
            .browser
            .send_to_observer(tab.id, ObserverRequest::Classify)
            .await
        {
            Ok(ObserverResponse::Classified(c)) => c,
            Ok(other) => {
                warn!(?other, "unexpected observer reply to classify");
                Classification::default()
            }
            Err(e) => {
                warn!(error = %e, "classification unavailable");
                Classification::default()
            }
        };
        if !self.is_current(&identity).await {
            return self.stale();
        }
        let Some(content_type) = classification.preferred_type() else {
            return self.no_content();
        };
        self.transition(ReviewState::Classified(classification));

        self.transition(ReviewState::Summarizing);
        let mut draft = self.extract(&tab, content_type).await;
        if !self.is_current(&identity).await {
            return self.stale();
        }

        let summary = if self.coordinator.is_model_ready().await {
            summarize(self.engine.as_ref(), &draft).await
        } else {
            SUMMARY_UNAVAILABLE.to_string()
        };
        if !self.is_current(&identity).await {
            return self.stale();
        }
        draft.summary = Some(summary);

        info!(url = %draft.url, title = %draft.title, kind = %draft.content_type, "draft ready");
        self.draft = Some(draft);
        self.identity = Some(identity);
        self.transition(ReviewState::Ready);
        ReviewOutcome::Ready
    }

    async fn extract(&self, tab: &BrowserTab, content_type: ContentType) -> ContentDraft {
        match self
            .browser
            .send_to_observer(tab.id, ObserverRequest::Extract { content_type })
            .await
        {
            Ok(ObserverResponse::Extracted(draft)) => draft,
            Ok(other) => {
                warn!(?other, "unexpected observer reply to extract");
                fallback_draft(tab, content_type)
            }
            Err(e) => {
                warn!(error = %e, "extraction unavailable, using tab details");
                fallback_draft(tab, content_type)
            }
        }
    }

    /// Save the pending draft. On failure the draft is kept and accepting
    /// again retries.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn accept(&mut self) -> AcceptOutcome {
        match self.state {
            ReviewState::Ready => {}
            ReviewState::SaveFailed { .. } => self.transition(ReviewState::Ready),
            _ => return AcceptOutcome::NothingToSave,
        }
        let Some(draft) = self.draft.clone() else {
            return AcceptOutcome::NothingToSave;
        };

        let Some(token) = self.store.token().filter(|t| !t.is_empty()) else {
            return self.save_failed(LOGIN_REQUIRED_MESSAGE.to_string());
        };

        let content = NewContent::from_draft(&draft, self.store.settings().default_public);
        match self.api.create_content(&token, &content).await {
            Ok(record) => {
                info!(url = %record.url, id = %record.id, "content saved");
                self.draft = None;
                self.identity = None;
                self.transition(ReviewState::Saved);
                self.open().await;
                AcceptOutcome::Saved(record)
            }
            Err(e) => {
                let message = if e.is_duplicate() {
                    DUPLICATE_MESSAGE.to_string()
                } else {
                    e.to_string()
                };
                warn!(url = %draft.url, error = %e, "save failed");
                self.save_failed(message)
            }
        }
    }

    /// Accept again after a failed save.
    pub async fn retry(&mut self) -> AcceptOutcome {
        self.accept().await
    }

    fn save_failed(&mut self, message: String) -> AcceptOutcome {
        self.transition(ReviewState::SaveFailed {
            message: message.clone(),
        });
        AcceptOutcome::Failed { message }
    }

    /// Drop the pending draft and classify the current tab again.
    /// `None` when there was no draft to discard.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn discard(&mut self) -> Option<ReviewOutcome> {
        if !matches!(
            self.state,
            ReviewState::Ready | ReviewState::SaveFailed { .. }
        ) {
            return None;
        }
        self.draft = None;
        self.identity = None;
        self.transition(ReviewState::Discarded);
        Some(self.open().await)
    }
}

/// Minimal draft built from what the tab itself reports.
fn fallback_draft(tab: &BrowserTab, content_type: ContentType) -> ContentDraft {
    let source = Url::parse(&tab.url)
        .map(|url| source_from_url(&url))
        .unwrap_or_default();
    ContentDraft {
        url: tab.url.clone(),
        title: tab.title.clone().unwrap_or_else(|| tab.url.clone()),
        content_type,
        source,
        thumbnail: None,
        text_content: String::new(),
        summary: None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use readwatch_inference::ProgressFn;
    use readwatch_shared::{LocalState, ReadWatchError, Result, Settings, TabId};

    use super::*;
    use crate::coordinator::Coordinator;
    use crate::testing::{FakeBrowser, FakeTab, signed_in_store};

    const URL: &str = "https://blog.example.com/a";

    struct FixedEngine {
        ready: AtomicBool,
    }

    #[async_trait]
    impl InferenceEngine for FixedEngine {
        async fn load(&self, _progress: &ProgressFn) -> Result<()> {
            self.ready.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok("A short summary.".into())
        }

        fn is_ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }
    }

    /// Reloads the tab while it writes the summary.
    struct ReloadingEngine {
        browser: Arc<FakeBrowser>,
        tab: TabId,
    }

    #[async_trait]
    impl InferenceEngine for ReloadingEngine {
        async fn load(&self, _progress: &ProgressFn) -> Result<()> {
            Ok(())
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.browser.bump_generation(self.tab);
            Ok("A summary of the previous page.".into())
        }

        fn is_ready(&self) -> bool {
            true
        }
    }

    /// Records every save; rejects URLs it has already stored.
    #[derive(Default)]
    struct RecordingApi {
        saved: Mutex<Vec<NewContent>>,
    }

    impl RecordingApi {
        fn saved(&self) -> Vec<NewContent> {
            self.saved.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ContentApi for RecordingApi {
        async fn create_content(&self, _token: &str, content: &NewContent) -> Result<ContentRecord> {
            let mut saved = self.saved.lock().unwrap();
            if saved.iter().any(|c| c.url == content.url) {
                return Err(ReadWatchError::DuplicateContent(
                    "Content with this URL already exists".into(),
                ));
            }
            saved.push(content.clone());
            Ok(ContentRecord {
                id: format!("c{}", saved.len()),
                user: None,
                url: content.url.clone(),
                title: content.title.clone(),
                content_type: content.content_type,
                source: content.source.clone(),
                summary: content.summary.clone(),
                thumbnail: content.thumbnail.clone(),
                tags: content.tags.clone(),
                is_public: content.is_public,
                created_at: None,
                updated_at: None,
            })
        }
    }

    struct Fixture {
        browser: Arc<FakeBrowser>,
        api: Arc<RecordingApi>,
        session: ReviewSession,
    }

    fn fixture(store: Arc<LocalStore>, model_ready: bool) -> Fixture {
        fixture_with_engine(store, model_ready, |_| {
            Arc::new(FixedEngine {
                ready: AtomicBool::new(model_ready),
            })
        })
    }

    fn fixture_with_engine(
        store: Arc<LocalStore>,
        model_ready: bool,
        engine: impl FnOnce(&Arc<FakeBrowser>) -> Arc<dyn InferenceEngine>,
    ) -> Fixture {
        let browser = Arc::new(FakeBrowser::default());
        let api = Arc::new(RecordingApi::default());
        let engine = engine(&browser);
        let (coordinator, _task) = Coordinator::spawn(browser.clone(), store.clone(), &Default::default());
        coordinator.model_ready(model_ready);
        let session = ReviewSession::new(browser.clone(), coordinator, engine, api.clone(), store);
        Fixture {
            browser,
            api,
            session,
        }
    }

    #[tokio::test]
    async fn non_web_tab_is_no_content_without_probing() {
        let mut f = fixture(signed_in_store(), true);
        f.browser.add_tab(FakeTab::article(1, "chrome://newtab"));

        assert_eq!(f.session.open().await, ReviewOutcome::NoContent);
        assert_eq!(f.session.state(), &ReviewState::NoContent);
        assert!(f.browser.requests().is_empty());
    }

    #[tokio::test]
    async fn uninteresting_page_is_no_content() {
        let mut f = fixture(signed_in_store(), true);
        f.browser.add_tab(FakeTab::plain(1, URL));

        assert_eq!(f.session.open().await, ReviewOutcome::NoContent);
        assert_eq!(f.browser.requests().len(), 1);
    }

    #[tokio::test]
    async fn ready_draft_carries_summary() {
        let mut f = fixture(signed_in_store(), true);
        f.browser.add_tab(FakeTab::article(1, URL));

        assert_eq!(f.session.open().await, ReviewOutcome::Ready);
        let draft = f.session.draft().unwrap();
        assert_eq!(draft.summary.as_deref(), Some("A short summary."));
        assert_eq!(
            f.session.history(),
            &[
                ReviewState::Idle,
                ReviewState::Classifying,
                ReviewState::Classified(Classification {
                    is_article: true,
                    is_video: false
                }),
                ReviewState::Summarizing,
                ReviewState::Ready,
            ]
        );
        // Opening a review never saves.
        assert!(f.api.saved().is_empty());
    }

    #[tokio::test]
    async fn not_ready_model_uses_placeholder() {
        let mut f = fixture(signed_in_store(), false);
        f.browser.add_tab(FakeTab::article(1, URL));

        assert_eq!(f.session.open().await, ReviewOutcome::Ready);
        assert_eq!(
            f.session.draft().unwrap().summary.as_deref(),
            Some(SUMMARY_UNAVAILABLE)
        );
    }

    #[tokio::test]
    async fn accept_saves_then_reclassifies() {
        let store = signed_in_store();
        store
            .set_settings(Settings {
                auto_analyze: true,
                default_public: false,
            })
            .unwrap();
        let mut f = fixture(store, true);
        f.browser.add_tab(FakeTab::article(1, URL));
        f.session.open().await;

        let outcome = f.session.accept().await;
        assert!(matches!(outcome, AcceptOutcome::Saved(ref r) if r.url == URL));
        let saved = f.api.saved();
        assert_eq!(saved.len(), 1);
        assert!(!saved[0].is_public);
        assert!(f.session.history().contains(&ReviewState::Saved));
        // Re-entered classification on the same tab.
        assert_eq!(f.session.state(), &ReviewState::Ready);
    }

    #[tokio::test]
    async fn duplicate_save_keeps_draft() {
        let mut f = fixture(signed_in_store(), true);
        f.browser.add_tab(FakeTab::article(1, URL));
        f.session.open().await;
        f.session.accept().await;

        let outcome = f.session.accept().await;
        assert!(matches!(outcome, AcceptOutcome::Failed { ref message } if message == DUPLICATE_MESSAGE));
        assert_eq!(
            f.session.state(),
            &ReviewState::SaveFailed {
                message: DUPLICATE_MESSAGE.into()
            }
        );
        assert_eq!(f.session.draft().unwrap().url, URL);

        // Retrying fails the same way, still without losing the draft.
        assert!(matches!(f.session.retry().await, AcceptOutcome::Failed { .. }));
        assert!(f.session.draft().is_some());
        assert_eq!(f.api.saved().len(), 1);
    }

    #[tokio::test]
    async fn accept_requires_login() {
        let mut f = fixture(Arc::new(LocalStore::in_memory(LocalState::default())), true);
        f.browser.add_tab(FakeTab::article(1, URL));
        f.session.open().await;

        let outcome = f.session.accept().await;
        assert!(matches!(outcome, AcceptOutcome::Failed { ref message } if message == LOGIN_REQUIRED_MESSAGE));
        assert!(f.api.saved().is_empty());
    }

    #[tokio::test]
    async fn discard_never_saves() {
        let mut f = fixture(signed_in_store(), true);
        f.browser.add_tab(FakeTab::article(1, URL));
        f.session.open().await;

        assert_eq!(f.session.discard().await, Some(ReviewOutcome::Ready));
        assert!(f.session.history().contains(&ReviewState::Discarded));
        assert!(f.api.saved().is_empty());
        assert!(matches!(f.session.accept().await, AcceptOutcome::Saved(_)));
    }

    #[tokio::test]
    async fn accept_without_draft_does_nothing() {
        let mut f = fixture(signed_in_store(), true);
        assert!(matches!(f.session.accept().await, AcceptOutcome::NothingToSave));
        assert!(f.session.discard().await.is_none());
    }

    #[tokio::test]
    async fn navigation_during_classification_is_stale() {
        let mut f = fixture(signed_in_store(), true);
        f.browser.add_tab(FakeTab::article(1, URL));
        f.browser.navigate_during(ObserverRequest::Classify);

        assert_eq!(f.session.open().await, ReviewOutcome::Stale);
        assert_eq!(f.session.state(), &ReviewState::Idle);
        assert!(f.session.draft().is_none());
    }

    #[tokio::test]
    async fn navigation_during_extraction_is_stale() {
        let mut f = fixture(signed_in_store(), true);
        f.browser.add_tab(FakeTab::article(1, URL));
        f.browser.navigate_during(ObserverRequest::Extract {
            content_type: ContentType::Article,
        });

        assert_eq!(f.session.open().await, ReviewOutcome::Stale);
        assert!(f.session.draft().is_none());
        assert!(matches!(f.session.accept().await, AcceptOutcome::NothingToSave));
    }

    #[tokio::test]
    async fn navigation_during_summary_is_stale() {
        let mut f = fixture_with_engine(signed_in_store(), true, |browser| {
            Arc::new(ReloadingEngine {
                browser: browser.clone(),
                tab: TabId(1),
            })
        });
        f.browser.add_tab(FakeTab::article(1, URL));

        assert_eq!(f.session.open().await, ReviewOutcome::Stale);
        assert_eq!(f.session.state(), &ReviewState::Idle);
        assert!(f.session.draft().is_none());
        // Both the classify and the extract were answered before the reload.
        assert_eq!(f.browser.requests().len(), 2);
        assert!(matches!(f.session.accept().await, AcceptOutcome::NothingToSave));
        assert!(f.api.saved().is_empty());
    }

    #[tokio::test]
    async fn failed_extraction_falls_back_to_tab_details() {
        let mut f = fixture(signed_in_store(), false);
        f.browser.add_tab(FakeTab::article(1, URL).extract_fails());

        assert_eq!(f.session.open().await, ReviewOutcome::Ready);
        let draft = f.session.draft().unwrap();
        assert_eq!(draft.title, URL);
        assert_eq!(draft.source, "blog.example.com");
        assert!(draft.text_content.is_empty());
    }

    #[tokio::test]
    async fn unresponsive_tab_has_no_content() {
        let mut f = fixture(signed_in_store(), true);
        f.browser.add_tab(FakeTab::article(1, URL).unresponsive());

        assert_eq!(f.session.open().await, ReviewOutcome::NoContent);
    }

    #[test]
    fn fallback_uses_url_when_untitled() {
        let tab = BrowserTab {
            id: readwatch_shared::TabId(1),
            url: "https://www.example.com/x".into(),
            title: None,
        };
        let draft = fallback_draft(&tab, ContentType::Article);
        assert_eq!(draft.title, tab.url);
        assert_eq!(draft.source, "example.com");
        assert!(draft.text_content.is_empty());
    }
}
