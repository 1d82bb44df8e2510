//! Page Observer logic: pure classification and extraction over a DOM snapshot.
//!
//! This crate provides:
//! - [`classify`] — article/video heuristics
//! - [`extract`] — draft field extraction with the 5000-character body cap
//! - [`probes`] — platform-specific probes (YouTube) behind a registry
//! - [`protocol`] — the typed request/response contract spoken with a page
//!
//! Nothing here performs I/O or holds state; the same snapshot always yields
//! the same answer.

pub mod classify;
pub mod extract;
pub mod probes;
pub mod protocol;

use scraper::Html;
use url::Url;

use readwatch_shared::{Classification, ContentDraft, ContentType, ReadWatchError, Result};

pub use classify::{classify, is_known_video_url};
pub use extract::{document_title, extract, source_from_url, truncate_chars};
pub use probes::{GenericProbe, PlatformProbe, ProbeRegistry, VideoDetails, YouTubeProbe};
pub use protocol::{ObserverRequest, ObserverResponse};

/// The DOM of a loaded page, as raw HTML plus its location.
///
/// The HTML is re-parsed per request so the snapshot stays `Send` and can be
/// owned by an observer task.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    url: Url,
    html: String,
}

impl PageSnapshot {
    pub fn new(url: &str, html: impl Into<String>) -> Result<Self> {
        let url =
            Url::parse(url).map_err(|e| ReadWatchError::parse(format!("invalid URL '{url}': {e}")))?;
        Ok(Self {
            url,
            html: html.into(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The tab title, when the page declares one.
    pub fn title(&self) -> Option<String> {
        document_title(&Html::parse_document(&self.html))
    }

    pub fn classify(&self) -> Classification {
        let doc = Html::parse_document(&self.html);
        classify(&doc, &self.url)
    }

    pub fn extract(&self, content_type: ContentType) -> ContentDraft {
        let doc = Html::parse_document(&self.html);
        extract(&doc, &self.url, content_type, &ProbeRegistry::new())
    }

    /// Answer a protocol request against this snapshot.
    pub fn handle(&self, request: &ObserverRequest) -> ObserverResponse {
        match request {
            ObserverRequest::Classify => ObserverResponse::Classified(self.classify()),
            ObserverRequest::Extract { content_type } => {
                ObserverResponse::Extracted(self.extract(*content_type))
            }
        }
    }
}
