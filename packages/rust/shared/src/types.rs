//! Core domain types for the ReadWatch pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Hard cap on extracted body text, in characters.
pub const MAX_TEXT_CONTENT_CHARS: usize = 5000;

/// Whether a URL is a regular web page (`http`/`https`).
///
/// Browser-internal pages (`chrome://`, `about:`, extension pages, `file:`) are not.
pub fn is_web_url(url: &str) -> bool {
    Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Kind of content a draft represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Article,
    Video,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Article => "article",
            Self::Video => "video",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentType {
    type Err = crate::ReadWatchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "article" => Ok(Self::Article),
            "video" => Ok(Self::Video),
            other => Err(crate::ReadWatchError::validation(format!(
                "unknown content type '{other}'"
            ))),
        }
    }
}

/// Verdict of the page classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub is_article: bool,
    pub is_video: bool,
}

impl Classification {
    /// Either flag set.
    pub fn is_interesting(&self) -> bool {
        self.is_article || self.is_video
    }

    /// Content type to extract as. Video wins when both flags are set.
    pub fn preferred_type(&self) -> Option<ContentType> {
        if self.is_video {
            Some(ContentType::Video)
        } else if self.is_article {
            Some(ContentType::Article)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

/// Browser tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a tab was showing at a point in time.
///
/// `generation` increases on every navigation of the tab, so two identities
/// compare equal only if no navigation happened in between.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageIdentity {
    pub tab_id: TabId,
    pub url: String,
    pub generation: u64,
}

/// Visible badge set on a tab holding interesting content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabMarker {
    pub text: String,
    pub color: String,
}

impl TabMarker {
    pub fn interesting() -> Self {
        Self {
            text: "📌".into(),
            color: "#0ea5e9".into(),
        }
    }
}

/// User-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    /// Notification fired for a successfully drained queue item.
    pub fn content_found(draft_title: &str) -> Self {
        Self {
            title: "ReadWatch".into(),
            message: format!(
                "We found interesting content: \"{draft_title}\". Open extension to review."
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Drafts and records
// ---------------------------------------------------------------------------

/// A candidate content item under review. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDraft {
    pub url: String,
    pub title: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Body text, at most [`MAX_TEXT_CONTENT_CHARS`] characters.
    #[serde(default)]
    pub text_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Body of `POST /content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContent {
    pub url: String,
    pub title: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub source: String,
    pub summary: String,
    pub thumbnail: String,
    pub tags: Vec<String>,
    pub is_public: bool,
}

impl NewContent {
    pub fn from_draft(draft: &ContentDraft, is_public: bool) -> Self {
        Self {
            url: draft.url.clone(),
            title: draft.title.clone(),
            content_type: draft.content_type,
            source: draft.source.clone(),
            summary: draft.summary.clone().unwrap_or_default(),
            thumbnail: draft.thumbnail.clone().unwrap_or_default(),
            tags: Vec::new(),
            is_public,
        }
    }
}

/// A content record as stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub user: Option<serde_json::Value>,
    pub url: String,
    pub title: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub source: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// User & settings
// ---------------------------------------------------------------------------

/// Authenticated user as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

/// User preferences. An absent flag counts as enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_true")]
    pub auto_analyze: bool,
    #[serde(default = "default_true")]
    pub default_public: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_analyze: true,
            default_public: true,
        }
    }
}

fn default_true() -> bool {
    true
}
