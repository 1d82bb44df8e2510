//! Typed request/response contract between a page observer and its callers.

use serde::{Deserialize, Serialize};

use readwatch_shared::{Classification, ContentDraft, ContentType};

/// Request sent to a page observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ObserverRequest {
    /// Run the article/video heuristics.
    Classify,
    /// Build a draft as the given content type.
    #[serde(rename_all = "camelCase")]
    Extract { content_type: ContentType },
}

/// Reply from a page observer. One reply per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ObserverResponse {
    Classified(Classification),
    Extracted(ContentDraft),
}

impl ObserverResponse {
    pub fn into_classification(self) -> Option<Classification> {
        match self {
            Self::Classified(c) => Some(c),
            Self::Extracted(_) => None,
        }
    }
}
