//! Summary prompt template and degraded-summary placeholders.

use tracing::warn;

use readwatch_shared::ContentDraft;

use crate::InferenceEngine;

/// Summary used when the engine has not (or never will) become ready.
pub const SUMMARY_UNAVAILABLE: &str =
    "Summary generation is not available. Please wait for the model to load.";

/// Summary used when a generation request fails.
pub const SUMMARY_FAILED: &str = "Failed to generate summary. Please try again later.";

/// Build the fixed summarization prompt for a draft.
pub fn summary_prompt(draft: &ContentDraft) -> String {
    let content = if draft.text_content.is_empty() {
        "No content available"
    } else {
        draft.text_content.as_str()
    };

    format!(
        "You are a helpful assistant that summarizes content.\n\
         \n\
         Please summarize the following {kind}:\n\
         Title: {title}\n\
         Source: {source}\n\
         \n\
         Content:\n\
         {content}\n\
         \n\
         Provide a concise summary in 2-3 sentences highlighting the main points.",
        kind = draft.content_type,
        title = draft.title,
        source = draft.source,
    )
}

/// Summarize a draft, degrading to a placeholder instead of failing.
///
/// Callers must only invoke this once readiness is known to be true; an
/// engine that still reports not-ready yields [`SUMMARY_UNAVAILABLE`].
pub async fn summarize(engine: &dyn InferenceEngine, draft: &ContentDraft) -> String {
    if !engine.is_ready() {
        return SUMMARY_UNAVAILABLE.to_string();
    }

    match engine.generate(&summary_prompt(draft)).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            warn!(url = %draft.url, "engine returned an empty summary");
            SUMMARY_FAILED.to_string()
        }
        Err(e) => {
            warn!(url = %draft.url, error = %e, "summary generation failed");
            SUMMARY_FAILED.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readwatch_shared::ContentType;

    fn draft(text: &str) -> ContentDraft {
        ContentDraft {
            url: "https://blog.example.com/a".into(),
            title: "Understanding Ownership".into(),
            content_type: ContentType::Article,
            source: "blog.example.com".into(),
            thumbnail: None,
            text_content: text.into(),
            summary: None,
        }
    }

    #[test]
    fn prompt_embeds_draft_fields() {
        let prompt = summary_prompt(&draft("Ownership rules."));
        assert!(prompt.contains("summarize the following article:"));
        assert!(prompt.contains("Title: Understanding Ownership"));
        assert!(prompt.contains("Source: blog.example.com"));
        assert!(prompt.contains("Ownership rules."));
        assert!(prompt.contains("2-3 sentences"));
    }

    #[test]
    fn empty_body_uses_placeholder_text() {
        assert!(summary_prompt(&draft("")).contains("No content available"));
    }
}
