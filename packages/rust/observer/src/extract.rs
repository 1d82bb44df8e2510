//! Draft extraction from a DOM snapshot.
//!
//! Precedence rules:
//! - title: `og:title` > first `<h1>` > `<title>` (> the URL itself)
//! - thumbnail: `og:image` > platform probe > none
//! - body: paragraphs longer than 30 characters, blank-line separated,
//!   hard-capped at [`MAX_TEXT_CONTENT_CHARS`]

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use readwatch_shared::{ContentDraft, ContentType, MAX_TEXT_CONTENT_CHARS};

use crate::classify::{BODY, MAIN, PARAGRAPH, selector};
use crate::probes::ProbeRegistry;

/// Paragraphs at or below this length are navigation crumbs, captions, etc.
const MIN_PARAGRAPH_CHARS: usize = 30;

static OG_TITLE: LazyLock<Selector> = LazyLock::new(|| selector(r#"meta[property="og:title"]"#));
static OG_IMAGE: LazyLock<Selector> = LazyLock::new(|| selector(r#"meta[property="og:image"]"#));
static H1: LazyLock<Selector> = LazyLock::new(|| selector("h1"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static ARTICLE_CONTAINER: LazyLock<Selector> = LazyLock::new(|| selector("article"));
static POST_CONTAINER: LazyLock<Selector> = LazyLock::new(|| selector("div.post, div.article"));

/// Build draft fields for the page, extracting as `content_type`.
pub fn extract(
    doc: &Html,
    url: &Url,
    content_type: ContentType,
    probes: &ProbeRegistry,
) -> ContentDraft {
    let mut title = extract_title(doc).unwrap_or_else(|| url.to_string());
    let mut source = source_from_url(url);
    let mut thumbnail = meta_content(doc, &OG_IMAGE);

    let text = match content_type {
        ContentType::Article => article_text(doc),
        ContentType::Video => {
            let probe = probes.detect(url);
            let details = probe.video_details(doc);
            debug!(probe = probe.name(), %url, "video probe selected");

            if let Some(t) = details.title {
                title = t;
            }
            if let Some(channel) = details.channel {
                source = channel;
            }
            if thumbnail.is_none() {
                thumbnail = details.thumbnail;
            }
            details.description.unwrap_or_default()
        }
    };

    ContentDraft {
        url: url.to_string(),
        title,
        content_type,
        source,
        thumbnail,
        text_content: truncate_chars(&text, MAX_TEXT_CONTENT_CHARS),
        summary: None,
    }
}

/// Cut `text` to at most `max` characters, never splitting a character.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

fn extract_title(doc: &Html) -> Option<String> {
    meta_content(doc, &OG_TITLE)
        .or_else(|| first_text(doc, &H1))
        .or_else(|| document_title(doc))
}

/// The `<title>` text, as a browser shows it on the tab.
pub fn document_title(doc: &Html) -> Option<String> {
    first_text(doc, &TITLE)
}

/// Host without a leading `www.`.
pub fn source_from_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

fn article_text(doc: &Html) -> String {
    let container = [&*ARTICLE_CONTAINER, &*POST_CONTAINER, &*MAIN, &*BODY]
        .into_iter()
        .find_map(|sel| doc.select(sel).next());

    let Some(container) = container else {
        return String::new();
    };

    container
        .select(&PARAGRAPH)
        .map(|p| element_text(&p))
        .filter(|text| text.chars().count() > MIN_PARAGRAPH_CHARS)
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub(crate) fn meta_content(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

pub(crate) fn first_text(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel)
        .next()
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
}

pub(crate) fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}
