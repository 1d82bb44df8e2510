//! Article/video heuristics.
//!
//! Each flag is an OR of independent signals, so signal order never matters.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use readwatch_shared::Classification;

/// Paragraphs needed before the "long-form text" signal can fire.
const MIN_PARAGRAPHS: usize = 5;

/// At least one paragraph must be longer than this for the long-form signal.
const LONG_PARAGRAPH_CHARS: usize = 100;

/// Known video hosts: host suffix plus an optional required path fragment.
const VIDEO_HOSTS: &[(&str, Option<&str>)] = &[
    ("youtube.com", Some("watch")),
    ("vimeo.com", None),
    ("twitch.tv", None),
];

pub(crate) fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

static ARTICLE_TAG: LazyLock<Selector> = LazyLock::new(|| selector("article"));
static ARTICLE_PATTERNS: LazyLock<Selector> = LazyLock::new(|| {
    selector(
        r#"div.post, div.article, div.blog-post, [class*="article"], [class*="post"], [class*="blog"]"#,
    )
});
static VIDEO_TAG: LazyLock<Selector> = LazyLock::new(|| selector("video"));
pub(crate) static OG_TYPE: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[property="og:type"]"#));
pub(crate) static MAIN: LazyLock<Selector> = LazyLock::new(|| selector("main"));
pub(crate) static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));
pub(crate) static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| selector("p"));

/// Classify a page.
pub fn classify(doc: &Html, url: &Url) -> Classification {
    Classification {
        is_article: is_article(doc),
        is_video: is_video(doc, url),
    }
}

fn is_article(doc: &Html) -> bool {
    let has_article_tag = doc.select(&ARTICLE_TAG).next().is_some();
    let has_article_pattern = doc.select(&ARTICLE_PATTERNS).next().is_some();
    let og_article = og_type_contains(doc, "article");

    has_article_tag || has_article_pattern || og_article || has_long_form_text(doc)
}

fn is_video(doc: &Html, url: &Url) -> bool {
    let has_video_tag = doc.select(&VIDEO_TAG).next().is_some();

    has_video_tag || is_known_video_url(url) || og_type_contains(doc, "video")
}

/// More than [`MIN_PARAGRAPHS`] paragraphs inside `main` (or the body), one of
/// them longer than [`LONG_PARAGRAPH_CHARS`].
fn has_long_form_text(doc: &Html) -> bool {
    let scope = doc
        .select(&MAIN)
        .next()
        .or_else(|| doc.select(&BODY).next());
    let Some(scope) = scope else {
        return false;
    };

    let mut count = 0;
    let mut has_long = false;
    for p in scope.select(&PARAGRAPH) {
        count += 1;
        if !has_long {
            has_long = p.text().map(|t| t.chars().count()).sum::<usize>() > LONG_PARAGRAPH_CHARS;
        }
    }

    count > MIN_PARAGRAPHS && has_long
}

fn og_type_contains(doc: &Html, needle: &str) -> bool {
    doc.select(&OG_TYPE)
        .filter_map(|el| el.value().attr("content"))
        .any(|content| content.contains(needle))
}

/// Whether the URL is a watch page on a known video host.
pub fn is_known_video_url(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };

    VIDEO_HOSTS.iter().any(|(suffix, path_fragment)| {
        let host_matches = host == *suffix || host.ends_with(&format!(".{suffix}"));
        host_matches && path_fragment.is_none_or(|frag| url.path().contains(frag))
    })
}
