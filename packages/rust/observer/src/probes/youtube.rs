//! YouTube watch-page probe.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use super::{PlatformProbe, VideoDetails};
use crate::classify::selector;
use crate::extract::first_text;

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| selector(".title .ytd-video-primary-info-renderer"));
static CHANNEL: LazyLock<Selector> = LazyLock::new(|| selector(".ytd-channel-name a"));
static DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| selector("#description-text"));
static CUED_THUMBNAIL: LazyLock<Selector> =
    LazyLock::new(|| selector(".ytp-cued-thumbnail-overlay-image"));

/// `background-image: url("...")` inside an inline style.
static BACKGROUND_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"background-image\s*:\s*url\(\s*["']?([^"')]+)["']?\s*\)"#)
        .expect("static regex is valid")
});

/// Detects YouTube pages and reads the player/metadata markup.
pub struct YouTubeProbe;

impl PlatformProbe for YouTubeProbe {
    fn detect(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|h| h == "youtube.com" || h.ends_with(".youtube.com"))
    }

    fn video_details(&self, doc: &Html) -> VideoDetails {
        VideoDetails {
            title: first_text(doc, &TITLE),
            channel: first_text(doc, &CHANNEL),
            description: first_text(doc, &DESCRIPTION),
            thumbnail: cued_thumbnail(doc),
        }
    }

    fn name(&self) -> &str {
        "youtube"
    }
}

fn cued_thumbnail(doc: &Html) -> Option<String> {
    let style = doc.select(&CUED_THUMBNAIL).next()?.value().attr("style")?;
    BACKGROUND_IMAGE
        .captures(style)
        .map(|caps| caps[1].trim().to_string())
        .filter(|src| !src.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_player_markup() {
        let html = r#"<html><body>
            <h1 class="title"><span class="ytd-video-primary-info-renderer">Rust in 100 Seconds</span></h1>
            <div class="ytd-channel-name"><a href="/@fireship">Fireship</a></div>
            <div id="description-text"> Rust explained quickly. </div>
            <div class="ytp-cued-thumbnail-overlay-image"
                 style="background-image: url(&quot;https://i.ytimg.com/vi/abc/hq.jpg&quot;);"></div>
        </body></html>"#;

        let details = YouTubeProbe.video_details(&Html::parse_document(html));
        assert_eq!(details.title.as_deref(), Some("Rust in 100 Seconds"));
        assert_eq!(details.channel.as_deref(), Some("Fireship"));
        assert_eq!(details.description.as_deref(), Some("Rust explained quickly."));
        assert_eq!(
            details.thumbnail.as_deref(),
            Some("https://i.ytimg.com/vi/abc/hq.jpg")
        );
    }

    #[test]
    fn missing_markup_yields_nothing() {
        let details = YouTubeProbe.video_details(&Html::parse_document("<html></html>"));
        assert_eq!(details, VideoDetails::default());
    }
}
