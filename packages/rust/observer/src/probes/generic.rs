//! Generic (fallback) probe. Always matches and adds nothing.

use scraper::Html;
use url::Url;

use super::{PlatformProbe, VideoDetails};

pub struct GenericProbe;

impl PlatformProbe for GenericProbe {
    fn detect(&self, _url: &Url) -> bool {
        true
    }

    fn video_details(&self, _doc: &Html) -> VideoDetails {
        VideoDetails::default()
    }

    fn name(&self) -> &str {
        "generic"
    }
}
