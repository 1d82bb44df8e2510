//! Platform probe trait and built-in probes for video pages.
//!
//! Probes refine what the generic extractor finds on platforms with a known
//! page structure. They are tried in priority order; `GenericProbe` is the
//! always-last fallback.

mod generic;
mod youtube;

use scraper::Html;
use url::Url;

pub use generic::GenericProbe;
pub use youtube::YouTubeProbe;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Video fields a platform probe can supply. `None` keeps the generic value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoDetails {
    pub title: Option<String>,
    /// Channel or uploader name, used as the draft source.
    pub channel: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
}

/// Trait for platform-specific video extraction.
pub trait PlatformProbe: Send + Sync {
    /// Whether this probe handles pages at `url`.
    fn detect(&self, url: &Url) -> bool;

    /// Pull platform-specific video fields out of the document.
    fn video_details(&self, doc: &Html) -> VideoDetails;

    /// Human-readable probe name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds registered probes in priority order.
pub struct ProbeRegistry {
    probes: Vec<Box<dyn PlatformProbe>>,
}

impl ProbeRegistry {
    /// Create a registry with all built-in probes (platform-specific first, generic last).
    pub fn new() -> Self {
        Self {
            probes: vec![Box::new(YouTubeProbe), Box::new(GenericProbe)],
        }
    }

    /// Pick the probe for `url`. Falls back to [`GenericProbe`].
    pub fn detect(&self, url: &Url) -> &dyn PlatformProbe {
        self.probes
            .iter()
            .find(|probe| probe.detect(url))
            .map(|probe| probe.as_ref())
            .unwrap_or(&GenericProbe)
    }
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
