//! Inference Engine contract and the local HTTP engine.
//!
//! The engine loads asynchronously and then turns prompts into text.
//! Readiness is monotonic: once [`InferenceEngine::load`] succeeds the engine
//! stays ready for the life of the process, and a failed load leaves it
//! permanently not ready.

pub mod loader;
pub mod openai;
pub mod prompt;

use async_trait::async_trait;

use readwatch_shared::Result;

pub use loader::ModelLoader;
pub use openai::OpenAiCompatEngine;
pub use prompt::{SUMMARY_FAILED, SUMMARY_UNAVAILABLE, summarize, summary_prompt};

/// Load progress callback, called with a fraction in `0.0..=1.0`.
pub type ProgressFn = dyn Fn(f32) + Send + Sync;

/// An opaque prompt → text capability.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Bring the engine up, reporting progress along the way.
    async fn load(&self, progress: &ProgressFn) -> Result<()>;

    /// Generate text for `prompt`. Fails with `NotReady` before a successful load.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Whether a load has completed successfully.
    fn is_ready(&self) -> bool;
}
