//! Background model loading.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::InferenceEngine;

/// Loads an engine off the caller's task and reports the outcome once.
pub struct ModelLoader;

impl ModelLoader {
    /// Spawn the load. `on_progress` sees fractions in `0.0..=1.0`;
    /// `on_ready` is called exactly once with the final readiness.
    ///
    /// A failed load is logged and reported as `false`; there is no retry.
    pub fn spawn<P, R>(engine: Arc<dyn InferenceEngine>, on_progress: P, on_ready: R) -> JoinHandle<bool>
    where
        P: Fn(f32) + Send + Sync + 'static,
        R: FnOnce(bool) + Send + 'static,
    {
        tokio::spawn(async move {
            let report = move |fraction: f32| on_progress(fraction.clamp(0.0, 1.0));
            let ready = match engine.load(&report).await {
                Ok(()) => {
                    info!("model loaded");
                    true
                }
                Err(e) => {
                    warn!(error = %e, "model failed to load; summaries will be unavailable");
                    false
                }
            };
            on_ready(ready);
            ready
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use readwatch_shared::{ReadWatchError, Result};

    use super::*;
    use crate::ProgressFn;

    struct FixedEngine {
        succeed: bool,
        ready: AtomicBool,
    }

    #[async_trait]
    impl InferenceEngine for FixedEngine {
        async fn load(&self, progress: &ProgressFn) -> Result<()> {
            progress(2.0);
            if self.succeed {
                self.ready.store(true, Ordering::SeqCst);
                Ok(())
            } else {
                Err(ReadWatchError::ModelLoad("no weights".into()))
            }
        }

        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(String::new())
        }

        fn is_ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn reports_success_once() {
        let engine = Arc::new(FixedEngine {
            succeed: true,
            ready: AtomicBool::new(false),
        });
        let (tx, rx) = tokio::sync::oneshot::channel();
        let handle = ModelLoader::spawn(
            engine,
            |p| assert!(p <= 1.0),
            move |ready| {
                let _ = tx.send(ready);
            },
        );

        assert!(handle.await.unwrap());
        assert!(rx.await.unwrap());
    }

    #[tokio::test]
    async fn failure_reports_not_ready() {
        let engine = Arc::new(FixedEngine {
            succeed: false,
            ready: AtomicBool::new(false),
        });
        let handle = ModelLoader::spawn(engine, |_| {}, |ready| assert!(!ready));
        assert!(!handle.await.unwrap());
    }
}
