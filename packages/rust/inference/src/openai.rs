//! OpenAI-compatible local engine (Ollama, llama.cpp server, LM Studio, ...).
//!
//! `load` confirms the server is up and exposes the configured model;
//! `generate` posts a single-turn chat completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use readwatch_shared::{InferenceConfig, ReadWatchError, Result};

use crate::{InferenceEngine, ProgressFn};

/// User-Agent string for inference requests.
const USER_AGENT: &str = concat!("ReadWatch/", env!("CARGO_PKG_VERSION"));

/// Upper bound on generated tokens; a 2-3 sentence summary fits well inside.
const MAX_TOKENS: u32 = 256;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Engine backed by a local OpenAI-compatible HTTP server.
pub struct OpenAiCompatEngine {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    ready: AtomicBool,
}

impl OpenAiCompatEngine {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReadWatchError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key(),
            ready: AtomicBool::new(false),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl InferenceEngine for OpenAiCompatEngine {
    #[instrument(skip_all, fields(base_url = %self.base_url, model = %self.model))]
    async fn load(&self, progress: &ProgressFn) -> Result<()> {
        progress(0.0);

        let url = format!("{}/models", self.base_url);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| ReadWatchError::ModelLoad(format!("{url}: {e}")))?;

        if !response.status().is_success() {
            return Err(ReadWatchError::ModelLoad(format!(
                "{url}: HTTP {}",
                response.status()
            )));
        }
        progress(0.5);

        let models: ModelList = response
            .json()
            .await
            .map_err(|e| ReadWatchError::ModelLoad(format!("invalid model list: {e}")))?;

        if !models.data.iter().any(|m| m.id == self.model) {
            return Err(ReadWatchError::ModelLoad(format!(
                "model '{}' is not served at {}",
                self.model, self.base_url
            )));
        }

        self.ready.store(true, Ordering::Release);
        progress(1.0);
        info!("inference engine ready");
        Ok(())
    }

    #[instrument(skip_all, fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        if !self.is_ready() {
            return Err(ReadWatchError::NotReady);
        }

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.3,
            max_tokens: MAX_TOKENS,
            stream: false,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .authorize(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(|e| ReadWatchError::Inference(format!("{url}: {e}")))?;

        if !response.status().is_success() {
            return Err(ReadWatchError::Inference(format!(
                "{url}: HTTP {}",
                response.status()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ReadWatchError::Inference(format!("invalid completion: {e}")))?;

        let text = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| ReadWatchError::Inference("completion had no choices".into()))?;

        debug!(summary_len = text.len(), "generation complete");
        Ok(text)
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}
