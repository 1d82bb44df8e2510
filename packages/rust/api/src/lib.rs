//! Client for the ReadWatch REST backend.
//!
//! Only the review step writes to the backend, through [`ContentApi::create_content`].
//! The remaining calls back the CLI's login and listing commands.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use readwatch_shared::{BackendConfig, ContentRecord, NewContent, ReadWatchError, Result, User};

/// User-Agent string for backend requests.
const USER_AGENT: &str = concat!("ReadWatch/", env!("CARGO_PKG_VERSION"));

/// Substring of the backend's duplicate rejection message.
const DUPLICATE_MARKER: &str = "already exists";

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The create-content operation the review step depends on.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// `POST /content`. A second save of the same URL fails with `DuplicateContent`.
    async fn create_content(&self, token: &str, content: &NewContent) -> Result<ContentRecord>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Successful login/registration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the backend API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReadWatchError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, route: &str) -> String {
        format!("{}{route}", self.base_url)
    }

    /// `POST /auth/login`.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let request = self
            .client
            .post(self.url("/auth/login"))
            .json(&LoginRequest { email, password });
        let auth: AuthResponse = send_json(request).await?;
        info!(username = %auth.user.username, "logged in");
        Ok(auth)
    }

    /// `POST /auth/register`.
    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<AuthResponse> {
        let request = self.client.post(self.url("/auth/register")).json(&RegisterRequest {
            username,
            email,
            password,
        });
        send_json(request).await
    }

    /// `GET /content/me`, newest first.
    pub async fn my_content(&self, token: &str) -> Result<Vec<ContentRecord>> {
        send_json(self.client.get(self.url("/content/me")).bearer_auth(token)).await
    }

    /// `GET /content/feed`: public items from followed users.
    pub async fn feed(&self, token: &str) -> Result<Vec<ContentRecord>> {
        send_json(self.client.get(self.url("/content/feed")).bearer_auth(token)).await
    }
}

#[async_trait]
impl ContentApi for ApiClient {
    #[instrument(skip_all, fields(url = %content.url, is_public = content.is_public))]
    async fn create_content(&self, token: &str, content: &NewContent) -> Result<ContentRecord> {
        let request = self
            .client
            .post(self.url("/content"))
            .bearer_auth(token)
            .json(content);
        let record: ContentRecord = send_json(request).await?;
        debug!(id = %record.id, "content created");
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

async fn send_json<T: serde::de::DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| ReadWatchError::Network(e.to_string()))?;
    let response = check_status(response).await?;
    response
        .json()
        .await
        .map_err(|e| ReadWatchError::parse(format!("invalid backend response: {e}")))
}

/// Map non-success statuses onto error variants, using the JSON `message` when present.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    Err(match status {
        StatusCode::BAD_REQUEST if message.contains(DUPLICATE_MARKER) => {
            ReadWatchError::DuplicateContent(message)
        }
        StatusCode::UNAUTHORIZED => ReadWatchError::Unauthenticated(message),
        _ => ReadWatchError::Api {
            status: status.as_u16(),
            message,
        },
    })
}
