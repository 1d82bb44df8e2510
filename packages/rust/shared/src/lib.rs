//! Shared types, error model, configuration and local store for ReadWatch.
//!
//! This crate is the foundation depended on by all other ReadWatch crates.
//! It provides:
//! - [`ReadWatchError`] — the unified error type
//! - Domain types ([`ContentDraft`], [`Classification`], [`Settings`], [`TabId`])
//! - Configuration ([`AppConfig`], config loading)
//! - The persisted [`LocalStore`] holding `{token, user, settings}`

pub mod config;
pub mod error;
pub mod store;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BackendConfig, CoordinatorConfig, InferenceConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, local_store_path,
};
pub use error::{ReadWatchError, Result};
pub use store::{LocalState, LocalStore};
pub use types::{
    Classification, ContentDraft, ContentRecord, ContentType, MAX_TEXT_CONTENT_CHARS, NewContent,
    Notification, PageIdentity, Settings, TabId, TabMarker, User, is_web_url,
};
