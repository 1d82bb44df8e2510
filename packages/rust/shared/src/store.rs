//! Persisted local store: `{token, user, settings}`.
//!
//! The store is shared by the coordinator, the page observers and the review
//! session. Reads are served from memory; every mutation is written through
//! to `~/.readwatch/local.json` immediately.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ReadWatchError, Result};
use crate::types::{Settings, User};

/// On-disk shape of the local store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default)]
    pub settings: Settings,
}

impl LocalState {
    /// A non-empty token is stored.
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Write-through key/value store backing credentials and settings.
#[derive(Debug)]
pub struct LocalStore {
    path: Option<PathBuf>,
    state: RwLock<LocalState>,
}

impl LocalStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|e| ReadWatchError::io(&path, e))?;
            serde_json::from_str(&raw).map_err(|e| {
                ReadWatchError::parse(format!("failed to parse {}: {e}", path.display()))
            })?
        } else {
            debug!(?path, "local store not found, starting empty");
            LocalState::default()
        };

        Ok(Self {
            path: Some(path),
            state: RwLock::new(state),
        })
    }

    /// Open the store at its default location (`~/.readwatch/local.json`).
    pub fn open_default() -> Result<Self> {
        Self::open(crate::config::local_store_path()?)
    }

    /// A store that never touches disk.
    pub fn in_memory(state: LocalState) -> Self {
        Self {
            path: None,
            state: RwLock::new(state),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn snapshot(&self) -> LocalState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn settings(&self) -> Settings {
        self.state.read().unwrap_or_else(|e| e.into_inner()).settings
    }

    pub fn token(&self) -> Option<String> {
        self.snapshot().token.filter(|t| !t.is_empty())
    }

    pub fn user(&self) -> Option<User> {
        self.snapshot().user
    }

    pub fn is_authenticated(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_authenticated()
    }

    /// Store credentials after a successful login or registration.
    pub fn set_auth(&self, token: String, user: User) -> Result<()> {
        self.update(|state| {
            state.token = Some(token);
            state.user = Some(user);
        })
    }

    /// Forget credentials. Settings are kept.
    pub fn clear_auth(&self) -> Result<()> {
        self.update(|state| {
            state.token = None;
            state.user = None;
        })
    }

    pub fn set_settings(&self, settings: Settings) -> Result<()> {
        self.update(|state| state.settings = settings)
    }

    fn update(&self, mutate: impl FnOnce(&mut LocalState)) -> Result<()> {
        let snapshot = {
            let mut guard = self.state.write().unwrap_or_else(|e| e.into_inner());
            mutate(&mut guard);
            guard.clone()
        };
        self.persist(&snapshot)
    }

    fn persist(&self, state: &LocalState) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ReadWatchError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| ReadWatchError::parse(format!("failed to serialize local store: {e}")))?;
        std::fs::write(path, json).map_err(|e| ReadWatchError::io(path, e))?;
        debug!(?path, "local store written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("rw_store_{}", uuid::Uuid::now_v7()))
            .join("local.json")
    }

    fn user() -> User {
        User {
            id: "u1".into(),
            username: "ana".into(),
            email: None,
            profile_picture: None,
        }
    }

    #[test]
    fn mutations_are_written_immediately() {
        let path = temp_store_path();
        let store = LocalStore::open(&path).unwrap();
        assert!(!store.is_authenticated());

        store.set_auth("tok".into(), user()).unwrap();
        store
            .set_settings(Settings {
                auto_analyze: false,
                default_public: true,
            })
            .unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        assert!(reopened.is_authenticated());
        assert_eq!(reopened.user().unwrap().username, "ana");
        assert!(!reopened.settings().auto_analyze);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("autoAnalyze"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn logout_keeps_settings() {
        let store = LocalStore::in_memory(LocalState {
            token: Some("tok".into()),
            user: Some(user()),
            settings: Settings {
                auto_analyze: true,
                default_public: false,
            },
        });

        store.clear_auth().unwrap();
        assert!(!store.is_authenticated());
        assert!(store.token().is_none());
        assert!(!store.settings().default_public);
    }

    #[test]
    fn empty_token_is_not_authenticated() {
        let store = LocalStore::in_memory(LocalState {
            token: Some(String::new()),
            ..Default::default()
        });
        assert!(!store.is_authenticated());
    }
}
