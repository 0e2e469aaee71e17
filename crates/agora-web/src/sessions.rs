//! Bearer-token sessions
//!
//! Tokens are issued elsewhere; this registry only resolves them to an
//! `Identity`. The file format is TOML:
//!
//! ```toml
//! [[session]]
//! token = "alice-token"
//! user_id = "u-alice"
//! username = "alice"
//! avatar = "https://cdn.example/alice.png"
//!
//! [[session]]
//! token = "mod-token"
//! user_id = "u-mod"
//! username = "mod"
//! role = "moderator"
//! ```

use agora_core::{Identity, Role, UserId};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to read sessions file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid sessions file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Duplicate session token for user {0}")]
    DuplicateToken(String),
}

#[derive(Debug, Deserialize)]
struct SessionFile {
    #[serde(default)]
    session: Vec<SessionEntry>,
}

#[derive(Debug, Deserialize)]
struct SessionEntry {
    token: String,
    user_id: String,
    username: String,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(default)]
    role: Role,
}

/// token -> identity
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Identity>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SessionError> {
        let file: SessionFile = toml::from_str(content)?;
        let mut registry = Self::new();
        for entry in file.session {
            let identity = Identity {
                user_id: UserId::new(entry.user_id),
                username: entry.username,
                avatar: entry.avatar,
                role: entry.role,
            };
            if registry.sessions.contains_key(&entry.token) {
                return Err(SessionError::DuplicateToken(identity.user_id.to_string()));
            }
            registry.sessions.insert(entry.token, identity);
        }
        Ok(registry)
    }

    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let content = std::fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let registry = Self::from_toml_str(&content)?;
        info!("Loaded {} sessions from {}", registry.len(), path.display());
        Ok(registry)
    }

    pub fn insert(&mut self, token: impl Into<String>, identity: Identity) {
        self.sessions.insert(token.into(), identity);
    }

    pub fn with_session(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.insert(token, identity);
        self
    }

    pub fn resolve(&self, token: &str) -> Option<&Identity> {
        self.sessions.get(token)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
