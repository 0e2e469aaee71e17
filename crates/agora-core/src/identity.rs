//! Authenticated caller identity
//!
//! Resolved at the session boundary and passed explicitly into the store and
//! the controllers. `None` where an `Option<&Identity>` is expected means the
//! caller is anonymous.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ReviewError};
use crate::types::UserId;

/// Caller role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
}

/// A signed-in marketplace user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl Identity {
    pub fn user(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            username: username.into(),
            avatar: None,
            role: Role::User,
        }
    }

    pub fn moderator(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            role: Role::Moderator,
            ..Self::user(user_id, username)
        }
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator
    }
}

/// Require a signed-in caller for a write path
pub fn require_identity(caller: Option<&Identity>) -> Result<&Identity> {
    caller.ok_or(ReviewError::Unauthenticated)
}
