use agora_core::Identity;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

use crate::state::AppState;

pub fn extract_auth_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("authorization").and_then(|v| v.to_str().ok())?;
    let bearer = raw.trim().strip_prefix("Bearer ")?;
    let token = bearer.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// The resolved caller. Missing or unknown tokens make the caller anonymous;
/// write paths then answer `UNAUTHENTICATED`.
#[derive(Debug, Clone)]
pub struct Caller(pub Option<Identity>);

impl Caller {
    pub fn identity(&self) -> Option<&Identity> {
        self.0.as_ref()
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_auth_token(&parts.headers) else {
            return Ok(Caller(None));
        };

        let identity = state.sessions.resolve(&token).cloned();
        if identity.is_none() {
            debug!("Unknown bearer token on {}", parts.uri.path());
        }
        Ok(Caller(identity))
    }
}
