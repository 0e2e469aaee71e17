//! Error taxonomy shared by the review store, the HTTP surface and the
//! client controllers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Client-observable review errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("{0}")]
    Validation(String),

    #[error("You have already reviewed this agent")]
    Duplicate { agent_id: String },

    #[error("Please log in to continue")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    Unknown(String),
}

/// Result type alias using ReviewError
pub type Result<T> = std::result::Result<T, ReviewError>;

/// Stable machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    DuplicateReview,
    Unauthenticated,
    Forbidden,
    NotFound,
    Network,
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::DuplicateReview => "DUPLICATE_REVIEW",
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Network => "NETWORK",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire shape of an error: `{ "error": { "code": ..., "message": ... } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, rename = "agentId", skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

impl ReviewError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ReviewError::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ReviewError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ReviewError::NotFound(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        ReviewError::Network(msg.into())
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        ReviewError::Unknown(msg.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ReviewError::Validation(_) => ErrorCode::ValidationError,
            ReviewError::Duplicate { .. } => ErrorCode::DuplicateReview,
            ReviewError::Unauthenticated => ErrorCode::Unauthenticated,
            ReviewError::Forbidden(_) => ErrorCode::Forbidden,
            ReviewError::NotFound(_) => ErrorCode::NotFound,
            ReviewError::Network(_) => ErrorCode::Network,
            ReviewError::Unknown(_) => ErrorCode::Unknown,
        }
    }

    /// Transport-level failures may be retried by resubmitting
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReviewError::Network(_) | ReviewError::Unknown(_))
    }

    pub fn to_envelope(&self) -> ErrorEnvelope {
        let agent_id = match self {
            ReviewError::Duplicate { agent_id } => Some(agent_id.clone()),
            _ => None,
        };
        ErrorEnvelope {
            error: ErrorBody {
                code: self.code().as_str().to_string(),
                message: self.to_string(),
                agent_id,
            },
        }
    }

    /// Rebuild an error from its wire shape. Unrecognized codes become `Unknown`.
    pub fn from_envelope(envelope: ErrorEnvelope) -> Self {
        let ErrorBody {
            code,
            message,
            agent_id,
        } = envelope.error;
        match code.as_str() {
            "VALIDATION_ERROR" => ReviewError::Validation(message),
            "DUPLICATE_REVIEW" => ReviewError::Duplicate {
                agent_id: agent_id.unwrap_or_default(),
            },
            "UNAUTHENTICATED" => ReviewError::Unauthenticated,
            "FORBIDDEN" => ReviewError::Forbidden(message),
            "NOT_FOUND" => ReviewError::NotFound(message),
            "NETWORK" => ReviewError::Network(message),
            _ => ReviewError::Unknown(message),
        }
    }
}

impl From<serde_json::Error> for ReviewError {
    fn from(err: serde_json::Error) -> Self {
        ReviewError::Unknown(format!("Serialization error: {}", err))
    }
}
