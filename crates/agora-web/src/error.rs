//! Error responses
//!
//! Every failure leaves the server as `{"error": {"code", "message"}}`.
//! Infrastructure failures are reported as `INTERNAL` without detail.

use agora_core::{ErrorCode, ErrorEnvelope, ReviewError};
use agora_review_store::StoreError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

pub const INTERNAL_CODE: &str = "INTERNAL";

#[derive(Debug)]
pub struct ApiError(pub ReviewError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.code() {
            ErrorCode::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::DuplicateReview => StatusCode::CONFLICT,
            ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Network | ErrorCode::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let mut envelope = self.0.to_envelope();
        if self.status().is_server_error() {
            envelope.error.code = INTERNAL_CODE.to_string();
            envelope.error.message = "Internal server error".to_string();
        }
        envelope
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (status, Json(self.envelope())).into_response()
    }
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        Self(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ReviewError::validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(ReviewError::validation(rejection.body_text()))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
