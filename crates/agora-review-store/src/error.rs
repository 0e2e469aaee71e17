use agora_core::ReviewError;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Corrupt review record: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Review(#[from] ReviewError),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    pub fn code(&self) -> agora_core::ErrorCode {
        match self {
            StoreError::Review(e) => e.code(),
            _ => agora_core::ErrorCode::Unknown,
        }
    }
}

impl From<StoreError> for ReviewError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Review(e) => e,
            other => {
                error!("Review store failure: {}", other);
                ReviewError::unknown(other.to_string())
            }
        }
    }
}
