//! Client error types

use thiserror::Error;

use crate::storage::StorageError;

/// Client error type.
///
/// The taxonomy matters to callers: [`ClientError::is_transient`] separates
/// failures that are safe to retry (connectivity, timeouts, 5xx) from
/// business rejections that need different copy and no retry.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected before any network call (bad quantity, missing field)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transient network failure (timeout, connectivity); safe to retry
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Server-side failure (5xx)
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Business rejection (insufficient stock, duplicate email, ...)
    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Authentication required or session expired
    #[error("Authentication required")]
    Unauthorized,

    /// Permission denied
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// 2xx response violating the contract
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Local store failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// True for failures where a retry of the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Server { .. })
    }

    /// True for business rejections that need specific messaging.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Validation(_))
    }

    /// Shorthand for a business rejection with custom copy.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
