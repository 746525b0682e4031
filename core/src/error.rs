//! Error types for the blog admin client.
//!
//! # Design
//! Every failing operation returns an `ApiError`. The variants follow the
//! statuses callers branch on (`NotFound`, `Unauthorized`, `Validation`,
//! `Conflict`, `Timeout`); any other non-2xx response lands in `Http` with
//! the status and parsed body. Whatever the variant, `ApiError::envelope`
//! renders the same `{success:false, message, code, details?, timestamp}`
//! shape that a failing backend would have returned.

use serde_json::Value;
use thiserror::Error;

use crate::envelope::ErrorEnvelope;
use crate::storage::StorageError;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by backends, the HTTP client and the stores.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The transport could not complete the round-trip.
    #[error("{message}")]
    Network { message: String },

    /// The request did not finish within its timeout.
    #[error("request timeout")]
    Timeout,

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Unauthorized { message: String },

    #[error("{message}")]
    Validation { message: String },

    /// A unique field (slug) is already taken.
    #[error("{message}")]
    Conflict { message: String },

    /// Any other non-2xx response.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        details: Option<Value>,
    },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body did not match the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        ApiError::Network {
            message: message.into(),
        }
    }

    /// Map a failing status to its variant.
    pub fn from_status(status: u16, message: String, details: Option<Value>) -> Self {
        match status {
            400 => ApiError::Validation { message },
            401 => ApiError::Unauthorized { message },
            404 => ApiError::NotFound { message },
            408 => ApiError::Timeout,
            409 => ApiError::Conflict { message },
            _ => ApiError::Http {
                status,
                message,
                details,
            },
        }
    }

    /// Numeric code carried in the error envelope. Client-side failures
    /// that never reached a server use 0.
    pub fn code(&self) -> u16 {
        match self {
            ApiError::Network { .. } => 0,
            ApiError::Timeout => 408,
            ApiError::NotFound { .. } => 404,
            ApiError::Unauthorized { .. } => 401,
            ApiError::Validation { .. } => 400,
            ApiError::Conflict { .. } => 409,
            ApiError::Http { status, .. } => *status,
            ApiError::Serialization(_) | ApiError::Deserialization(_) => 0,
            ApiError::Storage(_) => 500,
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            ApiError::Http { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    /// Render as the uniform error envelope, stamped now.
    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope::new(self.to_string(), self.code(), self.details().cloned())
    }
}

impl From<&ApiError> for ErrorEnvelope {
    fn from(err: &ApiError) -> Self {
        err.envelope()
    }
}

/// Errors raised while assembling an application context.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid API base URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP transport could not be built: {0}")]
    Transport(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Api(#[from] ApiError),
}
