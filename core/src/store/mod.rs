//! Application-facing state built on top of a `BlogBackend`.
//!
//! `AuthStore` owns the session and mirrors it into storage. `BlogStore`
//! keeps a cached view of posts and categories for listing and lookups.
//! Both report failures to the user as an `ActionResult` or an `ApiError`;
//! neither panics on backend errors.

mod auth;
mod blog;

pub use auth::AuthStore;
pub use blog::{BlogStore, RECENT_POSTS};

use serde::Serialize;

/// Outcome of a user action, ready to show as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
