//! Shared primitives for all Rust crates in Warden.

#![forbid(unsafe_code)]

/// Session primitives shared across services.
pub mod session;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use session::{SessionRole, UserSession};

/// Result type used across Warden crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A role with the same name already exists.
    #[error("duplicate name: {0}")]
    DuplicateName(String),

    /// Operation blocked because one or more policies reference the role.
    #[error("referenced in policy: {0}")]
    ReferencedInPolicy(String),

    /// Operation blocked because one or more other roles reference the role.
    #[error("referenced in role: {0}")]
    ReferencedInRole(String),

    /// Operation blocked because one or more security zones reference the role.
    #[error("referenced in zone: {0}")]
    ReferencedInZone(String),

    /// A role member names a user, group or role that does not exist.
    #[error("unknown principal: {0}")]
    UnknownPrincipal(String),

    /// The committed change could not advance its version counter.
    #[error("version bump failed: {0}")]
    VersionBumpFailed(String),

    /// User is not authenticated or not allowed to access a resource.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but blocked by authorization policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}
