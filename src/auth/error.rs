//! Error taxonomy for auth transitions.
//!
//! Each error carries a stable `code()` for logs and a `public_message()` for
//! users. The two login failures (`NoSuchUser`, `BadCredentials`) share one
//! public message so responses never reveal whether an account exists.

use thiserror::Error;

pub(crate) const MSG_MISMATCH: &str = "Passwords do not match";
pub(crate) const MSG_EMPTY: &str = "Username and password are required";
pub(crate) const MSG_DUPLICATE: &str = "Username already exists";
pub(crate) const MSG_INVALID_CREDENTIALS: &str = "Invalid credentials";
pub(crate) const MSG_UNAUTHENTICATED: &str = "Please log in to view this page";
pub(crate) const MSG_INTERNAL: &str = "Something went wrong, please try again";

/// Malformed submission, correctable by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("password and confirmation differ")]
    Mismatch,
    #[error("username is empty")]
    EmptyUsername,
    #[error("password is empty")]
    EmptyPassword,
}

/// Registration collided with an existing account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConflictError {
    #[error("username already registered")]
    DuplicateUsername,
}

/// Credential or session check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no account for username")]
    NoSuchUser,
    #[error("password does not match stored digest")]
    BadCredentials,
    #[error("session is not authenticated")]
    Unauthenticated,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("conflict: {0}")]
    Conflict(#[from] ConflictError),
    #[error("auth failed: {0}")]
    Auth(#[from] AuthError),
    /// Store or hashing failure; fatal for the request and never retried.
    #[error("collaborator failed: {0:#}")]
    Collaborator(#[source] anyhow::Error),
}

impl Error {
    pub(crate) fn collaborator(err: anyhow::Error) -> Self {
        Self::Collaborator(err)
    }

    /// Stable identifier for logs and metrics.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::Mismatch) => "mismatch",
            Self::Validation(ValidationError::EmptyUsername) => "empty-username",
            Self::Validation(ValidationError::EmptyPassword) => "empty-password",
            Self::Conflict(ConflictError::DuplicateUsername) => "duplicate-username",
            Self::Auth(AuthError::NoSuchUser) => "no-such-user",
            Self::Auth(AuthError::BadCredentials) => "bad-credentials",
            Self::Auth(AuthError::Unauthenticated) => "unauthenticated",
            Self::Collaborator(_) => "collaborator",
        }
    }

    /// Message safe to show to the client.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::Mismatch) => MSG_MISMATCH,
            Self::Validation(ValidationError::EmptyUsername | ValidationError::EmptyPassword) => {
                MSG_EMPTY
            }
            Self::Conflict(ConflictError::DuplicateUsername) => MSG_DUPLICATE,
            Self::Auth(AuthError::NoSuchUser | AuthError::BadCredentials) => {
                MSG_INVALID_CREDENTIALS
            }
            Self::Auth(AuthError::Unauthenticated) => MSG_UNAUTHENTICATED,
            Self::Collaborator(_) => MSG_INTERNAL,
        }
    }

    #[must_use]
    pub fn is_collaborator(&self) -> bool {
        matches!(self, Self::Collaborator(_))
    }
}
