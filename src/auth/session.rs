//! Session identifiers, session state, and the session store seam.
//!
//! Flow Overview: the client holds an opaque [`SessionId`] in a cookie; the
//! server maps it to a [`SessionState`] value. Transitions never mutate a state
//! in place, they `set` a whole new value under the same id.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::fmt;

use super::error::AuthError;

const SESSION_ID_BYTES: usize = 32;

/// Opaque session token shared with the client. `Debug` never prints it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Draw a fresh id from the OS RNG.
    ///
    /// # Errors
    /// Returns an error if the OS RNG is unavailable.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .context("failed to generate session id")?;
        Ok(Self(Base64UrlUnpadded::encode_string(&bytes)))
    }

    /// Wrap a value presented by a client. Nothing is validated here; unknown
    /// ids simply resolve to no session.
    #[must_use]
    pub fn from_client(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// SHA-256 of the token, for stores that must not keep raw ids at rest.
    #[must_use]
    pub fn digest(&self) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        hasher.finalize().to_vec()
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionId(***)")
    }
}

/// Authentication state held server-side for one session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated { username: String },
}

impl SessionState {
    #[must_use]
    pub fn authenticated(username: impl Into<String>) -> Self {
        Self::Authenticated {
            username: username.into(),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { username } => Some(username),
        }
    }
}

/// Identity granted by the authorization gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
}

/// Permit if and only if the session is authenticated.
///
/// # Errors
/// Returns `AuthError::Unauthenticated` for a missing or anonymous session.
pub fn gate(state: Option<&SessionState>) -> Result<Principal, AuthError> {
    match state {
        Some(SessionState::Authenticated { username }) => Ok(Principal {
            username: username.clone(),
        }),
        Some(SessionState::Anonymous) | None => Err(AuthError::Unauthenticated),
    }
}

/// Server-side session storage keyed by [`SessionId`].
///
/// Entries expire after the store's configured lifetime; an expired or
/// destroyed id must never be returned by `get` again.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create an anonymous session and return its id.
    async fn create(&self) -> Result<SessionId>;

    async fn get(&self, id: &SessionId) -> Result<Option<SessionState>>;

    /// Replace the state of a live session. Returns `false` when the id is
    /// unknown or expired.
    async fn set(&self, id: &SessionId, state: SessionState) -> Result<bool>;

    /// Remove the session. Unknown ids are a no-op.
    async fn destroy(&self, id: &SessionId) -> Result<()>;

    /// Drop expired entries, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64>;

    /// Backend liveness for `/health`.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
