//! Accounts, credential submissions, and the collaborator seams the core
//! consults for them.

use anyhow::Result;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::error::ValidationError;

/// Persisted username and password digest. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub password_hash: String,
}

/// Login submission. Lives for one evaluation only.
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Registration submission; `confirmation` is checked only when present.
#[derive(Debug)]
pub struct Registration {
    pub username: String,
    pub password: SecretString,
    pub confirmation: Option<SecretString>,
}

impl Registration {
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        password: impl Into<SecretString>,
        confirmation: Option<SecretString>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            confirmation,
        }
    }

    /// Reject empty fields, then a confirmation that differs from the password.
    pub(super) fn validate(&self) -> Result<(), ValidationError> {
        if self.username.is_empty() {
            return Err(ValidationError::EmptyUsername);
        }
        if self.password.expose_secret().is_empty() {
            return Err(ValidationError::EmptyPassword);
        }
        if let Some(confirmation) = &self.confirmation {
            if confirmation.expose_secret() != self.password.expose_secret() {
                return Err(ValidationError::Mismatch);
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Conflict,
}

/// Durable mapping from username to password digest.
///
/// `insert` must be atomic: a concurrent `find` never observes a half-written
/// account, and two inserts for one username yield exactly one `Inserted`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find(&self, username: &str) -> Result<Option<Account>>;

    async fn insert(&self, username: &str, password_hash: &str) -> Result<InsertOutcome>;

    /// Backend liveness for `/health`.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// One-way password hashing with a fresh salt per call.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, plaintext: &SecretString) -> Result<String>;

    /// Must compare in constant time.
    async fn verify(&self, plaintext: &SecretString, digest: &str) -> Result<bool>;

    /// Spend the same effort as `verify` when no digest exists, so an unknown
    /// username costs as much as a wrong password.
    async fn verify_absent(&self, _plaintext: &SecretString) -> Result<()> {
        Ok(())
    }
}
