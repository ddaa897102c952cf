//! Credential verification and session authorization.
//!
//! [`Authenticator`] holds no mutable state of its own; accounts and sessions
//! live behind the injected [`CredentialStore`] and [`SessionStore`], so one
//! instance is shared across all concurrent request handlers.

mod credentials;
mod error;
mod session;

pub use credentials::{
    Account, CredentialStore, Credentials, InsertOutcome, PasswordHasher, Registration,
};
pub use error::{AuthError, ConflictError, Error, ValidationError};
pub use session::{gate, Principal, SessionId, SessionState, SessionStore};

use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(Clone)]
pub struct Authenticator {
    credentials: Arc<dyn CredentialStore>,
    hasher: Arc<dyn PasswordHasher>,
    sessions: Arc<dyn SessionStore>,
}

impl Authenticator {
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        hasher: Arc<dyn PasswordHasher>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            credentials,
            hasher,
            sessions,
        }
    }

    #[must_use]
    pub fn credentials(&self) -> &dyn CredentialStore {
        self.credentials.as_ref()
    }

    #[must_use]
    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    /// Create an account. Leaves every session untouched.
    ///
    /// # Errors
    /// `Validation` for empty fields or a mismatched confirmation, `Conflict`
    /// when the username is taken, `Collaborator` on store or hashing failure.
    #[instrument(skip_all, fields(username = %registration.username))]
    pub async fn register(&self, registration: &Registration) -> Result<(), Error> {
        registration.validate()?;

        let existing = self
            .credentials
            .find(&registration.username)
            .await
            .map_err(Error::collaborator)?;
        if existing.is_some() {
            debug!("username already registered");
            return Err(ConflictError::DuplicateUsername.into());
        }

        let digest = self
            .hasher
            .hash(&registration.password)
            .await
            .map_err(Error::collaborator)?;

        match self
            .credentials
            .insert(&registration.username, &digest)
            .await
            .map_err(Error::collaborator)?
        {
            InsertOutcome::Inserted => {
                info!("account registered");
                Ok(())
            }
            // Lost a race against a concurrent registration for the same name.
            InsertOutcome::Conflict => Err(ConflictError::DuplicateUsername.into()),
        }
    }

    /// Verify credentials and mark the session authenticated.
    ///
    /// Always issues a fresh session id; a `current` id presented by the client
    /// is destroyed first. Returns the id the client must present from now on.
    /// On failure nothing is written.
    ///
    /// # Errors
    /// `Auth(NoSuchUser)` or `Auth(BadCredentials)`, which render identically
    /// to clients, or `Collaborator` on store or hashing failure.
    #[instrument(skip_all, fields(username = %credentials.username))]
    pub async fn login(
        &self,
        credentials: &Credentials,
        current: Option<&SessionId>,
    ) -> Result<SessionId, Error> {
        let account = self
            .credentials
            .find(&credentials.username)
            .await
            .map_err(Error::collaborator)?;

        let Some(account) = account else {
            self.hasher
                .verify_absent(&credentials.password)
                .await
                .map_err(Error::collaborator)?;
            debug!("login rejected: no-such-user");
            return Err(AuthError::NoSuchUser.into());
        };

        let ok = self
            .hasher
            .verify(&credentials.password, &account.password_hash)
            .await
            .map_err(Error::collaborator)?;
        if !ok {
            debug!("login rejected: bad-credentials");
            return Err(AuthError::BadCredentials.into());
        }

        // Never promote an id the client already held; it may have been planted.
        if let Some(previous) = current {
            self.sessions
                .destroy(previous)
                .await
                .map_err(Error::collaborator)?;
        }

        let id = self.sessions.create().await.map_err(Error::collaborator)?;
        if !self
            .sessions
            .set(&id, SessionState::authenticated(account.username))
            .await
            .map_err(Error::collaborator)?
        {
            return Err(Error::collaborator(anyhow::anyhow!(
                "freshly created session vanished before it was set"
            )));
        }
        info!("session authenticated");
        Ok(id)
    }

    /// Gate a protected action on the current session.
    ///
    /// # Errors
    /// `Auth(Unauthenticated)` when the session is missing, expired, destroyed
    /// or anonymous; `Collaborator` when the session store fails.
    #[instrument(skip_all)]
    pub async fn authorize(&self, session: Option<&SessionId>) -> Result<Principal, Error> {
        let state = match session {
            Some(id) => self.sessions.get(id).await.map_err(Error::collaborator)?,
            None => None,
        };
        gate(state.as_ref()).map_err(Error::from)
    }

    /// Destroy the session. Missing or already destroyed sessions are fine.
    ///
    /// # Errors
    /// `Collaborator` when the session store fails.
    #[instrument(skip_all)]
    pub async fn logout(&self, session: Option<&SessionId>) -> Result<(), Error> {
        let Some(id) = session else {
            return Ok(());
        };
        self.sessions
            .destroy(id)
            .await
            .map_err(Error::collaborator)?;
        info!("session destroyed");
        Ok(())
    }
}
