//! Shared handler state and HTTP-facing configuration.

use crate::auth::Authenticator;

const DEFAULT_SESSION_TTL_SECONDS: u64 = 12 * 60 * 60;

#[derive(Clone, Debug)]
pub struct ApiConfig {
    session_ttl_seconds: u64,
    cookie_secure: bool,
}

impl ApiConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            cookie_secure: false,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds
    }

    /// Only mark cookies `Secure` when the site is served over HTTPS.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AppState {
    auth: Authenticator,
    config: ApiConfig,
}

impl AppState {
    #[must_use]
    pub fn new(auth: Authenticator, config: ApiConfig) -> Self {
        Self { auth, config }
    }

    #[must_use]
    pub fn auth(&self) -> &Authenticator {
        &self.auth
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}
