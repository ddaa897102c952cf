use crate::{
    api::{self, ApiConfig, AppState},
    auth::{Authenticator, CredentialStore, SessionStore},
    hashing::{Argon2Hasher, Argon2Params},
    store::{
        memory::{MemoryCredentialStore, MemorySessionStore},
        postgres::{ensure_schema, PgCredentialStore, PgSessionStore},
        spawn_session_sweeper,
    },
};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub session_ttl_seconds: u64,
    pub session_sweep_interval_seconds: u64,
    pub cookie_secure: bool,
}

// The DSN may carry a password; keep it out of logs.
impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &self.dsn.as_ref().map(|_| "***"))
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field(
                "session_sweep_interval_seconds",
                &self.session_sweep_interval_seconds,
            )
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be
/// applied, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let session_ttl = Duration::from_secs(args.session_ttl_seconds);

    let (credentials, sessions): (Arc<dyn CredentialStore>, Arc<dyn SessionStore>) =
        if let Some(dsn) = &args.dsn {
            let pool = PgPoolOptions::new()
                .min_connections(1)
                .max_connections(5)
                .max_lifetime(Duration::from_secs(60 * 2))
                .test_before_acquire(true)
                .connect(dsn)
                .await
                .context("Failed to connect to database")?;

            ensure_schema(&pool)
                .await
                .context("Failed to apply database schema")?;

            info!("Using postgres credential and session stores");

            let credentials: Arc<dyn CredentialStore> =
                Arc::new(PgCredentialStore::new(pool.clone()));
            let sessions: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(pool, session_ttl));
            (credentials, sessions)
        } else {
            warn!("No DSN configured; accounts and sessions are kept in memory");

            let credentials: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
            let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(session_ttl));
            (credentials, sessions)
        };

    let hasher = Arc::new(
        Argon2Hasher::new(Argon2Params::default()).context("Failed to initialize password hasher")?,
    );

    spawn_session_sweeper(
        sessions.clone(),
        Duration::from_secs(args.session_sweep_interval_seconds),
    );

    let auth = Authenticator::new(credentials, hasher, sessions);
    let config = ApiConfig::new()
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_cookie_secure(args.cookie_secure);

    api::new(args.port, Arc::new(AppState::new(auth, config))).await
}
