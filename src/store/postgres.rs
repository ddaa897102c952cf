//! Durable stores on Postgres.
//!
//! Session tokens never touch the database in raw form: rows are keyed by the
//! SHA-256 of the token, and a lookup hashes the presented cookie first.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Connection, PgPool, Row};
use std::time::Duration;
use tracing::{info_span, Instrument};

use crate::auth::{Account, CredentialStore, InsertOutcome, SessionId, SessionState, SessionStore};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

/// Apply `sql/schema.sql`. Every statement is `IF NOT EXISTS`, so this is safe
/// on each start.
///
/// # Errors
/// Returns an error if a statement fails.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
    }
    Ok(())
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

async fn ping(pool: &PgPool) -> Result<()> {
    let span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
    let mut conn = pool
        .acquire()
        .await
        .context("failed to acquire database connection")?;
    conn.ping()
        .instrument(span)
        .await
        .context("failed to ping database")
}

#[derive(Clone, Debug)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find(&self, username: &str) -> Result<Option<Account>> {
        let query = "SELECT username, password_hash FROM accounts WHERE username = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup account")?;

        Ok(row.map(|row| Account {
            username: row.get("username"),
            password_hash: row.get("password_hash"),
        }))
    }

    async fn insert(&self, username: &str, password_hash: &str) -> Result<InsertOutcome> {
        // The primary key serializes concurrent registrations; the loser writes nothing.
        let query = r"
            INSERT INTO accounts (username, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (username) DO NOTHING
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert account")?;

        Ok(if result.rows_affected() == 1 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::Conflict
        })
    }

    async fn ping(&self) -> Result<()> {
        ping(&self.pool).await
    }
}

#[derive(Clone, Debug)]
pub struct PgSessionStore {
    pool: PgPool,
    ttl: Duration,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    fn ttl_seconds(&self) -> i64 {
        i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX)
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self) -> Result<SessionId> {
        let query = r"
            INSERT INTO sessions (session_hash, username, expires_at)
            VALUES ($1, NULL, NOW() + ($2 * INTERVAL '1 second'))
            ON CONFLICT (session_hash) DO NOTHING
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );

        // A collision on 256 random bits is not expected; retry a few times anyway.
        for _ in 0..3 {
            let id = SessionId::generate()?;
            let result = sqlx::query(query)
                .bind(id.digest())
                .bind(self.ttl_seconds())
                .execute(&self.pool)
                .instrument(span.clone())
                .await
                .context("failed to insert session")?;
            if result.rows_affected() == 1 {
                return Ok(id);
            }
        }

        Err(anyhow::anyhow!("failed to generate unique session id"))
    }

    async fn get(&self, id: &SessionId) -> Result<Option<SessionState>> {
        let query = r"
            SELECT username
            FROM sessions
            WHERE session_hash = $1
              AND expires_at > NOW()
            LIMIT 1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id.digest())
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup session")?;

        Ok(row.map(|row| {
            let username: Option<String> = row.get("username");
            username.map_or(SessionState::Anonymous, SessionState::authenticated)
        }))
    }

    async fn set(&self, id: &SessionId, state: SessionState) -> Result<bool> {
        let query = r"
            UPDATE sessions
            SET username = $2
            WHERE session_hash = $1
              AND expires_at > NOW()
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id.digest())
            .bind(state.username())
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update session")?;

        Ok(result.rows_affected() == 1)
    }

    async fn destroy(&self, id: &SessionId) -> Result<()> {
        // Logout is idempotent; it's fine if no rows are deleted.
        let query = "DELETE FROM sessions WHERE session_hash = $1";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(id.digest())
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete session")?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let query = "DELETE FROM sessions WHERE expires_at <= NOW()";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to purge expired sessions")?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        ping(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_splits_into_statements() {
        let statements = split_sql_statements(SCHEMA_SQL);
        assert_eq!(statements.len(), 3);
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS accounts"));
        assert!(statements[1].starts_with("CREATE TABLE IF NOT EXISTS sessions"));
        assert!(statements
            .iter()
            .all(|statement| !statement.contains("--") && statement.ends_with(';')));
    }

    #[test]
    fn split_keeps_trailing_statement_without_semicolon() {
        let statements = split_sql_statements("SELECT 1;\n-- note\nSELECT 2");
        assert_eq!(statements, vec!["SELECT 1;".to_string(), "SELECT 2".to_string()]);
    }

    // Needs a reachable database: GATEHOUSE_TEST_DSN=postgres://... cargo test -- --ignored
    async fn test_pool() -> Result<PgPool> {
        let dsn = std::env::var("GATEHOUSE_TEST_DSN")
            .context("GATEHOUSE_TEST_DSN must be set for database tests")?;
        let pool = PgPool::connect(&dsn).await?;
        ensure_schema(&pool).await?;
        Ok(pool)
    }

    #[tokio::test]
    #[ignore]
    async fn duplicate_username_is_a_conflict() -> Result<()> {
        let store = PgCredentialStore::new(test_pool().await?);
        let username = format!("user-{}", ulid::Ulid::new());

        assert_eq!(store.insert(&username, "first").await?, InsertOutcome::Inserted);
        assert_eq!(store.insert(&username, "second").await?, InsertOutcome::Conflict);

        let account = store.find(&username).await?.context("account missing")?;
        assert_eq!(account.password_hash, "first");
        assert!(store.find(&username.to_uppercase()).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    #[ignore]
    async fn session_lifecycle() -> Result<()> {
        let store = PgSessionStore::new(test_pool().await?, Duration::from_secs(600));
        let id = store.create().await?;
        assert_eq!(store.get(&id).await?, Some(SessionState::Anonymous));

        let state = SessionState::authenticated("alice".to_string());
        assert!(store.set(&id, state.clone()).await?);
        assert_eq!(store.get(&id).await?, Some(state));

        store.destroy(&id).await?;
        assert_eq!(store.get(&id).await?, None);
        assert!(!store.set(&id, SessionState::Anonymous).await?);
        store.destroy(&id).await?;
        Ok(())
    }

    #[tokio::test]
    #[ignore]
    async fn expired_sessions_are_absent_and_purged() -> Result<()> {
        let store = PgSessionStore::new(test_pool().await?, Duration::from_secs(1));
        let id = store.create().await?;
        assert!(store.set(&id, SessionState::authenticated("bob".to_string())).await?);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(store.get(&id).await?, None);
        assert!(!store.set(&id, SessionState::Anonymous).await?);
        assert!(store.purge_expired().await? >= 1);
        Ok(())
    }
}
