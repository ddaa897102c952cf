//! Volatile stores that live for the lifetime of the process.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::auth::{Account, CredentialStore, InsertOutcome, SessionId, SessionState, SessionStore};

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find(&self, username: &str) -> Result<Option<Account>> {
        Ok(self.accounts.read().await.get(username).cloned())
    }

    async fn insert(&self, username: &str, password_hash: &str) -> Result<InsertOutcome> {
        // Check and write under one lock so concurrent inserts cannot both win.
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(username) {
            return Ok(InsertOutcome::Conflict);
        }
        accounts.insert(
            username.to_string(),
            Account {
                username: username.to_string(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(InsertOutcome::Inserted)
    }
}

#[derive(Debug)]
struct Entry {
    state: SessionState,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct MemorySessionStore {
    ttl: Duration,
    entries: RwLock<HashMap<SessionId, Entry>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Live and expired entries currently held.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self) -> Result<SessionId> {
        let expires_at = Instant::now()
            .checked_add(self.ttl)
            .ok_or_else(|| anyhow!("session lifetime of {:?} is out of range", self.ttl))?;
        let id = SessionId::generate()?;
        let entry = Entry {
            state: SessionState::Anonymous,
            expires_at,
        };
        self.entries.write().await.insert(id.clone(), entry);
        Ok(id)
    }

    async fn get(&self, id: &SessionId) -> Result<Option<SessionState>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(id)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.state.clone()))
    }

    async fn set(&self, id: &SessionId, state: SessionState) -> Result<bool> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(id) {
            Some(entry) if entry.expires_at > Instant::now() => {
                // Lifetime is fixed at creation; replacing state does not extend it.
                entry.state = state;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn destroy(&self, id: &SessionId) -> Result<()> {
        self.entries.write().await.remove(id);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(u64::try_from(before - entries.len()).unwrap_or(u64::MAX))
    }
}
