//! Credential and session store backends.

pub mod memory;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error};

use crate::auth::SessionStore;

/// Spawn a background task that purges expired sessions on a fixed cadence.
///
/// Expired sessions are already invisible to `get`; this only reclaims space.
pub fn spawn_session_sweeper(
    sessions: Arc<dyn SessionStore>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    let interval = if interval.is_zero() {
        Duration::from_secs(1)
    } else {
        interval
    };

    tokio::spawn(async move {
        loop {
            sleep(interval).await;

            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => debug!("purged {removed} expired sessions"),
                Err(err) => error!("session sweep failed: {err:#}"),
            }
        }
    })
}
