// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory session store.
//!
//! Keeps the same semantics as Redis: every record has an expiry and reads
//! treat an expired record as absent. Suitable for a single gateway process
//! in development and for tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{session_key, SessionStore, StoreResult};

#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    records: Arc<RwLock<HashMap<String, Instant>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an active session, as the credential issuer would.
    pub async fn insert_session(&self, session_id: &str, ttl: Duration) {
        let mut records = self.records.write().await;
        records.insert(session_key(session_id), Instant::now() + ttl);
    }

    /// Delete a session, as logout would.
    pub async fn revoke_session(&self, session_id: &str) -> bool {
        let mut records = self.records.write().await;
        records.remove(&session_key(session_id)).is_some()
    }

    /// Remaining lifetime of a record, `None` if absent or expired.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let records = self.records.read().await;
        records
            .get(key)
            .and_then(|expires_at| expires_at.checked_duration_since(Instant::now()))
            .filter(|remaining| !remaining.is_zero())
    }

    /// Drop expired records.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, expires_at| *expires_at > now);
        before - records.len()
    }
}

/// Default interval between sweeps of expired records.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Drop expired records every `interval` until shutdown.
///
/// Expired records already read as absent; the sweep only bounds memory.
pub fn spawn_purge_task(
    store: InMemorySessionStore,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let purged = store.purge_expired().await;
                    if purged > 0 {
                        debug!(target: "gateway.session", purged, "Purged expired sessions");
                    }
                }
                _ = shutdown.cancelled() => {
                    info!(target: "gateway.session", "Session purge task shutting down");
                    return;
                }
            }
        }
    })
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.ttl(key).await.is_some())
    }

    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        let now = Instant::now();
        let mut records = self.records.write().await;
        // EXPIRE on a missing key is a no-op.
        if let Some(expires_at) = records.get_mut(key) {
            if *expires_at > now {
                *expires_at = now + ttl;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inserted_session_exists() {
        let store = InMemorySessionStore::new();
        store.insert_session("abc", Duration::from_secs(60)).await;

        assert!(store.exists("session:abc").await.unwrap());
        assert!(!store.exists("session:other").await.unwrap());
    }

    #[tokio::test]
    async fn revoked_session_is_gone() {
        let store = InMemorySessionStore::new();
        store.insert_session("abc", Duration::from_secs(60)).await;

        assert!(store.revoke_session("abc").await);
        assert!(!store.exists("session:abc").await.unwrap());
        assert!(!store.revoke_session("abc").await);
    }

    #[tokio::test]
    async fn expired_session_reads_as_absent() {
        let store = InMemorySessionStore::new();
        store.insert_session("abc", Duration::from_millis(1)).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!store.exists("session:abc").await.unwrap());
        assert_eq!(store.purge_expired().await, 1);
    }

    #[tokio::test]
    async fn refresh_extends_ttl() {
        let store = InMemorySessionStore::new();
        store.insert_session("abc", Duration::from_secs(5)).await;

        store
            .refresh_ttl("session:abc", Duration::from_secs(600))
            .await
            .unwrap();

        let ttl = store.ttl("session:abc").await.unwrap();
        assert!(ttl > Duration::from_secs(590));
    }

    #[tokio::test]
    async fn refresh_does_not_create_records() {
        let store = InMemorySessionStore::new();
        store
            .refresh_ttl("session:ghost", Duration::from_secs(600))
            .await
            .unwrap();

        assert!(store.ttl("session:ghost").await.is_none());
    }

    #[tokio::test]
    async fn purge_task_sweeps_expired_records() {
        let store = InMemorySessionStore::new();
        store.insert_session("old", Duration::from_millis(1)).await;
        store.insert_session("live", Duration::from_secs(60)).await;
        let shutdown = CancellationToken::new();

        let task = spawn_purge_task(store.clone(), Duration::from_millis(10), shutdown.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Only records still in the map can be revoked.
        assert!(!store.revoke_session("old").await);
        assert!(store.revoke_session("live").await);

        shutdown.cancel();
        task.await.unwrap();
    }
}
