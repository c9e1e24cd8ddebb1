// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Redis-backed session store.
//!
//! The multiplexed connection is cheap to clone and safe for concurrent use,
//! so each call clones it instead of locking.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tracing::{debug, error};

use super::{SessionStore, StoreError, StoreResult};

#[derive(Clone)]
pub struct RedisSessionStore {
    connection: MultiplexedConnection,
}

impl RedisSessionStore {
    /// Connect to Redis.
    ///
    /// The URL is never logged; it may embed a password.
    pub async fn connect(redis_url: &str) -> StoreResult<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            error!(target: "gateway.session.redis", error = %e, "Failed to open Redis client");
            StoreError::Unavailable(format!("failed to open Redis client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(target: "gateway.session.redis", error = %e, "Failed to connect to Redis");
                StoreError::Unavailable(format!("failed to connect to Redis: {e}"))
            })?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.connection.clone();
        let found: bool = conn
            .exists(key)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(found)
    }

    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.connection.clone();
        let seconds = ttl.as_secs().max(1);
        let updated: bool = redis::cmd("EXPIRE")
            .arg(key)
            .arg(seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if !updated {
            // Deleted between the existence check and the renewal.
            debug!(target: "gateway.session.redis", "Session record vanished before renewal");
        }
        Ok(())
    }
}
