// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Store Adapter
//!
//! Session records live in a key/value store under `session:<sid>` with a
//! sliding TTL. The gateway only ever asks two things of the store: does the
//! key exist, and push its expiry forward. Records are created by the
//! credential issuer and deleted by logout; neither happens here.
//!
//! ## Backends
//!
//! - [`RedisSessionStore`] - production backend (`SESSION_STORE_URL`)
//! - [`InMemorySessionStore`] - single-process backend for development and tests

use std::time::Duration;

use async_trait::async_trait;

pub mod memory;
pub mod redis;

pub use self::memory::{spawn_purge_task, InMemorySessionStore, PURGE_INTERVAL};
pub use self::redis::RedisSessionStore;

/// Key prefix for session records.
pub const SESSION_KEY_PREFIX: &str = "session:";

/// Build the store key for a session identifier.
pub fn session_key(session_id: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{session_id}")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("session store unreachable: {0}")]
    Unavailable(String),

    #[error("session store call exceeded its time budget")]
    Timeout,

    #[error("request was cancelled before the session store answered")]
    Cancelled,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Operations the gateway consumes from the session store.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Whether a record exists for `key`.
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Reset the expiry of `key` to `ttl` from now.
    async fn refresh_ttl(&self, key: &str, ttl: Duration) -> StoreResult<()>;
}
