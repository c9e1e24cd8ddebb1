// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session revocation gate.
//!
//! A structurally valid credential stays valid until it expires, so logout
//! works by deleting the session record. The gate looks the record up on
//! every request and slides its TTL forward when found.
//!
//! ## Decisions
//!
//! | Credential | Store answer | Status |
//! |------------|--------------|--------|
//! | no `sid` | not consulted | `NotTracked` (see [`SessionlessPolicy`]) |
//! | `sid` | key present | `Active`, TTL refreshed |
//! | `sid` | key absent | `Revoked` |
//! | `sid` | error, timeout, cancelled | `Revoked` (fail closed) |

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::AuthError;
use crate::session::{session_key, SessionStore, StoreError, StoreResult};

/// What to do with credentials that carry no session identifier.
///
/// Machine-to-machine credentials are short-lived and never registered as
/// sessions, so they are allowed by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionlessPolicy {
    #[default]
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Session record found and renewed
    Active,
    /// Credential has no session identifier and the policy allows it
    NotTracked,
    /// Credential must not be honored
    Revoked(RevokedBy),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevokedBy {
    /// No record for the session identifier
    MissingRecord,
    /// Sessionless credential refused by policy
    SessionRequired,
    /// Store failed, timed out, or the request was cancelled
    Store(StoreError),
}

impl SessionStatus {
    /// Map the decision onto the authentication error taxonomy.
    pub fn into_result(self) -> Result<(), AuthError> {
        match self {
            SessionStatus::Active | SessionStatus::NotTracked => Ok(()),
            SessionStatus::Revoked(RevokedBy::MissingRecord | RevokedBy::SessionRequired) => {
                Err(AuthError::SessionRevokedOrUnknown)
            }
            SessionStatus::Revoked(RevokedBy::Store(e)) => Err(AuthError::StoreUnavailable(e)),
        }
    }
}

/// Decides whether a verified credential's session is still honored.
#[derive(Clone)]
pub struct RevocationGate {
    store: Arc<dyn SessionStore>,
    renewal_window: Duration,
    store_budget: Duration,
    sessionless: SessionlessPolicy,
}

impl RevocationGate {
    pub fn new(store: Arc<dyn SessionStore>, renewal_window: Duration, store_budget: Duration) -> Self {
        Self {
            store,
            renewal_window,
            store_budget,
            sessionless: SessionlessPolicy::default(),
        }
    }

    pub fn with_sessionless_policy(mut self, policy: SessionlessPolicy) -> Self {
        self.sessionless = policy;
        self
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    /// Check a session identifier against the store.
    ///
    /// `cancel` is the request's cancellation context; once it fires any
    /// pending store call is abandoned and the session is treated as revoked.
    pub async fn check(&self, session_id: Option<&str>, cancel: &CancellationToken) -> SessionStatus {
        let Some(session_id) = session_id else {
            return match self.sessionless {
                SessionlessPolicy::Allow => SessionStatus::NotTracked,
                SessionlessPolicy::Deny => SessionStatus::Revoked(RevokedBy::SessionRequired),
            };
        };

        let key = session_key(session_id);

        match self.bounded(cancel, self.store.exists(&key)).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(target: "gateway.revocation", session_id, "Session record not found");
                return SessionStatus::Revoked(RevokedBy::MissingRecord);
            }
            Err(e) => {
                warn!(
                    target: "gateway.revocation",
                    session_id,
                    store = self.store.name(),
                    error = %e,
                    "Session existence check failed, failing closed"
                );
                return SessionStatus::Revoked(RevokedBy::Store(e));
            }
        }

        // Best-effort: the session was found, so a failed renewal does not
        // revoke this request.
        if let Err(e) = self
            .bounded(cancel, self.store.refresh_ttl(&key, self.renewal_window))
            .await
        {
            warn!(
                target: "gateway.revocation",
                session_id,
                store = self.store.name(),
                error = %e,
                "Session TTL renewal failed"
            );
        }

        SessionStatus::Active
    }

    async fn bounded<T, F>(&self, cancel: &CancellationToken, call: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StoreError::Cancelled),
            result = tokio::time::timeout(self.store_budget, call) => {
                result.unwrap_or(Err(StoreError::Timeout))
            }
        }
    }
}
