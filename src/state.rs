// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::audit::{AuditSink, NoopAuditSink};
use crate::auth::{ChallengeResponder, CredentialVerifier, RevocationGate};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::session::{
    spawn_purge_task, InMemorySessionStore, RedisSessionStore, SessionStore, PURGE_INTERVAL,
};

/// Shared, read-only gateway dependencies.
///
/// Built once at startup and cloned into every request; nothing in here is
/// mutated after construction. Each request's cancellation context is a
/// child of `shutdown`, so pending store calls end when the server stops.
#[derive(Clone)]
pub struct GatewayState {
    pub verifier: Arc<CredentialVerifier>,
    pub gate: Arc<RevocationGate>,
    pub challenges: Arc<ChallengeResponder>,
    pub audit: Arc<dyn AuditSink>,
    pub shutdown: CancellationToken,
}

impl GatewayState {
    pub fn new(
        verifier: CredentialVerifier,
        gate: RevocationGate,
        challenges: ChallengeResponder,
    ) -> Self {
        Self {
            verifier: Arc::new(verifier),
            gate: Arc::new(gate),
            challenges: Arc::new(challenges),
            audit: Arc::new(NoopAuditSink),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Build the state from configuration, connecting to the session store.
    pub async fn from_config(
        config: &GatewayConfig,
        shutdown: CancellationToken,
    ) -> Result<Self, GatewayError> {
        let store: Arc<dyn SessionStore> = match &config.session.store_url {
            Some(url) => Arc::new(RedisSessionStore::connect(url).await?),
            None => {
                warn!("SESSION_STORE_URL not set, using in-memory session store");
                let store = InMemorySessionStore::new();
                spawn_purge_task(store.clone(), PURGE_INTERVAL, shutdown.clone());
                Arc::new(store)
            }
        };

        let gate = RevocationGate::new(store, config.session.ttl, config.session.store_timeout)
            .with_sessionless_policy(config.session.sessionless);

        info!(
            store = gate.store_name(),
            renewal_window_secs = config.session.ttl.as_secs(),
            store_timeout_ms = config.session.store_timeout.as_millis() as u64,
            algorithm = ?config.verifier.algorithm,
            "Gateway state initialized"
        );

        Ok(Self::new(
            CredentialVerifier::new(&config.verifier),
            gate,
            ChallengeResponder::new(config.challenge.clone()),
        )
        .with_shutdown(shutdown))
    }
}
