// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer authentication for the registry API.
//!
//! ## Auth Flow
//!
//! 1. A registry client logs in at the token endpoint (the realm) and
//!    receives an HMAC-signed JWT
//! 2. The client sends `Authorization: Bearer <JWT>` on every registry call
//! 3. The gateway:
//!    - Verifies signature, algorithm and expiry
//!    - Checks `session:<sid>` in the session store and slides its TTL
//!    - Attaches the [`RequestIdentity`] for downstream handlers
//! 4. On any failure the client receives a `Www-Authenticate` challenge
//!    pointing back at the realm
//!
//! ## Security
//!
//! - Only the configured HMAC algorithm is accepted
//! - Store errors and timeouts fail closed
//! - Failure causes are logged, never returned to the client
//! - Loopback peers bypass authentication; the peer address comes from the
//!   accepted connection only

pub mod challenge;
pub mod claims;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod revocation;
pub mod verifier;

pub use challenge::{Challenge, ChallengeResponder};
pub use claims::{RegistryClaims, RequestIdentity, VerifiedClaims};
pub use error::{AuthError, AuthFailure};
pub use extractor::{MaybeIdentity, VerifiedIdentity};
pub use middleware::gateway_middleware;
pub use revocation::{RevocationGate, RevokedBy, SessionStatus, SessionlessPolicy};
pub use verifier::CredentialVerifier;

#[cfg(test)]
pub(crate) mod test_support {
    //! Token minting and store doubles shared by the auth tests.

    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    use super::*;
    use crate::config::{ChallengeConfig, VerifierConfig};
    use crate::session::{InMemorySessionStore, SessionStore, StoreError, StoreResult};
    use crate::state::GatewayState;

    pub const SECRET: &[u8] = b"test-signing-secret-0123456789abcdef";
    pub const OTHER_SECRET: &[u8] = b"some-other-secret-0123456789abcdef!";
    pub const REALM: &str = "https://auth.example.com/token";
    pub const SERVICE: &str = "registry.example.com";
    pub const WINDOW: Duration = Duration::from_secs(1800);

    pub fn now() -> u64 {
        chrono::Utc::now().timestamp() as u64
    }

    pub fn claims(sub: &str, sid: Option<&str>) -> RegistryClaims {
        RegistryClaims {
            sub: sub.to_string(),
            username: Some("alice".to_string()),
            role: Some("developer".to_string()),
            sid: sid.map(str::to_string),
            exp: now() + 3600,
            iat: Some(now()),
        }
    }

    pub fn sign_with(claims: &RegistryClaims, algorithm: Algorithm, secret: &[u8]) -> String {
        encode(&Header::new(algorithm), claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    pub fn sign(claims: &RegistryClaims) -> String {
        sign_with(claims, Algorithm::HS256, SECRET)
    }

    pub fn verifier_config() -> VerifierConfig {
        VerifierConfig {
            secret: SECRET.to_vec(),
            algorithm: Algorithm::HS256,
            leeway_secs: 0,
        }
    }

    pub fn verifier() -> CredentialVerifier {
        CredentialVerifier::new(&verifier_config())
    }

    pub fn challenge_config() -> ChallengeConfig {
        ChallengeConfig {
            realm: REALM.to_string(),
            service: SERVICE.to_string(),
        }
    }

    pub fn state_with_store(store: Arc<dyn SessionStore>) -> GatewayState {
        GatewayState::new(
            verifier(),
            RevocationGate::new(store, WINDOW, Duration::from_millis(100)),
            ChallengeResponder::new(challenge_config()),
        )
    }

    pub fn gateway_state() -> (GatewayState, InMemorySessionStore) {
        let store = InMemorySessionStore::new();
        (state_with_store(Arc::new(store.clone())), store)
    }

    /// Store whose calls fail on demand. Every key exists otherwise.
    pub struct FlakyStore {
        fail_exists: bool,
        fail_refresh: bool,
    }

    impl FlakyStore {
        pub fn failing_exists() -> Self {
            Self {
                fail_exists: true,
                fail_refresh: false,
            }
        }

        pub fn failing_refresh() -> Self {
            Self {
                fail_exists: false,
                fail_refresh: true,
            }
        }
    }

    #[async_trait]
    impl SessionStore for FlakyStore {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn exists(&self, _key: &str) -> StoreResult<bool> {
            if self.fail_exists {
                return Err(StoreError::Unavailable("connection refused".to_string()));
            }
            Ok(true)
        }

        async fn refresh_ttl(&self, _key: &str, _ttl: Duration) -> StoreResult<()> {
            if self.fail_refresh {
                return Err(StoreError::Unavailable("connection reset".to_string()));
            }
            Ok(())
        }
    }

    /// Store that answers "exists" only after a delay.
    pub struct SlowStore {
        delay: Duration,
    }

    impl SlowStore {
        pub fn new(delay: Duration) -> Self {
            Self { delay }
        }
    }

    #[async_trait]
    impl SessionStore for SlowStore {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn exists(&self, _key: &str) -> StoreResult<bool> {
            tokio::time::sleep(self.delay).await;
            Ok(true)
        }

        async fn refresh_ttl(&self, _key: &str, _ttl: Duration) -> StoreResult<()> {
            Ok(())
        }
    }
}
