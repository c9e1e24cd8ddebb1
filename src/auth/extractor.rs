// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the verified request identity.
//!
//! Registry handlers behind the gateway read the caller like this:
//!
//! ```rust,ignore
//! async fn get_manifest(VerifiedIdentity(identity): VerifiedIdentity) -> impl IntoResponse {
//!     // identity.subject(), identity.role(), ...
//! }
//! ```
//!
//! The extractors only read what [`gateway_middleware`](super::gateway_middleware)
//! attached; they never look at the `Authorization` header themselves.

use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};

use super::RequestIdentity;
use crate::state::GatewayState;

/// Extractor that requires an authenticated caller.
///
/// Rejects with the challenge response when the request carries no
/// identity, e.g. a loopback request that skipped authentication.
pub struct VerifiedIdentity(pub RequestIdentity);

/// Rejection for [`VerifiedIdentity`].
pub struct IdentityRejection(Response);

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        self.0
    }
}

impl<S> FromRequestParts<S> for VerifiedIdentity
where
    GatewayState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<RequestIdentity>() {
            Some(identity) => Ok(VerifiedIdentity(identity.clone())),
            None => {
                let gateway = GatewayState::from_ref(state);
                Err(IdentityRejection(
                    gateway.challenges.respond(&parts.method, parts.uri.path()),
                ))
            }
        }
    }
}

/// Optional identity extractor.
///
/// Returns `None` for requests the gateway let through without a
/// credential (loopback callers).
pub struct MaybeIdentity(pub Option<RequestIdentity>);

impl<S> FromRequestParts<S> for MaybeIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeIdentity(parts.extensions.get::<RequestIdentity>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::{claims, gateway_state};
    use crate::auth::VerifiedClaims;
    use axum::http::{Request, StatusCode};

    fn parts(uri: &str) -> Parts {
        Request::builder().uri(uri).body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn verified_identity_reads_extensions() {
        let (state, _store) = gateway_state();
        let mut parts = parts("/v2/");
        let identity =
            RequestIdentity::from_verified(VerifiedClaims::new(claims("user_from_gateway", None)));
        parts.extensions.insert(identity);

        let VerifiedIdentity(found) = VerifiedIdentity::from_request_parts(&mut parts, &state)
            .await
            .ok()
            .unwrap();
        assert_eq!(found.subject(), "user_from_gateway");
    }

    #[tokio::test]
    async fn verified_identity_rejects_with_challenge() {
        let (state, _store) = gateway_state();
        let mut parts = parts("/v2/app/tags/list");

        let rejection = VerifiedIdentity::from_request_parts(&mut parts, &state)
            .await
            .err()
            .unwrap();
        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response
            .headers()
            .get("www-authenticate")
            .unwrap()
            .to_str()
            .unwrap()
            .contains(r#"scope="repository:app:pull""#));
    }

    #[tokio::test]
    async fn maybe_identity_returns_none_without_identity() {
        let (state, _store) = gateway_state();
        let mut parts = parts("/v2/");

        let MaybeIdentity(found) = MaybeIdentity::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
