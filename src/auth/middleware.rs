// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateway middleware for Axum.
//!
//! Wraps every protected registry route. Per request, in order:
//!
//! 1. Loopback peers (taken from the accepted connection, never from a
//!    header) skip authentication entirely.
//! 2. `Authorization: Bearer <token>` must be present.
//! 3. The token is verified by [`CredentialVerifier`](super::CredentialVerifier).
//! 4. The session is checked by [`RevocationGate`](super::RevocationGate).
//! 5. A [`RequestIdentity`] is attached to the request extensions.
//!
//! Any failure ends the request with the challenge response. Which step
//! failed is logged and audited but never reported to the client.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/v2/", get(version_check))
//!     .layer(axum::middleware::from_fn_with_state(state.clone(), gateway_middleware));
//!
//! axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//! ```

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{AuthError, AuthFailure, RequestIdentity};
use crate::audit::{AuditAction, AuditEvent};
use crate::state::GatewayState;

/// Authentication middleware function.
pub async fn gateway_middleware(
    State(state): State<GatewayState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let peer = ConnectInfo::<SocketAddr>::from_request_parts(&mut parts, &state)
        .await
        .ok()
        .map(|ConnectInfo(addr)| addr);
    let mut request = Request::from_parts(parts, body);

    if peer.is_some_and(is_loopback) {
        debug!(
            target: "gateway.middleware",
            path = %request.uri().path(),
            "Loopback request, skipping authentication"
        );
        state
            .audit
            .notify(AuditEvent::new(AuditAction::LoopbackBypass).with_peer(peer));
        return next.run(request).await;
    }

    // Dropping the request future abandons store calls on disconnect; the
    // child token covers server shutdown.
    let cancel = state.shutdown.child_token();

    match authenticate(&state, request.headers(), &cancel).await {
        Ok(identity) => {
            debug!(
                target: "gateway.middleware",
                subject = identity.subject(),
                session_id = identity.session_id(),
                "Request authenticated"
            );
            state.audit.notify(
                AuditEvent::new(AuditAction::AuthSuccess)
                    .with_subject(identity.subject())
                    .with_peer(peer),
            );
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(failure) => {
            warn!(
                target: "gateway.middleware",
                reason = failure.error.reason(),
                error = %failure.error,
                subject = failure.subject.as_deref(),
                session_id = failure.session_id.as_deref(),
                method = %request.method(),
                path = %request.uri().path(),
                peer = ?peer,
                "Authentication failed"
            );
            let mut event = AuditEvent::new(AuditAction::AuthFailure)
                .with_reason(failure.error.reason())
                .with_peer(peer);
            if let Some(subject) = failure.subject {
                event = event.with_subject(subject);
            }
            state.audit.notify(event);
            state
                .challenges
                .respond(request.method(), request.uri().path())
        }
    }
}

/// Run steps 2-4 and build the request identity.
pub async fn authenticate(
    state: &GatewayState,
    headers: &HeaderMap,
    cancel: &CancellationToken,
) -> Result<RequestIdentity, AuthFailure> {
    let token = bearer_token(headers)?;
    let claims = state.verifier.verify(token)?;
    if let Err(e) = state
        .gate
        .check(claims.session_id(), cancel)
        .await
        .into_result()
    {
        return Err(AuthFailure::attributed(e, &claims));
    }
    Ok(RequestIdentity::from_verified(claims))
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| AuthError::MalformedCredential)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MissingCredential)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MissingCredential);
    }

    match token.trim() {
        "" => Err(AuthError::MalformedCredential),
        token => Ok(token),
    }
}

fn is_loopback(addr: SocketAddr) -> bool {
    addr.ip().to_canonical().is_loopback()
}
