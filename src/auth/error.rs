// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Every variant is answered with the same challenge response. The variant
//! only reaches logs and audit events, never the client.

use super::VerifiedClaims;
use crate::session::StoreError;

/// Reasons a request failed authentication.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization` header, or a scheme other than `Bearer`
    #[error("bearer credential is missing")]
    MissingCredential,

    /// Token could not be decoded or lacks required claims
    #[error("bearer credential is malformed")]
    MalformedCredential,

    /// Signature mismatch or an algorithm other than the configured one
    #[error("credential signature or algorithm is invalid")]
    InvalidSignatureOrAlgorithm,

    /// Token expiry is in the past
    #[error("credential has expired")]
    ExpiredCredential,

    /// Session identifier present but no active session record
    #[error("session is revoked or unknown")]
    SessionRevokedOrUnknown,

    /// Session store did not answer within the request budget
    #[error("session store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),
}

impl AuthError {
    /// Stable identifier used in log fields and audit events.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::MalformedCredential => "malformed_credential",
            AuthError::InvalidSignatureOrAlgorithm => "invalid_signature_or_algorithm",
            AuthError::ExpiredCredential => "expired_credential",
            AuthError::SessionRevokedOrUnknown => "session_revoked",
            AuthError::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

/// A rejected request.
///
/// Once the credential's signature has checked out its subject and session
/// are kept, so a revoked or unverifiable session can be attributed in logs
/// and audit events.
#[derive(Debug)]
pub struct AuthFailure {
    pub error: AuthError,
    pub subject: Option<String>,
    pub session_id: Option<String>,
}

impl AuthFailure {
    pub(crate) fn attributed(error: AuthError, claims: &VerifiedClaims) -> Self {
        Self {
            error,
            subject: Some(claims.subject().to_string()),
            session_id: claims.session_id().map(str::to_string),
        }
    }
}

impl From<AuthError> for AuthFailure {
    fn from(error: AuthError) -> Self {
        Self {
            error,
            subject: None,
            session_id: None,
        }
    }
}
