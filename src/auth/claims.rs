// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential claims and the verified request identity.

use serde::{Deserialize, Serialize};

/// Claims carried by a registry bearer credential.
///
/// Only `sub` and `exp` are required. Machine-to-machine credentials are
/// issued without `sid` and are never tracked as sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryClaims {
    /// Subject (user or robot account ID)
    pub sub: String,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Registry role (e.g. `admin`, `developer`, `guest`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Session ID, present for interactive logins
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    /// Expiration timestamp
    pub exp: u64,

    /// Issued at timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
}

/// Claims that passed signature, algorithm and expiry checks.
///
/// Only the credential verifier can produce this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaims(RegistryClaims);

impl VerifiedClaims {
    pub(crate) fn new(claims: RegistryClaims) -> Self {
        Self(claims)
    }

    pub fn subject(&self) -> &str {
        &self.0.sub
    }

    pub fn session_id(&self) -> Option<&str> {
        self.0.sid.as_deref()
    }

    pub fn claims(&self) -> &RegistryClaims {
        &self.0
    }
}

/// Identity of the caller, attached to each authenticated request.
///
/// Handlers read it through the [`VerifiedIdentity`](super::VerifiedIdentity)
/// extractor and must not re-validate the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestIdentity {
    subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
}

impl RequestIdentity {
    /// Build the identity from claims the revocation gate has honored.
    pub(crate) fn from_verified(claims: VerifiedClaims) -> Self {
        let RegistryClaims {
            sub,
            username,
            role,
            sid,
            ..
        } = claims.0;

        Self {
            subject: sub,
            username,
            role,
            session_id: sid,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> RegistryClaims {
        RegistryClaims {
            sub: "user_123".to_string(),
            username: Some("alice".to_string()),
            role: Some("developer".to_string()),
            sid: Some("sess_abc".to_string()),
            exp: 1700003600,
            iat: Some(1700000000),
        }
    }

    #[test]
    fn identity_copies_claims() {
        let identity = RequestIdentity::from_verified(VerifiedClaims::new(sample_claims()));
        assert_eq!(identity.subject(), "user_123");
        assert_eq!(identity.username(), Some("alice"));
        assert_eq!(identity.role(), Some("developer"));
        assert_eq!(identity.session_id(), Some("sess_abc"));
    }

    #[test]
    fn optional_claims_default_to_none() {
        let claims: RegistryClaims =
            serde_json::from_str(r#"{"sub":"robot$ci","exp":9999999999}"#).unwrap();
        assert_eq!(claims.sub, "robot$ci");
        assert!(claims.username.is_none());
        assert!(claims.role.is_none());
        assert!(claims.sid.is_none());
        assert!(claims.iat.is_none());
    }

    #[test]
    fn identity_serializes_without_missing_fields() {
        let mut claims = sample_claims();
        claims.sid = None;
        claims.username = None;
        let identity = RequestIdentity::from_verified(VerifiedClaims::new(claims));
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["subject"], "user_123");
        assert!(json.get("session_id").is_none());
        assert!(json.get("username").is_none());
    }
}
