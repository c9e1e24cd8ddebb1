// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer credential verification.
//!
//! Credentials are HMAC-signed JWTs. Exactly one algorithm is accepted; a
//! token whose header names any other algorithm (asymmetric, `none`, or a
//! different HMAC width) is refused before signature checking.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

use super::claims::{RegistryClaims, VerifiedClaims};
use super::AuthError;
use crate::config::VerifierConfig;

/// Stateless verifier holding the shared signing secret.
#[derive(Clone)]
pub struct CredentialVerifier {
    algorithm: Algorithm,
    key: DecodingKey,
    validation: Validation,
}

impl CredentialVerifier {
    pub fn new(config: &VerifierConfig) -> Self {
        let mut validation = Validation::new(config.algorithm);
        validation.leeway = config.leeway_secs;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            algorithm: config.algorithm,
            key: DecodingKey::from_secret(&config.secret),
            validation,
        }
    }

    /// Verify a raw bearer token and return its claims.
    pub fn verify(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MalformedCredential);
        }

        let header = decode_header(token).map_err(|_| AuthError::MalformedCredential)?;
        if header.alg != self.algorithm {
            return Err(AuthError::InvalidSignatureOrAlgorithm);
        }

        let data = decode::<RegistryClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredCredential,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AuthError::InvalidSignatureOrAlgorithm
                }
                _ => AuthError::MalformedCredential,
            }
        })?;

        if data.claims.sub.is_empty() {
            return Err(AuthError::MalformedCredential);
        }

        Ok(VerifiedClaims::new(data.claims))
    }
}
