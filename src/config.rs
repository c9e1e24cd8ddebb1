// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values, and the
//! [`GatewayConfig`] loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `5000` |
//! | `AUTH_SIGNING_SECRET` | Shared HMAC secret for bearer credentials | Required |
//! | `AUTH_SIGNING_ALGORITHM` | `HS256`, `HS384` or `HS512` | `HS256` |
//! | `AUTH_REALM` | Token endpoint advertised in challenges | Required |
//! | `AUTH_SERVICE` | Service name advertised in challenges | `container-registry` |
//! | `SESSION_STORE_URL` | Redis URL for session records | In-memory store |
//! | `SESSION_TTL_SECS` | Sliding session renewal window | `1800` |
//! | `SESSION_STORE_TIMEOUT_MS` | Per-request session store budget | `500` |
//! | `ALLOW_SESSIONLESS_CREDENTIALS` | Honor credentials without a session ID | `true` |
//! | `CLOCK_SKEW_LEEWAY_SECS` | Leeway applied to credential expiry | `0` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use url::Url;

use crate::auth::SessionlessPolicy;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const SIGNING_SECRET_ENV: &str = "AUTH_SIGNING_SECRET";
pub const SIGNING_ALGORITHM_ENV: &str = "AUTH_SIGNING_ALGORITHM";
pub const REALM_ENV: &str = "AUTH_REALM";
pub const SERVICE_ENV: &str = "AUTH_SERVICE";
pub const SESSION_STORE_URL_ENV: &str = "SESSION_STORE_URL";
pub const SESSION_TTL_ENV: &str = "SESSION_TTL_SECS";
pub const SESSION_STORE_TIMEOUT_ENV: &str = "SESSION_STORE_TIMEOUT_MS";
pub const ALLOW_SESSIONLESS_ENV: &str = "ALLOW_SESSIONLESS_CREDENTIALS";
pub const CLOCK_SKEW_LEEWAY_ENV: &str = "CLOCK_SKEW_LEEWAY_SECS";

/// Environment variable selecting the log output format.
///
/// `json` produces one JSON object per line; anything else is human-readable.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_SERVICE: &str = "container-registry";

/// Default sliding renewal window for session records (30 minutes).
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(1800);

/// Default budget for a single session store round trip.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(500);

/// Shortest accepted HMAC secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Settings for the credential verifier.
#[derive(Clone)]
pub struct VerifierConfig {
    pub secret: Vec<u8>,
    pub algorithm: Algorithm,
    pub leeway_secs: u64,
}

impl std::fmt::Debug for VerifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifierConfig")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

/// Realm and service advertised in `Www-Authenticate` challenges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeConfig {
    pub realm: String,
    pub service: String,
}

/// Session store connection and renewal settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Redis URL. `None` selects the in-memory store.
    pub store_url: Option<String>,
    pub ttl: Duration,
    pub store_timeout: Duration,
    pub sessionless: SessionlessPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store_url: None,
            ttl: DEFAULT_SESSION_TTL,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            sessionless: SessionlessPolicy::Allow,
        }
    }
}

/// Complete gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub verifier: VerifierConfig,
    pub challenge: ChallengeConfig,
    pub session: SessionConfig,
}

impl GatewayConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup(PORT_ENV) {
            Some(raw) => parse_number::<u16>(PORT_ENV, &raw)?,
            None => DEFAULT_PORT,
        };
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    name: HOST_ENV,
                    reason: e.to_string(),
                })?;

        let secret = lookup(SIGNING_SECRET_ENV)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing(SIGNING_SECRET_ENV))?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: SIGNING_SECRET_ENV,
                reason: format!("must be at least {MIN_SECRET_LEN} bytes"),
            });
        }

        let algorithm = match lookup(SIGNING_ALGORITHM_ENV) {
            Some(raw) => parse_hmac_algorithm(&raw)?,
            None => Algorithm::HS256,
        };

        let leeway_secs = match lookup(CLOCK_SKEW_LEEWAY_ENV) {
            Some(raw) => parse_number::<u64>(CLOCK_SKEW_LEEWAY_ENV, &raw)?,
            None => 0,
        };

        let realm = lookup(REALM_ENV)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing(REALM_ENV))?;
        validate_realm(&realm)?;

        let service = lookup(SERVICE_ENV)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVICE.to_string());
        validate_challenge_param(SERVICE_ENV, &service)?;

        let ttl = match lookup(SESSION_TTL_ENV) {
            Some(raw) => Duration::from_secs(parse_positive(SESSION_TTL_ENV, &raw)?),
            None => DEFAULT_SESSION_TTL,
        };
        let store_timeout = match lookup(SESSION_STORE_TIMEOUT_ENV) {
            Some(raw) => Duration::from_millis(parse_positive(SESSION_STORE_TIMEOUT_ENV, &raw)?),
            None => DEFAULT_STORE_TIMEOUT,
        };

        let sessionless = match lookup(ALLOW_SESSIONLESS_ENV) {
            Some(raw) => parse_sessionless(&raw)?,
            None => SessionlessPolicy::Allow,
        };

        Ok(Self {
            bind_addr,
            verifier: VerifierConfig {
                secret: secret.into_bytes(),
                algorithm,
                leeway_secs,
            },
            challenge: ChallengeConfig { realm, service },
            session: SessionConfig {
                store_url: lookup(SESSION_STORE_URL_ENV).filter(|s| !s.is_empty()),
                ttl,
                store_timeout,
                sessionless,
            },
        })
    }
}

/// Parse an HMAC algorithm name. Asymmetric and unknown names are refused.
pub fn parse_hmac_algorithm(raw: &str) -> Result<Algorithm, ConfigError> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(ConfigError::Invalid {
            name: SIGNING_ALGORITHM_ENV,
            reason: format!("unsupported algorithm {other:?} (expected HS256, HS384 or HS512)"),
        }),
    }
}

fn parse_sessionless(raw: &str) -> Result<SessionlessPolicy, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(SessionlessPolicy::Allow),
        "false" | "0" | "no" => Ok(SessionlessPolicy::Deny),
        other => Err(ConfigError::Invalid {
            name: ALLOW_SESSIONLESS_ENV,
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}

fn validate_realm(realm: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(realm).map_err(|e| ConfigError::Invalid {
        name: REALM_ENV,
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            name: REALM_ENV,
            reason: "realm must be an http or https URL".to_string(),
        });
    }
    validate_challenge_param(REALM_ENV, realm)
}

/// Realm and service are emitted as quoted strings in `Www-Authenticate`, so
/// they must be visible ASCII without quotes or backslashes.
fn validate_challenge_param(name: &'static str, value: &str) -> Result<(), ConfigError> {
    if let Some(c) = value
        .chars()
        .find(|c| !c.is_ascii_graphic() || matches!(c, '"' | '\\'))
    {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("character {c:?} is not allowed in a challenge parameter"),
        });
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

fn parse_positive(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match parse_number::<u64>(name, raw)? {
        0 => Err(ConfigError::Invalid {
            name,
            reason: "must be greater than zero".to_string(),
        }),
        value => Ok(value),
    }
}
