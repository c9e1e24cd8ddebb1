// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registry token-auth challenge.
//!
//! Every authentication failure is answered with the same response:
//!
//! ```text
//! HTTP/1.1 401 Unauthorized
//! Www-Authenticate: Bearer realm="<realm>",service="<service>"[,scope="<scope>"]
//! Docker-Distribution-Api-Version: registry/2.0
//!
//! {"errors":[{"code":"UNAUTHORIZED","message":"authentication required"}]}
//! ```
//!
//! The scope is only included when the request path names exactly one
//! repository endpoint. Clients fall back to their own scope otherwise.

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::config::ChallengeConfig;

pub const API_VERSION_HEADER: &str = "docker-distribution-api-version";
pub const API_VERSION: &str = "registry/2.0";

const UNAUTHORIZED_CODE: &str = "UNAUTHORIZED";
const UNAUTHORIZED_MESSAGE: &str = "authentication required";

/// How a client should re-authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub realm: String,
    pub service: String,
    pub scope: Option<String>,
}

impl Challenge {
    /// Value of the `Www-Authenticate` header.
    pub fn header_value(&self) -> String {
        let mut value = format!(
            "Bearer realm=\"{}\",service=\"{}\"",
            self.realm, self.service
        );
        if let Some(scope) = &self.scope {
            value.push_str(&format!(",scope=\"{scope}\""));
        }
        value
    }
}

#[derive(Serialize)]
struct ErrorBody {
    errors: Vec<ErrorEntry>,
}

#[derive(Serialize)]
struct ErrorEntry {
    code: &'static str,
    message: &'static str,
}

impl IntoResponse for Challenge {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            errors: vec![ErrorEntry {
                code: UNAUTHORIZED_CODE,
                message: UNAUTHORIZED_MESSAGE,
            }],
        });
        let mut response = (StatusCode::UNAUTHORIZED, body).into_response();

        let headers = response.headers_mut();
        match HeaderValue::from_str(&self.header_value()) {
            Ok(value) => {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
            Err(e) => error!(
                target: "gateway.challenge",
                error = %e,
                "Challenge parameters are not a valid header value"
            ),
        }
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));

        response
    }
}

/// Builds challenges from the configured realm and service.
#[derive(Debug, Clone)]
pub struct ChallengeResponder {
    config: ChallengeConfig,
}

impl ChallengeResponder {
    pub fn new(config: ChallengeConfig) -> Self {
        Self { config }
    }

    pub fn challenge(&self, method: &Method, path: &str) -> Challenge {
        Challenge {
            realm: self.config.realm.clone(),
            service: self.config.service.clone(),
            scope: derive_scope(method, path),
        }
    }

    pub fn respond(&self, method: &Method, path: &str) -> Response {
        self.challenge(method, path).into_response()
    }
}

/// Derive the minimal token scope for a registry v2 request.
///
/// Returns `None` unless the path maps to exactly one repository endpoint
/// (or the catalog) and the method maps to a known action.
pub fn derive_scope(method: &Method, path: &str) -> Option<String> {
    let rest = path.strip_prefix("/v2/")?.trim_end_matches('/');
    if rest.is_empty() {
        return None;
    }

    if rest == "_catalog" {
        return matches!(*method, Method::GET | Method::HEAD)
            .then(|| "registry:catalog:*".to_string());
    }

    let segments: Vec<&str> = rest.split('/').collect();
    let mut endpoints = segments
        .iter()
        .enumerate()
        .filter(|(_, s)| matches!(**s, "manifests" | "blobs" | "tags"));
    let (index, endpoint) = endpoints.next()?;
    if endpoints.next().is_some() {
        return None;
    }

    let (name, tail) = (segments.get(..index)?, segments.get(index + 1..)?);
    if name.is_empty() || !name.iter().all(|c| is_name_component(c)) {
        return None;
    }

    let action = match (*endpoint, tail) {
        ("manifests", [reference]) if !reference.is_empty() => method_action(method)?,
        ("blobs", ["uploads"]) | ("blobs", ["uploads", _]) => "pull,push",
        ("blobs", [digest]) if !digest.is_empty() => method_action(method)?,
        ("tags", ["list"]) if matches!(*method, Method::GET | Method::HEAD) => "pull",
        _ => return None,
    };

    Some(format!("repository:{}:{action}", name.join("/")))
}

fn method_action(method: &Method) -> Option<&'static str> {
    match *method {
        Method::GET | Method::HEAD => Some("pull"),
        Method::PUT | Method::POST | Method::PATCH => Some("pull,push"),
        Method::DELETE => Some("delete"),
        _ => None,
    }
}

/// Repository path component: lowercase alphanumerics joined by single
/// `.`, `_` or `-` runs, starting and ending with an alphanumeric.
fn is_name_component(component: &str) -> bool {
    let bytes = component.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    let alnum = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    alnum(first)
        && alnum(last)
        && bytes
            .iter()
            .all(|b| alnum(b) || matches!(b, b'.' | b'_' | b'-'))
        && !component.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    fn responder() -> ChallengeResponder {
        ChallengeResponder::new(ChallengeConfig {
            realm: "https://auth.example.com/token".to_string(),
            service: "registry.example.com".to_string(),
        })
    }

    #[tokio::test]
    async fn challenge_response_matches_protocol() {
        let response = responder().respond(&Method::GET, "/v2/");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let www = response.headers().get(header::WWW_AUTHENTICATE).unwrap();
        assert_eq!(
            www.to_str().unwrap(),
            r#"Bearer realm="https://auth.example.com/token",service="registry.example.com""#
        );
        assert_eq!(
            response.headers().get("Docker-Distribution-Api-Version").unwrap(),
            "registry/2.0"
        );

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(
            body,
            r#"{"errors":[{"code":"UNAUTHORIZED","message":"authentication required"}]}"#
        );
    }

    #[test]
    fn header_includes_scope_when_derivable() {
        let challenge = responder().challenge(&Method::GET, "/v2/library/nginx/manifests/latest");
        assert_eq!(
            challenge.header_value(),
            r#"Bearer realm="https://auth.example.com/token",service="registry.example.com",scope="repository:library/nginx:pull""#
        );
    }

    #[test]
    fn scope_for_manifest_methods() {
        let path = "/v2/team/app/manifests/v1.2";
        assert_eq!(derive_scope(&Method::HEAD, path).as_deref(), Some("repository:team/app:pull"));
        assert_eq!(
            derive_scope(&Method::PUT, path).as_deref(),
            Some("repository:team/app:pull,push")
        );
        assert_eq!(derive_scope(&Method::DELETE, path).as_deref(), Some("repository:team/app:delete"));
        assert_eq!(derive_scope(&Method::OPTIONS, path), None);
    }

    #[test]
    fn scope_for_blobs_and_uploads() {
        assert_eq!(
            derive_scope(&Method::GET, "/v2/app/blobs/sha256:abcd").as_deref(),
            Some("repository:app:pull")
        );
        assert_eq!(
            derive_scope(&Method::POST, "/v2/app/blobs/uploads/").as_deref(),
            Some("repository:app:pull,push")
        );
        assert_eq!(
            derive_scope(&Method::PATCH, "/v2/app/blobs/uploads/3f2a").as_deref(),
            Some("repository:app:pull,push")
        );
    }

    #[test]
    fn scope_for_tags_and_catalog() {
        assert_eq!(
            derive_scope(&Method::GET, "/v2/app/tags/list").as_deref(),
            Some("repository:app:pull")
        );
        assert_eq!(derive_scope(&Method::DELETE, "/v2/app/tags/list"), None);
        assert_eq!(
            derive_scope(&Method::GET, "/v2/_catalog").as_deref(),
            Some("registry:catalog:*")
        );
    }

    #[test]
    fn ambiguous_or_foreign_paths_have_no_scope() {
        for path in [
            "/v2/",
            "/v2",
            "/health",
            "/v2/app",
            "/v2/manifests/latest",
            "/v2/tags/manifests/latest",
            "/v2/app/manifests/a/b",
            "/v2/App/manifests/latest",
            "/v2/app/blobs/uploads/a/b",
            "/v2/app/referrers/sha256:abcd",
            "/v2/-app/manifests/latest",
        ] {
            assert_eq!(derive_scope(&Method::GET, path), None, "path {path}");
        }
    }
}
