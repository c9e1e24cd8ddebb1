// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registry API base endpoint.
//!
//! Registry clients probe `GET /v2/` to discover whether authentication is
//! required. Everything else under `/v2/` belongs to the registry backend.

use axum::{
    http::{header::HeaderName, HeaderValue},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::debug;

use crate::auth::challenge::{API_VERSION, API_VERSION_HEADER};
use crate::auth::MaybeIdentity;

/// Router serving the `/v2/` version check.
pub fn version_check_router() -> Router {
    Router::new().route("/v2/", get(version_check))
}

/// `GET /v2/` - answers `{}` once the caller got past the gateway.
pub async fn version_check(MaybeIdentity(identity): MaybeIdentity) -> impl IntoResponse {
    match &identity {
        Some(identity) => debug!(subject = identity.subject(), "Version check"),
        None => debug!("Version check from trusted local caller"),
    }

    (
        [(
            HeaderName::from_static(API_VERSION_HEADER),
            HeaderValue::from_static(API_VERSION),
        )],
        Json(serde_json::json!({})),
    )
}
