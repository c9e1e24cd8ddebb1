// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::auth::gateway_middleware;
use crate::state::GatewayState;

pub mod health;
pub mod registry;

/// Put the gateway in front of a registry router.
///
/// Everything except `/health` goes through the gateway: the routes of
/// `registry`, its fallback, and paths that match nothing (those are
/// challenged before they can 404). Serve the result with
/// `into_make_service_with_connect_info::<SocketAddr>()` so the loopback
/// bypass can see the peer address.
pub fn router(state: GatewayState, registry: Router) -> Router {
    // `layer` wraps the routes and the fallback. `/health` is added after it
    // and stays open; merging instead would swap in an ungated 404 fallback.
    registry
        .layer(from_fn_with_state(state.clone(), gateway_middleware))
        .route("/health", get(health::health).with_state(state))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
