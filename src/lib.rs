// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registry Auth Gateway
//!
//! Bearer authentication in front of a container-image registry. Credentials
//! are verified locally, sessions are checked against a key/value store so
//! logout takes effect before the credential expires, and failures are
//! answered with a registry token-auth challenge.
//!
//! ## Modules
//!
//! - `api` - Router assembly and health endpoint (Axum)
//! - `audit` - Fire-and-forget audit notifications
//! - `auth` - Credential verification, revocation gate, challenges, middleware
//! - `session` - Session store adapters (Redis, in-memory)

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod state;
