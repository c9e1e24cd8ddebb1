// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::sync::Arc;

use registry_auth_gateway::api;
use registry_auth_gateway::audit::{spawn_audit_logger, ChannelAuditSink, DEFAULT_AUDIT_QUEUE};
use registry_auth_gateway::config::GatewayConfig;
use registry_auth_gateway::error::GatewayError;
use registry_auth_gateway::logging::{init_tracing, LogFormat};
use registry_auth_gateway::state::GatewayState;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    init_tracing(LogFormat::from_env());

    if let Err(e) = run().await {
        error!(error = %e, "Registry auth gateway failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), GatewayError> {
    let config = GatewayConfig::from_env()?;
    let shutdown = CancellationToken::new();

    let (audit_sink, audit_events) = ChannelAuditSink::new(DEFAULT_AUDIT_QUEUE);
    let audit_task = spawn_audit_logger(audit_events, shutdown.clone());

    let state = GatewayState::from_config(&config, shutdown.clone())
        .await?
        .with_audit(Arc::new(audit_sink));
    let app = api::router(state, api::registry::version_check_router());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(
        addr = %config.bind_addr,
        realm = %config.challenge.realm,
        service = %config.challenge.service,
        "Registry auth gateway listening"
    );

    // The loopback bypass reads the peer address from ConnectInfo.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await?;

    shutdown.cancel();
    if let Err(e) = audit_task.await {
        warn!(error = %e, "Audit logger task ended abnormally");
    }
    info!("Registry auth gateway stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
        }
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();
}
