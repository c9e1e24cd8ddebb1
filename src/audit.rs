// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit notifications for authentication decisions.
//!
//! The gateway only emits events; persisting them belongs to the audit
//! service. Notification is fire-and-forget: [`AuditSink::notify`] never
//! blocks or fails the request, and events that cannot be queued are
//! dropped with a warning.

use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default capacity of the audit queue.
pub const DEFAULT_AUDIT_QUEUE: usize = 1024;

/// Types of auditable authentication events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    AuthSuccess,
    AuthFailure,
    LoopbackBypass,
}

/// An audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    /// Verified subject, only set on success.
    pub subject: Option<String>,
    /// Failure reason (see `AuthError::reason`).
    pub reason: Option<String>,
    /// Transport-level peer address.
    pub peer: Option<String>,
}

impl AuditEvent {
    pub fn new(action: AuditAction) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            action,
            subject: None,
            reason: None,
            peer: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_peer(mut self, peer: Option<SocketAddr>) -> Self {
        self.peer = peer.map(|addr| addr.to_string());
        self
    }
}

/// Receiver of audit events.
pub trait AuditSink: Send + Sync {
    /// Hand off an event without waiting.
    fn notify(&self, event: AuditEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn notify(&self, _event: AuditEvent) {}
}

/// Queues events on a bounded channel for a background consumer.
#[derive(Debug, Clone)]
pub struct ChannelAuditSink {
    sender: mpsc::Sender<AuditEvent>,
}

impl ChannelAuditSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<AuditEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl AuditSink for ChannelAuditSink {
    fn notify(&self, event: AuditEvent) {
        if let Err(e) = self.sender.try_send(event) {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "queue full",
                mpsc::error::TrySendError::Closed(_) => "consumer stopped",
            };
            warn!(target: "gateway.audit", reason, "Dropping audit event");
        }
    }
}

/// Drain audit events into the structured log until shutdown.
///
/// Should be spawned alongside the server:
/// ```rust,ignore
/// let (sink, events) = ChannelAuditSink::new(DEFAULT_AUDIT_QUEUE);
/// let audit_task = spawn_audit_logger(events, shutdown.clone());
/// ```
pub fn spawn_audit_logger(
    mut events: mpsc::Receiver<AuditEvent>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => log_event(&event),
                    None => return,
                },
                _ = shutdown.cancelled() => {
                    // Flush what is already queued.
                    while let Ok(event) = events.try_recv() {
                        log_event(&event);
                    }
                    info!(target: "gateway.audit", "Audit logger shutting down");
                    return;
                }
            }
        }
    })
}

fn log_event(event: &AuditEvent) {
    info!(
        target: "gateway.audit",
        event_id = %event.event_id,
        action = ?event.action,
        subject = event.subject.as_deref(),
        reason = event.reason.as_deref(),
        peer = event.peer.as_deref(),
        timestamp = %event.timestamp,
        "audit"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let peer: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        let event = AuditEvent::new(AuditAction::AuthFailure)
            .with_reason("expired_credential")
            .with_peer(Some(peer));

        assert_eq!(event.action, AuditAction::AuthFailure);
        assert_eq!(event.reason.as_deref(), Some("expired_credential"));
        assert_eq!(event.peer.as_deref(), Some("10.0.0.1:5000"));
        assert!(event.subject.is_none());
        assert!(!event.event_id.is_empty());
    }

    #[test]
    fn action_serializes_snake_case() {
        let json = serde_json::to_value(AuditEvent::new(AuditAction::LoopbackBypass)).unwrap();
        assert_eq!(json["action"], "loopback_bypass");
    }

    #[tokio::test]
    async fn channel_sink_delivers_events() {
        let (sink, mut events) = ChannelAuditSink::new(4);
        sink.notify(AuditEvent::new(AuditAction::AuthSuccess).with_subject("user_1"));

        let event = events.recv().await.unwrap();
        assert_eq!(event.subject.as_deref(), Some("user_1"));
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let (sink, mut events) = ChannelAuditSink::new(1);
        sink.notify(AuditEvent::new(AuditAction::AuthSuccess));
        sink.notify(AuditEvent::new(AuditAction::AuthFailure));

        assert_eq!(events.recv().await.unwrap().action, AuditAction::AuthSuccess);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn logger_stops_on_shutdown() {
        let (sink, events) = ChannelAuditSink::new(4);
        let shutdown = CancellationToken::new();
        let task = spawn_audit_logger(events, shutdown.clone());

        sink.notify(AuditEvent::new(AuditAction::AuthSuccess));
        shutdown.cancel();

        tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
