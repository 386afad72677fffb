// ABOUTME: Collaborator traits consumed by the workflow core
// ABOUTME: User directory lookup, audit-log sink, and notification dispatch

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::types::AuditEntry;

/// A user as known to the enterprise directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUser {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
    pub name: String,
    #[serde(rename = "objectId")]
    pub object_id: Option<String>,
}

/// Directory lookup by email. Absence of a user is not an error.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Option<DirectoryUser>;
}

/// Append-only audit-log sink, mirroring the submission-embedded trail.
/// Implementations must not fail the caller; delivery is best-effort.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entity_id: &str, entry: &AuditEntry);
}

#[derive(Debug, Error)]
#[error("Notification dispatch failed: {0}")]
pub struct DispatchError(pub String);

/// An in-app/email/chat notification. Transport selection lives outside
/// the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "recipientEmail")]
    pub recipient_email: String,
    pub subject: String,
    pub body: String,
    #[serde(rename = "entityId")]
    pub entity_id: String,
}

/// Outbound notification dispatcher. The core invokes it on approval
/// request creation but never depends on delivery succeeding.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notification: Notification) -> Result<(), DispatchError>;
}

/// Directory that knows no one; used where enrichment is optional.
#[derive(Debug, Default)]
pub struct EmptyDirectory;

#[async_trait]
impl UserDirectory for EmptyDirectory {
    async fn find_user_by_email(&self, _email: &str) -> Option<DirectoryUser> {
        None
    }
}

/// Audit sink that only traces entries.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn append(&self, entity_id: &str, entry: &AuditEntry) {
        debug!("audit {}: {} by {}", entity_id, entry.action, entry.actor);
    }
}

/// Dispatcher that drops notifications after tracing them.
#[derive(Debug, Default)]
pub struct NullDispatcher;

#[async_trait]
impl NotificationDispatcher for NullDispatcher {
    async fn dispatch(&self, notification: Notification) -> Result<(), DispatchError> {
        debug!(
            "dropping notification to {}: {}",
            notification.recipient_email, notification.subject
        );
        Ok(())
    }
}

/// Test dispatcher that records everything it is handed.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    sent: tokio::sync::Mutex<Vec<Notification>>,
}

impl RecordingDispatcher {
    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, notification: Notification) -> Result<(), DispatchError> {
        self.sent.lock().await.push(notification);
        Ok(())
    }
}
