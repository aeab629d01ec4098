//! Notification seam toward the external messaging collaborator.
//!
//! Notification is best-effort: a failure here is logged by the caller and
//! never rolls back the assignment that triggered it.

use async_trait::async_trait;

/// Failure reported by a notification channel.
#[derive(Debug, thiserror::Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Delivers assignment notifications to attendants.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Tell an attendant a conversation has been assigned to them.
    async fn assignment(
        &self,
        tenant_id: i64,
        attendant_id: i64,
        conversation_id: i64,
    ) -> Result<(), NotifyError>;
}

/// Default notifier: records the event in the log for the channel
/// collaborator to pick up.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn assignment(
        &self,
        tenant_id: i64,
        attendant_id: i64,
        conversation_id: i64,
    ) -> Result<(), NotifyError> {
        tracing::info!(tenant_id, attendant_id, conversation_id, "assignment notification");
        Ok(())
    }
}
