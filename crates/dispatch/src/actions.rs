//! Supervisor actions on conversations: resolve, close, transfer, notes.

use chrono::{DateTime, Utc};
use database::models::{Conversation, ConversationNote, TransferRecord};
use database::validation::{self, ValidationError, MAX_NOTE_LENGTH, MAX_TEXT_LENGTH};
use database::DatabaseError;
use sqlx::SqlitePool;

use crate::engine;
use crate::error::{DispatchError, Result};
use crate::notify::Notifier;

/// Mark an open or in-progress conversation resolved.
pub async fn resolve(
    pool: &SqlitePool,
    tenant_id: i64,
    conversation_id: i64,
    now: DateTime<Utc>,
) -> Result<Conversation> {
    Ok(database::conversation::resolve_conversation(pool, tenant_id, conversation_id, now).await?)
}

/// Close and archive a conversation.
pub async fn close(
    pool: &SqlitePool,
    tenant_id: i64,
    conversation_id: i64,
    now: DateTime<Utc>,
) -> Result<Conversation> {
    Ok(database::conversation::close_conversation(pool, tenant_id, conversation_id, now).await?)
}

/// Target of a transfer: a specific attendant, a department, or both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub to_attendant: Option<i64>,
    pub to_department: Option<i64>,
    pub reason: String,
}

/// Transfer a conversation.
///
/// With a target attendant the conversation is handed over directly. With
/// only a target department it is left unassigned in that department and
/// run back through the distribution engine, which assigns or queues it
/// under the department's rules.
pub async fn transfer(
    pool: &SqlitePool,
    notifier: &dyn Notifier,
    tenant_id: i64,
    conversation_id: i64,
    request: &TransferRequest,
    now: DateTime<Utc>,
) -> Result<TransferRecord> {
    if request.to_attendant.is_none() && request.to_department.is_none() {
        return Err(DispatchError::Validation(ValidationError::Empty(
            "transfer target".to_string(),
        )));
    }
    validation::validate_text("transfer reason", &request.reason, MAX_TEXT_LENGTH)?;

    if let Some(attendant_id) = request.to_attendant {
        let attendant = database::attendant::get_attendant(pool, tenant_id, attendant_id)
            .await
            .map_err(|err| match err {
                DatabaseError::NotFound { .. } => DispatchError::AttendantNotEligible(attendant_id),
                other => DispatchError::Database(other),
            })?;
        if attendant.status != "active" {
            return Err(DispatchError::AttendantNotEligible(attendant_id));
        }
    }
    if let Some(department_id) = request.to_department {
        database::department::get_department(pool, tenant_id, department_id).await?;
    }

    let record = database::transfer::transfer_conversation(
        pool,
        tenant_id,
        conversation_id,
        request.to_attendant,
        request.to_department,
        &request.reason,
        now,
    )
    .await?;

    // Department-only transfers go back through distribution.
    if request.to_attendant.is_none() {
        match engine::distribute(pool, notifier, tenant_id, conversation_id, now).await? {
            engine::Outcome::Assigned { attendant_id, .. } => {
                tracing::info!(conversation_id, attendant_id, "transferred conversation re-assigned");
            }
            engine::Outcome::Queued { entry_id } => {
                tracing::info!(conversation_id, entry_id, "transferred conversation queued");
            }
        }
    }

    Ok(record)
}

/// Transfer history for a conversation.
pub async fn list_transfers(
    pool: &SqlitePool,
    tenant_id: i64,
    conversation_id: i64,
) -> Result<Vec<TransferRecord>> {
    Ok(database::transfer::list_transfers(pool, tenant_id, conversation_id).await?)
}

/// Attach an internal note to a conversation.
pub async fn add_note(
    pool: &SqlitePool,
    tenant_id: i64,
    conversation_id: i64,
    author_id: i64,
    body: &str,
) -> Result<ConversationNote> {
    if body.trim().is_empty() {
        return Err(DispatchError::Validation(ValidationError::Empty(
            "note body".to_string(),
        )));
    }
    validation::validate_text("note body", body, MAX_NOTE_LENGTH)?;

    Ok(database::note::add_note(pool, tenant_id, conversation_id, author_id, body).await?)
}

/// List a conversation's internal notes.
pub async fn list_notes(
    pool: &SqlitePool,
    tenant_id: i64,
    conversation_id: i64,
) -> Result<Vec<ConversationNote>> {
    Ok(database::note::list_notes(pool, tenant_id, conversation_id).await?)
}

/// Delete an internal note.
pub async fn delete_note(pool: &SqlitePool, tenant_id: i64, note_id: i64) -> Result<()> {
    Ok(database::note::delete_note(pool, tenant_id, note_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogNotifier;
    use chrono::TimeZone;
    use database::distribution_rule::NewRule;
    use database::Database;

    async fn test_db() -> Database {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn monday(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 16, h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn test_transfer_needs_a_target() {
        let db = test_db().await;
        let pool = db.pool();

        let conversation = database::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();

        let empty = TransferRequest { to_attendant: None, to_department: None, reason: String::new() };
        let refused = transfer(pool, &LogNotifier, 1, conversation.id, &empty, monday(10, 0)).await;
        assert!(matches!(refused, Err(DispatchError::Validation(_))));
    }

    #[tokio::test]
    async fn test_transfer_to_attendant_and_department() {
        let db = test_db().await;
        let pool = db.pool();

        let from_dept = database::department::create_department(pool, 1, "Sales", "#2ecc71")
            .await
            .unwrap();
        let to_dept = database::department::create_department(pool, 1, "Support", "#e74c3c")
            .await
            .unwrap();
        let ana = database::attendant::create_attendant(pool, 1, "Ana").await.unwrap();
        let bia = database::attendant::create_attendant(pool, 1, "Bia").await.unwrap();

        let conversation =
            database::conversation::create_conversation(pool, 1, "whatsapp", Some(from_dept.id), 0)
                .await
                .unwrap();
        database::conversation::assign_conversation(
            pool, 1, conversation.id, ana.id, None, "manual", 0, monday(9, 0),
        )
        .await
        .unwrap();

        let request = TransferRequest {
            to_attendant: Some(bia.id),
            to_department: Some(to_dept.id),
            reason: "overloaded".to_string(),
        };
        let record = transfer(pool, &LogNotifier, 1, conversation.id, &request, monday(10, 0))
            .await
            .unwrap();

        assert_eq!(record.from_attendant, Some(ana.id));
        assert_eq!(record.to_attendant, Some(bia.id));
        assert_eq!(record.from_department, Some(from_dept.id));
        assert_eq!(record.to_department, Some(to_dept.id));

        let conversation = database::conversation::get_conversation(pool, 1, conversation.id)
            .await
            .unwrap();
        assert_eq!(conversation.status, "transferred");
        assert_eq!(conversation.assigned_to, Some(bia.id));
        assert_eq!(conversation.department_id, Some(to_dept.id));
    }

    #[tokio::test]
    async fn test_department_only_transfer_redistributes() {
        let db = test_db().await;
        let pool = db.pool();

        let support = database::department::create_department(pool, 1, "Support", "#e74c3c")
            .await
            .unwrap();
        let ana = database::attendant::create_attendant(pool, 1, "Ana").await.unwrap();
        let bia = database::attendant::create_attendant(pool, 1, "Bia").await.unwrap();
        database::attendant::add_to_department(pool, 1, support.id, bia.id)
            .await
            .unwrap();
        database::distribution_rule::create_rule(
            pool,
            1,
            &NewRule {
                name: "always".to_string(),
                rule_type: "round_robin".to_string(),
                priority: 50,
                max_per_attendant: 5,
                auto_assign: true,
                notify_attendant: false,
                work_hours_start: "00:00".to_string(),
                work_hours_end: "24:00".to_string(),
                work_days: vec![0, 1, 2, 3, 4, 5, 6],
                is_active: true,
            },
        )
        .await
        .unwrap();

        let conversation = database::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();
        database::conversation::assign_conversation(
            pool, 1, conversation.id, ana.id, None, "manual", 0, monday(9, 0),
        )
        .await
        .unwrap();

        let request = TransferRequest {
            to_attendant: None,
            to_department: Some(support.id),
            reason: "wrong team".to_string(),
        };
        transfer(pool, &LogNotifier, 1, conversation.id, &request, monday(10, 0))
            .await
            .unwrap();

        // The engine routed it to the support department's attendant.
        let conversation = database::conversation::get_conversation(pool, 1, conversation.id)
            .await
            .unwrap();
        assert_eq!(conversation.assigned_to, Some(bia.id));
        assert_eq!(conversation.status, "in_progress");
    }

    #[tokio::test]
    async fn test_notes_validate_body() {
        let db = test_db().await;
        let pool = db.pool();

        let conversation = database::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();

        let refused = add_note(pool, 1, conversation.id, 7, "   ").await;
        assert!(matches!(refused, Err(DispatchError::Validation(_))));

        add_note(pool, 1, conversation.id, 7, "customer prefers email").await.unwrap();
        assert_eq!(list_notes(pool, 1, conversation.id).await.unwrap().len(), 1);
    }
}
