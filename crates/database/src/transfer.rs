//! Conversation transfers: reassignment plus an append-only audit row.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Conversation, TransferRecord};
use crate::timestamp::format_timestamp;

/// Transfer a conversation to another attendant and/or department.
///
/// The conversation update and the audit row are written in one
/// transaction; if either fails, neither is applied. Passing no target
/// attendant leaves the conversation unassigned (status `transferred`),
/// ready for the distribution engine to pick up in the target department.
pub async fn transfer_conversation(
    pool: &SqlitePool,
    tenant_id: i64,
    conversation_id: i64,
    to_attendant: Option<i64>,
    to_department: Option<i64>,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<TransferRecord> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query_as::<_, Conversation>(
        r#"
        SELECT id, tenant_id, channel, status, assigned_to, department_id, priority,
               is_archived, created_at, started_at, resolved_at, closed_at
        FROM conversations
        WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(conversation_id)
    .bind(tenant_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Conversation",
        id: conversation_id.to_string(),
    })?;

    sqlx::query(
        r#"
        UPDATE conversations
        SET assigned_to = ?, department_id = COALESCE(?, department_id), status = 'transferred'
        WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(to_attendant)
    .bind(to_department)
    .bind(conversation_id)
    .bind(tenant_id)
    .execute(&mut *tx)
    .await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO conversation_transfers
            (tenant_id, conversation_id, from_attendant, to_attendant,
             from_department, to_department, reason, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(tenant_id)
    .bind(conversation_id)
    .bind(current.assigned_to)
    .bind(to_attendant)
    .bind(current.department_id)
    .bind(to_department)
    .bind(reason)
    .bind(format_timestamp(now))
    .execute(&mut *tx)
    .await?;

    let record = sqlx::query_as::<_, TransferRecord>(
        r#"
        SELECT id, tenant_id, conversation_id, from_attendant, to_attendant,
               from_department, to_department, reason, created_at
        FROM conversation_transfers
        WHERE id = ?
        "#,
    )
    .bind(inserted.last_insert_rowid())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        conversation_id,
        from_attendant = ?record.from_attendant,
        to_attendant = ?record.to_attendant,
        "conversation transferred"
    );

    Ok(record)
}

/// List transfers for a conversation, oldest first.
pub async fn list_transfers(
    pool: &SqlitePool,
    tenant_id: i64,
    conversation_id: i64,
) -> Result<Vec<TransferRecord>> {
    let records = sqlx::query_as::<_, TransferRecord>(
        r#"
        SELECT id, tenant_id, conversation_id, from_attendant, to_attendant,
               from_department, to_department, reason, created_at
        FROM conversation_transfers
        WHERE conversation_id = ? AND tenant_id = ?
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(conversation_id)
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_transfer_records_both_sides() {
        let db = test_db().await;
        let pool = db.pool();
        let now = Utc.with_ymd_and_hms(2026, 3, 16, 15, 0, 0).unwrap();

        let from_dept = crate::department::create_department(pool, 1, "Sales", "#2ecc71")
            .await
            .unwrap();
        let to_dept = crate::department::create_department(pool, 1, "Support", "#e74c3c")
            .await
            .unwrap();
        let from_attendant = crate::attendant::create_attendant(pool, 1, "Ana").await.unwrap();
        let to_attendant = crate::attendant::create_attendant(pool, 1, "Bia").await.unwrap();

        let conversation =
            crate::conversation::create_conversation(pool, 1, "whatsapp", Some(from_dept.id), 0)
                .await
                .unwrap();
        crate::conversation::assign_conversation(
            pool, 1, conversation.id, from_attendant.id, None, "manual", 0, now,
        )
        .await
        .unwrap();

        let record = transfer_conversation(
            pool,
            1,
            conversation.id,
            Some(to_attendant.id),
            Some(to_dept.id),
            "overloaded",
            now,
        )
        .await
        .unwrap();

        assert_eq!(record.from_attendant, Some(from_attendant.id));
        assert_eq!(record.to_attendant, Some(to_attendant.id));
        assert_eq!(record.from_department, Some(from_dept.id));
        assert_eq!(record.to_department, Some(to_dept.id));
        assert_eq!(record.reason, "overloaded");

        let conversation = crate::conversation::get_conversation(pool, 1, conversation.id)
            .await
            .unwrap();
        assert_eq!(conversation.status, "transferred");
        assert_eq!(conversation.assigned_to, Some(to_attendant.id));
        assert_eq!(conversation.department_id, Some(to_dept.id));

        assert_eq!(list_transfers(pool, 1, record.conversation_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transfer_without_attendant_unassigns() {
        let db = test_db().await;
        let pool = db.pool();
        let now = Utc.with_ymd_and_hms(2026, 3, 16, 15, 0, 0).unwrap();

        let dept = crate::department::create_department(pool, 1, "Support", "#e74c3c")
            .await
            .unwrap();
        let attendant = crate::attendant::create_attendant(pool, 1, "Ana").await.unwrap();
        let conversation = crate::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();
        crate::conversation::assign_conversation(
            pool, 1, conversation.id, attendant.id, None, "manual", 0, now,
        )
        .await
        .unwrap();

        transfer_conversation(pool, 1, conversation.id, None, Some(dept.id), "wrong team", now)
            .await
            .unwrap();

        let conversation = crate::conversation::get_conversation(pool, 1, conversation.id)
            .await
            .unwrap();
        assert_eq!(conversation.assigned_to, None);
        assert_eq!(conversation.department_id, Some(dept.id));
        assert_eq!(conversation.status, "transferred");
    }
}
