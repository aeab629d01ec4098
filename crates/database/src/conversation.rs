//! Conversation records and assignment/lifecycle updates.
//!
//! Contended rows (assignment) are mutated through single conditional
//! updates so two racing resolvers cannot both win the same conversation.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::Conversation;
use crate::timestamp::format_timestamp;

/// Create a conversation. Called on behalf of the message-ingestion
/// collaborator and by tests.
pub async fn create_conversation(
    pool: &SqlitePool,
    tenant_id: i64,
    channel: &str,
    department_id: Option<i64>,
    priority: i64,
) -> Result<Conversation> {
    let result = sqlx::query(
        r#"
        INSERT INTO conversations (tenant_id, channel, department_id, priority)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(tenant_id)
    .bind(channel)
    .bind(department_id)
    .bind(priority)
    .execute(pool)
    .await?;

    get_conversation(pool, tenant_id, result.last_insert_rowid()).await
}

/// Get a conversation by id, scoped to the tenant.
pub async fn get_conversation(pool: &SqlitePool, tenant_id: i64, id: i64) -> Result<Conversation> {
    sqlx::query_as::<_, Conversation>(
        r#"
        SELECT id, tenant_id, channel, status, assigned_to, department_id, priority,
               is_archived, created_at, started_at, resolved_at, closed_at
        FROM conversations
        WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Conversation",
        id: id.to_string(),
    })
}

/// Count an attendant's conversations in status open or in_progress.
pub async fn count_active_for_attendant(
    pool: &SqlitePool,
    tenant_id: i64,
    attendant_id: i64,
) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM conversations
        WHERE tenant_id = ? AND assigned_to = ? AND status IN ('open', 'in_progress')
        "#,
    )
    .bind(tenant_id)
    .bind(attendant_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Assign a conversation to an attendant and record the assignment, in one
/// transaction.
///
/// The conversation update is conditional: it only succeeds while the row
/// is still unassigned and in an assignable status. Any waiting queue entry
/// for the conversation is resolved in the same transaction, so the
/// one-waiting-entry invariant survives direct assignment. If any write
/// fails the transaction rolls back and the conversation stays eligible for
/// retry.
pub async fn assign_conversation(
    pool: &SqlitePool,
    tenant_id: i64,
    conversation_id: i64,
    attendant_id: i64,
    rule_id: Option<i64>,
    distribution_type: &str,
    wait_time_seconds: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    let ts = format_timestamp(now);
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        r#"
        UPDATE conversations
        SET assigned_to = ?, status = 'in_progress', started_at = COALESCE(started_at, ?)
        WHERE id = ? AND tenant_id = ?
          AND assigned_to IS NULL
          AND status IN ('open', 'in_progress', 'transferred')
        "#,
    )
    .bind(attendant_id)
    .bind(&ts)
    .bind(conversation_id)
    .bind(tenant_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(DatabaseError::Conflict {
            entity: "Conversation",
            id: conversation_id.to_string(),
            expected: "awaiting assignment",
        });
    }

    sqlx::query(
        r#"
        UPDATE queue_entries
        SET status = 'assigned', assigned_to = ?, assigned_at = ?, wait_time_seconds = ?
        WHERE conversation_id = ? AND tenant_id = ? AND status = 'waiting'
        "#,
    )
    .bind(attendant_id)
    .bind(&ts)
    .bind(wait_time_seconds)
    .bind(conversation_id)
    .bind(tenant_id)
    .execute(&mut *tx)
    .await?;

    crate::history::insert_history_tx(
        &mut tx,
        tenant_id,
        conversation_id,
        attendant_id,
        rule_id,
        distribution_type,
        wait_time_seconds,
        &ts,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        conversation_id,
        attendant_id,
        distribution_type,
        "conversation assigned"
    );

    Ok(())
}

/// Resolve an open or in-progress conversation.
pub async fn resolve_conversation(
    pool: &SqlitePool,
    tenant_id: i64,
    id: i64,
    now: DateTime<Utc>,
) -> Result<Conversation> {
    let result = sqlx::query(
        r#"
        UPDATE conversations
        SET status = 'resolved', resolved_at = ?
        WHERE id = ? AND tenant_id = ? AND status IN ('open', 'in_progress')
        "#,
    )
    .bind(format_timestamp(now))
    .bind(id)
    .bind(tenant_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        // Distinguish missing from wrong-state for the error taxonomy.
        get_conversation(pool, tenant_id, id).await?;
        return Err(DatabaseError::Conflict {
            entity: "Conversation",
            id: id.to_string(),
            expected: "open or in progress",
        });
    }

    get_conversation(pool, tenant_id, id).await
}

/// Close any non-closed conversation and archive it.
pub async fn close_conversation(
    pool: &SqlitePool,
    tenant_id: i64,
    id: i64,
    now: DateTime<Utc>,
) -> Result<Conversation> {
    let result = sqlx::query(
        r#"
        UPDATE conversations
        SET status = 'closed', closed_at = ?, is_archived = 1
        WHERE id = ? AND tenant_id = ? AND status != 'closed'
        "#,
    )
    .bind(format_timestamp(now))
    .bind(id)
    .bind(tenant_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        get_conversation(pool, tenant_id, id).await?;
        return Err(DatabaseError::Conflict {
            entity: "Conversation",
            id: id.to_string(),
            expected: "not yet closed",
        });
    }

    get_conversation(pool, tenant_id, id).await
}
