//! Waiting-queue entries and the manual/auto assignment transaction.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::QueueEntry;
use crate::timestamp::{format_timestamp, parse_timestamp};

/// Put a conversation on the waiting queue.
///
/// Idempotent: a conversation already waiting keeps its original entry and
/// queued_at. The partial unique index on waiting entries backs this up
/// against races.
pub async fn enqueue(
    pool: &SqlitePool,
    tenant_id: i64,
    conversation_id: i64,
    department_id: Option<i64>,
    priority: i64,
    now: DateTime<Utc>,
) -> Result<QueueEntry> {
    sqlx::query(
        r#"
        INSERT INTO queue_entries
            (tenant_id, conversation_id, department_id, priority, status, queued_at)
        VALUES (?, ?, ?, ?, 'waiting', ?)
        ON CONFLICT (conversation_id) WHERE status = 'waiting' DO NOTHING
        "#,
    )
    .bind(tenant_id)
    .bind(conversation_id)
    .bind(department_id)
    .bind(priority)
    .bind(format_timestamp(now))
    .execute(pool)
    .await?;

    waiting_for_conversation(pool, tenant_id, conversation_id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "QueueEntry",
            id: conversation_id.to_string(),
        })
}

/// Get a queue entry by id, scoped to the tenant.
pub async fn get_entry(pool: &SqlitePool, tenant_id: i64, id: i64) -> Result<QueueEntry> {
    sqlx::query_as::<_, QueueEntry>(
        r#"
        SELECT id, tenant_id, conversation_id, department_id, priority, status,
               queued_at, assigned_to, assigned_at, wait_time_seconds
        FROM queue_entries
        WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "QueueEntry",
        id: id.to_string(),
    })
}

/// Get the waiting entry for a conversation, if one exists.
pub async fn waiting_for_conversation(
    pool: &SqlitePool,
    tenant_id: i64,
    conversation_id: i64,
) -> Result<Option<QueueEntry>> {
    let entry = sqlx::query_as::<_, QueueEntry>(
        r#"
        SELECT id, tenant_id, conversation_id, department_id, priority, status,
               queued_at, assigned_to, assigned_at, wait_time_seconds
        FROM queue_entries
        WHERE conversation_id = ? AND tenant_id = ? AND status = 'waiting'
        "#,
    )
    .bind(conversation_id)
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?;

    Ok(entry)
}

/// List waiting entries in drain order: priority descending, then oldest
/// first, then id for a stable total order.
pub async fn list_waiting(pool: &SqlitePool, tenant_id: i64) -> Result<Vec<QueueEntry>> {
    let entries = sqlx::query_as::<_, QueueEntry>(
        r#"
        SELECT id, tenant_id, conversation_id, department_id, priority, status,
               queued_at, assigned_to, assigned_at, wait_time_seconds
        FROM queue_entries
        WHERE tenant_id = ? AND status = 'waiting'
        ORDER BY priority DESC, queued_at ASC, id ASC
        "#,
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Resolve a waiting queue entry by assigning its conversation.
///
/// One transaction covers the three writes of the contract: claim the entry
/// (conditional on it still being `waiting`), assign the conversation, and
/// record the assignment. Wait time is the elapsed seconds between
/// queued_at and `now`, fixed at claim time. Losing the claim surfaces as
/// [`DatabaseError::Conflict`].
pub async fn assign_from_queue(
    pool: &SqlitePool,
    tenant_id: i64,
    entry_id: i64,
    attendant_id: i64,
    rule_id: Option<i64>,
    distribution_type: &str,
    now: DateTime<Utc>,
) -> Result<QueueEntry> {
    let entry = get_entry(pool, tenant_id, entry_id).await?;
    let wait_seconds = (now - parse_timestamp(&entry.queued_at)?)
        .num_seconds()
        .max(0);
    let ts = format_timestamp(now);

    let mut tx = pool.begin().await?;

    let claimed = sqlx::query(
        r#"
        UPDATE queue_entries
        SET status = 'assigned', assigned_to = ?, assigned_at = ?, wait_time_seconds = ?
        WHERE id = ? AND tenant_id = ? AND status = 'waiting'
        "#,
    )
    .bind(attendant_id)
    .bind(&ts)
    .bind(wait_seconds)
    .bind(entry_id)
    .bind(tenant_id)
    .execute(&mut *tx)
    .await?;

    if claimed.rows_affected() == 0 {
        return Err(DatabaseError::Conflict {
            entity: "QueueEntry",
            id: entry_id.to_string(),
            expected: "waiting",
        });
    }

    let assigned = sqlx::query(
        r#"
        UPDATE conversations
        SET assigned_to = ?, status = 'in_progress', started_at = COALESCE(started_at, ?)
        WHERE id = ? AND tenant_id = ? AND status NOT IN ('closed')
        "#,
    )
    .bind(attendant_id)
    .bind(&ts)
    .bind(entry.conversation_id)
    .bind(tenant_id)
    .execute(&mut *tx)
    .await?;

    if assigned.rows_affected() == 0 {
        return Err(DatabaseError::Conflict {
            entity: "Conversation",
            id: entry.conversation_id.to_string(),
            expected: "assignable",
        });
    }

    crate::history::insert_history_tx(
        &mut tx,
        tenant_id,
        entry.conversation_id,
        attendant_id,
        rule_id,
        distribution_type,
        wait_seconds,
        &ts,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        entry_id,
        conversation_id = entry.conversation_id,
        attendant_id,
        wait_seconds,
        "queue entry assigned"
    );

    get_entry(pool, tenant_id, entry_id).await
}
