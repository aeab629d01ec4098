//! Distribution history: append-only assignment audit rows and statistics.
//!
//! History rows are only ever inserted, and only inside the assignment
//! transactions in [`crate::conversation`] and [`crate::queue`]. There are
//! deliberately no update or delete operations here.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::Result;
use crate::models::DistributionHistoryRecord;

/// Insert one assignment audit row inside an open transaction.
pub(crate) async fn insert_history_tx(
    tx: &mut Transaction<'_, Sqlite>,
    tenant_id: i64,
    conversation_id: i64,
    attendant_id: i64,
    rule_id: Option<i64>,
    distribution_type: &str,
    wait_time_seconds: i64,
    assigned_at: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO distribution_history
            (tenant_id, conversation_id, attendant_id, rule_id, distribution_type,
             wait_time_seconds, assigned_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(tenant_id)
    .bind(conversation_id)
    .bind(attendant_id)
    .bind(rule_id)
    .bind(distribution_type)
    .bind(wait_time_seconds)
    .bind(assigned_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// List recent assignment events for a tenant, newest first.
pub async fn list_history(
    pool: &SqlitePool,
    tenant_id: i64,
    limit: i64,
) -> Result<Vec<DistributionHistoryRecord>> {
    let rows = sqlx::query_as::<_, DistributionHistoryRecord>(
        r#"
        SELECT id, tenant_id, conversation_id, attendant_id, rule_id,
               distribution_type, wait_time_seconds, assigned_at
        FROM distribution_history
        WHERE tenant_id = ?
        ORDER BY assigned_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(tenant_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Aggregate distribution statistics for a tenant.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DistributionStats {
    /// Conversations currently waiting in the queue.
    pub waiting: i64,
    /// Assignments recorded since midnight of the given day.
    pub assigned_today: i64,
    /// Average wait in seconds over today's assignments.
    pub avg_wait_seconds: f64,
}

/// Compute queue and assignment statistics as of `now`.
pub async fn stats(pool: &SqlitePool, tenant_id: i64, now: DateTime<Utc>) -> Result<DistributionStats> {
    let midnight = format!("{} 00:00:00", now.format("%Y-%m-%d"));

    let waiting = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM queue_entries
        WHERE tenant_id = ? AND status = 'waiting'
        "#,
    )
    .bind(tenant_id)
    .fetch_one(pool)
    .await?;

    let (assigned_today, avg_wait_seconds) = sqlx::query_as::<_, (i64, Option<f64>)>(
        r#"
        SELECT COUNT(*), AVG(wait_time_seconds)
        FROM distribution_history
        WHERE tenant_id = ? AND assigned_at >= ?
        "#,
    )
    .bind(tenant_id)
    .bind(&midnight)
    .fetch_one(pool)
    .await?;

    Ok(DistributionStats {
        waiting,
        assigned_today,
        avg_wait_seconds: avg_wait_seconds.unwrap_or(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_stats_counts_todays_assignments() {
        let db = test_db().await;
        let pool = db.pool();
        let now = Utc.with_ymd_and_hms(2026, 3, 16, 14, 0, 0).unwrap();

        let attendant = crate::attendant::create_attendant(pool, 1, "Ana").await.unwrap();
        let first = crate::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();
        let second = crate::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();
        let third = crate::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();

        crate::conversation::assign_conversation(pool, 1, first.id, attendant.id, None, "manual", 30, now)
            .await
            .unwrap();
        crate::conversation::assign_conversation(pool, 1, second.id, attendant.id, None, "manual", 90, now)
            .await
            .unwrap();
        crate::queue::enqueue(pool, 1, third.id, None, 0, now).await.unwrap();

        let stats = stats(pool, 1, now).await.unwrap();
        assert_eq!(stats.waiting, 1);
        assert_eq!(stats.assigned_today, 2);
        assert!((stats.avg_wait_seconds - 60.0).abs() < f64::EPSILON);

        // A different tenant sees nothing.
        let other = super::stats(pool, 2, now).await.unwrap();
        assert_eq!(other.waiting, 0);
        assert_eq!(other.assigned_today, 0);
    }
}
