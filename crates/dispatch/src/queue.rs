//! Queue manager: drain-order listing, manual override assignment, the
//! auto-retry pass, and distribution statistics.

use chrono::{DateTime, Utc};
use database::history::DistributionStats;
use database::models::{distribution_type, queue_status, QueueEntry};
use database::DatabaseError;
use sqlx::SqlitePool;

use crate::engine::{self, Outcome};
use crate::error::{DispatchError, Result};
use crate::notify::Notifier;

/// List a tenant's waiting conversations in drain order (priority
/// descending, oldest first within the same priority).
pub async fn list_waiting(pool: &SqlitePool, tenant_id: i64) -> Result<Vec<QueueEntry>> {
    Ok(database::queue::list_waiting(pool, tenant_id).await?)
}

/// Manually assign a waiting queue entry to an attendant.
///
/// The entry must still be waiting (a concurrent automatic assignment may
/// have resolved it first) and the attendant must be an active member of
/// the tenant. No capacity check applies: supervisors may force-assign
/// during overload. The claim, the conversation update, and the history
/// record are one transaction.
pub async fn assign_manual(
    pool: &SqlitePool,
    tenant_id: i64,
    entry_id: i64,
    attendant_id: i64,
    now: DateTime<Utc>,
) -> Result<QueueEntry> {
    let entry = database::queue::get_entry(pool, tenant_id, entry_id).await?;
    if entry.status != queue_status::WAITING {
        return Err(DispatchError::AlreadyAssigned(entry_id));
    }

    let attendant = database::attendant::get_attendant(pool, tenant_id, attendant_id)
        .await
        .map_err(|err| match err {
            DatabaseError::NotFound { .. } => DispatchError::AttendantNotEligible(attendant_id),
            other => DispatchError::Database(other),
        })?;
    if attendant.status != "active" {
        return Err(DispatchError::AttendantNotEligible(attendant_id));
    }

    // The claim inside re-checks `waiting`; losing it means an automatic
    // assignment got there between our read and the transaction.
    database::queue::assign_from_queue(
        pool,
        tenant_id,
        entry_id,
        attendant_id,
        None,
        distribution_type::MANUAL,
        now,
    )
    .await
    .map_err(|err| match err {
        DatabaseError::Conflict { entity: "QueueEntry", .. } => {
            DispatchError::AlreadyAssigned(entry_id)
        }
        other => DispatchError::Database(other),
    })
}

/// Result of one auto-retry pass over the waiting queue.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RetryReport {
    pub assigned: usize,
    pub still_waiting: usize,
}

/// Re-run the distribution engine over every waiting entry, in drain
/// order. Entries whose conversation finds capacity are assigned with
/// their accumulated wait time; the rest keep waiting. Meant to be
/// triggered periodically by an external scheduler.
pub async fn retry_queue(
    pool: &SqlitePool,
    notifier: &dyn Notifier,
    tenant_id: i64,
    now: DateTime<Utc>,
) -> Result<RetryReport> {
    let waiting = database::queue::list_waiting(pool, tenant_id).await?;
    let mut report = RetryReport { assigned: 0, still_waiting: 0 };

    for entry in waiting {
        match engine::distribute(pool, notifier, tenant_id, entry.conversation_id, now).await {
            Ok(Outcome::Assigned { .. }) => report.assigned += 1,
            Ok(Outcome::Queued { .. }) => report.still_waiting += 1,
            // Resolved or closed out from under us between the listing and
            // this iteration; nothing to do for the entry.
            Err(DispatchError::NotDistributable(_))
            | Err(DispatchError::Database(DatabaseError::Conflict { .. })) => {
                report.still_waiting += 1;
            }
            Err(other) => return Err(other),
        }
    }

    tracing::info!(
        tenant_id,
        assigned = report.assigned,
        still_waiting = report.still_waiting,
        "queue retry pass complete"
    );

    Ok(report)
}

/// Queue and assignment statistics as of `now`.
pub async fn stats(pool: &SqlitePool, tenant_id: i64, now: DateTime<Utc>) -> Result<DistributionStats> {
    Ok(database::history::stats(pool, tenant_id, now).await?)
}
