//! The automatic distribution engine.
//!
//! Given an unassigned conversation, evaluate the tenant's active rules in
//! priority order and either assign an eligible attendant or park the
//! conversation on the waiting queue.

use chrono::{DateTime, Utc};
use database::attendant::Candidate;
use database::models::{conversation_status, distribution_type, DistributionRule};
use database::parse_timestamp;
use sqlx::SqlitePool;

use crate::error::{DispatchError, Result};
use crate::notify::Notifier;
use crate::schedule::rule_matches;

/// What the engine did with a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Assigned directly under a rule.
    Assigned { attendant_id: i64, rule_id: i64 },
    /// No eligible attendant; the conversation waits on the queue.
    Queued { entry_id: i64 },
}

/// Distribute one conversation.
///
/// Rules are evaluated highest priority first (id ascending on ties) and
/// only while their work-days/work-hours window covers `now`. The first
/// rule that yields an eligible attendant wins; a rule whose pool is
/// exhausted falls through to the next. If no rule produces a candidate
/// the conversation is enqueued, idempotently.
///
/// Assignment is atomic: the conversation update, the resolution of any
/// waiting queue entry, and the history record are one transaction. The
/// notification side effect is best-effort and happens after commit.
pub async fn distribute(
    pool: &SqlitePool,
    notifier: &dyn Notifier,
    tenant_id: i64,
    conversation_id: i64,
    now: DateTime<Utc>,
) -> Result<Outcome> {
    let conversation = database::conversation::get_conversation(pool, tenant_id, conversation_id).await?;

    let assignable = conversation.assigned_to.is_none()
        && (conversation.status == conversation_status::OPEN
            || conversation.status == conversation_status::TRANSFERRED);
    if !assignable {
        return Err(DispatchError::NotDistributable(conversation_id));
    }

    // Wait time is zero for a fresh conversation; a queued one being
    // retried keeps the clock it started when it entered the queue.
    let wait_seconds = match database::queue::waiting_for_conversation(pool, tenant_id, conversation_id).await? {
        Some(entry) => (now - parse_timestamp(&entry.queued_at)?).num_seconds().max(0),
        None => 0,
    };

    let rules = database::distribution_rule::list_active_rules(pool, tenant_id).await?;

    for rule in rules.iter().filter(|r| rule_matches(r, now)) {
        if !rule.auto_assign {
            tracing::debug!(rule_id = rule.id, "winning rule does not auto-assign");
            break;
        }

        let candidates =
            database::attendant::list_candidates(pool, tenant_id, conversation.department_id).await?;
        let Some(chosen) = select_attendant(rule, &candidates) else {
            tracing::debug!(rule_id = rule.id, "no capacity under rule, trying next");
            continue;
        };

        database::conversation::assign_conversation(
            pool,
            tenant_id,
            conversation_id,
            chosen.attendant_id,
            Some(rule.id),
            distribution_type::AUTOMATIC,
            wait_seconds,
            now,
        )
        .await?;

        if rule.notify_attendant {
            if let Err(err) = notifier
                .assignment(tenant_id, chosen.attendant_id, conversation_id)
                .await
            {
                tracing::warn!(
                    attendant_id = chosen.attendant_id,
                    error = %err,
                    "assignment notification failed"
                );
            }
        }

        return Ok(Outcome::Assigned {
            attendant_id: chosen.attendant_id,
            rule_id: rule.id,
        });
    }

    let entry = database::queue::enqueue(
        pool,
        tenant_id,
        conversation_id,
        conversation.department_id,
        conversation.priority,
        now,
    )
    .await?;

    tracing::info!(conversation_id, entry_id = entry.id, "conversation queued");

    Ok(Outcome::Queued { entry_id: entry.id })
}

/// Pick an attendant from the candidate pool under a rule's policy.
///
/// Capacity is enforced first: anyone at or over the rule's per-attendant
/// maximum is out. Round-robin picks the least recently assigned (never
/// assigned sorts first); load-based picks the lowest current load. Both
/// break remaining ties by attendant id so evaluation is reproducible.
fn select_attendant<'a>(rule: &DistributionRule, candidates: &'a [Candidate]) -> Option<&'a Candidate> {
    let eligible = candidates
        .iter()
        .filter(|c| c.active_count < rule.max_per_attendant);

    match rule.rule_type.as_str() {
        "load_based" => eligible.min_by_key(|c| (c.active_count, c.attendant_id)),
        // round_robin and anything unrecognized
        _ => eligible.min_by_key(|c| (c.last_assigned_at.clone(), c.attendant_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{LogNotifier, NotifyError};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use database::distribution_rule::NewRule;
    use database::Database;
    use std::sync::Mutex;

    async fn test_db() -> Database {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();
        db
    }

    /// Monday 2026-03-16 at the given time.
    fn monday(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 16, h, m, s).unwrap()
    }

    fn rule(name: &str, priority: i64, max: i64) -> NewRule {
        NewRule {
            name: name.to_string(),
            rule_type: "round_robin".to_string(),
            priority,
            max_per_attendant: max,
            auto_assign: true,
            notify_attendant: false,
            work_hours_start: "00:00".to_string(),
            work_hours_end: "24:00".to_string(),
            work_days: vec![0, 1, 2, 3, 4, 5, 6],
            is_active: true,
        }
    }

    struct RecordingNotifier {
        events: Mutex<Vec<(i64, i64)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn assignment(
            &self,
            _tenant_id: i64,
            attendant_id: i64,
            conversation_id: i64,
        ) -> std::result::Result<(), NotifyError> {
            self.events.lock().unwrap().push((attendant_id, conversation_id));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_highest_priority_rule_wins_deterministically() {
        let db = test_db().await;
        let pool = db.pool();

        database::attendant::create_attendant(pool, 1, "Ana").await.unwrap();
        let low = database::distribution_rule::create_rule(pool, 1, &rule("low", 10, 5))
            .await
            .unwrap();
        let high = database::distribution_rule::create_rule(pool, 1, &rule("high", 80, 5))
            .await
            .unwrap();
        assert!(low.id < high.id);

        for _ in 0..3 {
            let conversation =
                database::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
                    .await
                    .unwrap();
            let outcome = distribute(pool, &LogNotifier, 1, conversation.id, monday(10, 0, 0))
                .await
                .unwrap();
            match outcome {
                Outcome::Assigned { rule_id, .. } => assert_eq!(rule_id, high.id),
                other => panic!("expected assignment, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_priority_ties_break_by_insertion_order() {
        let db = test_db().await;
        let pool = db.pool();

        database::attendant::create_attendant(pool, 1, "Ana").await.unwrap();
        let first = database::distribution_rule::create_rule(pool, 1, &rule("tie a", 50, 5))
            .await
            .unwrap();
        let _second = database::distribution_rule::create_rule(pool, 1, &rule("tie b", 50, 5))
            .await
            .unwrap();

        let conversation = database::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();
        let outcome = distribute(pool, &LogNotifier, 1, conversation.id, monday(10, 0, 0))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Assigned { rule_id, .. } if rule_id == first.id));
    }

    #[tokio::test]
    async fn test_out_of_window_rules_are_skipped() {
        let db = test_db().await;
        let pool = db.pool();

        database::attendant::create_attendant(pool, 1, "Ana").await.unwrap();
        let mut office_hours = rule("office", 50, 5);
        office_hours.work_hours_start = "08:00".to_string();
        office_hours.work_hours_end = "18:00".to_string();
        office_hours.work_days = vec![1, 2, 3, 4, 5];
        database::distribution_rule::create_rule(pool, 1, &office_hours)
            .await
            .unwrap();

        // Monday 19:00 is outside the window: queued, not assigned.
        let conversation = database::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();
        let outcome = distribute(pool, &LogNotifier, 1, conversation.id, monday(19, 0, 0))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Queued { .. }));

        // Inside the window the same rule assigns.
        let conversation = database::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();
        let outcome = distribute(pool, &LogNotifier, 1, conversation.id, monday(10, 0, 0))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Assigned { .. }));
    }

    #[tokio::test]
    async fn test_capacity_is_respected() {
        let db = test_db().await;
        let pool = db.pool();

        let attendant = database::attendant::create_attendant(pool, 1, "Ana").await.unwrap();
        let capped = database::distribution_rule::create_rule(pool, 1, &rule("capped", 50, 1))
            .await
            .unwrap();

        let first = database::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();
        let outcome = distribute(pool, &LogNotifier, 1, first.id, monday(10, 0, 0))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Assigned { rule_id, .. } if rule_id == capped.id));

        let count = database::conversation::count_active_for_attendant(pool, 1, attendant.id)
            .await
            .unwrap();
        assert_eq!(count, 1);

        // Pool is exhausted now; the next conversation waits.
        let second = database::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();
        let outcome = distribute(pool, &LogNotifier, 1, second.id, monday(10, 1, 0))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Queued { .. }));
        assert_eq!(
            database::conversation::count_active_for_attendant(pool, 1, attendant.id)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_full_rule_falls_through_to_lower_priority() {
        let db = test_db().await;
        let pool = db.pool();

        let attendant = database::attendant::create_attendant(pool, 1, "Ana").await.unwrap();

        let mut strict = rule("strict", 80, 1);
        strict.work_hours_start = "08:00".to_string();
        strict.work_hours_end = "18:00".to_string();
        database::distribution_rule::create_rule(pool, 1, &strict).await.unwrap();
        let relaxed = database::distribution_rule::create_rule(pool, 1, &rule("relaxed", 50, 5))
            .await
            .unwrap();

        // Fill the attendant to the strict rule's cap.
        let first = database::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();
        distribute(pool, &LogNotifier, 1, first.id, monday(10, 0, 0)).await.unwrap();

        // The strict pool is full, so the relaxed rule picks it up.
        let second = database::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();
        let outcome = distribute(pool, &LogNotifier, 1, second.id, monday(10, 1, 0))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Assigned { rule_id, attendant_id }
            if rule_id == relaxed.id && attendant_id == attendant.id));
    }

    #[tokio::test]
    async fn test_round_robin_prefers_least_recently_assigned() {
        let db = test_db().await;
        let pool = db.pool();

        let ana = database::attendant::create_attendant(pool, 1, "Ana").await.unwrap();
        let bia = database::attendant::create_attendant(pool, 1, "Bia").await.unwrap();
        database::distribution_rule::create_rule(pool, 1, &rule("rr", 50, 10))
            .await
            .unwrap();

        let mut assigned = Vec::new();
        for i in 0..3 {
            let conversation =
                database::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
                    .await
                    .unwrap();
            let outcome = distribute(pool, &LogNotifier, 1, conversation.id, monday(10, i, 0))
                .await
                .unwrap();
            if let Outcome::Assigned { attendant_id, .. } = outcome {
                assigned.push(attendant_id);
            }
        }

        // Never-assigned first (by id), then back to the oldest assignment.
        assert_eq!(assigned, vec![ana.id, bia.id, ana.id]);
    }

    #[tokio::test]
    async fn test_load_based_prefers_lowest_load() {
        let db = test_db().await;
        let pool = db.pool();

        let busy = database::attendant::create_attendant(pool, 1, "Ana").await.unwrap();
        let idle = database::attendant::create_attendant(pool, 1, "Bia").await.unwrap();

        // Pre-load the first attendant outside the engine.
        for _ in 0..2 {
            let conversation =
                database::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
                    .await
                    .unwrap();
            database::conversation::assign_conversation(
                pool, 1, conversation.id, busy.id, None, "manual", 0, monday(9, 0, 0),
            )
            .await
            .unwrap();
        }

        let mut by_load = rule("load", 50, 10);
        by_load.rule_type = "load_based".to_string();
        database::distribution_rule::create_rule(pool, 1, &by_load).await.unwrap();

        let conversation = database::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();
        let outcome = distribute(pool, &LogNotifier, 1, conversation.id, monday(10, 0, 0))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Assigned { attendant_id, .. } if attendant_id == idle.id));
    }

    #[tokio::test]
    async fn test_department_scopes_the_candidate_pool() {
        let db = test_db().await;
        let pool = db.pool();

        let sales = database::department::create_department(pool, 1, "Sales", "#2ecc71")
            .await
            .unwrap();
        let in_sales = database::attendant::create_attendant(pool, 1, "Ana").await.unwrap();
        let _elsewhere = database::attendant::create_attendant(pool, 1, "Bia").await.unwrap();
        database::attendant::add_to_department(pool, 1, sales.id, in_sales.id)
            .await
            .unwrap();
        database::distribution_rule::create_rule(pool, 1, &rule("rr", 50, 5))
            .await
            .unwrap();

        let conversation =
            database::conversation::create_conversation(pool, 1, "whatsapp", Some(sales.id), 0)
                .await
                .unwrap();
        let outcome = distribute(pool, &LogNotifier, 1, conversation.id, monday(10, 0, 0))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Assigned { attendant_id, .. } if attendant_id == in_sales.id));
    }

    #[tokio::test]
    async fn test_no_rules_means_queued_idempotently() {
        let db = test_db().await;
        let pool = db.pool();

        let conversation = database::conversation::create_conversation(pool, 1, "whatsapp", None, 3)
            .await
            .unwrap();

        let first = distribute(pool, &LogNotifier, 1, conversation.id, monday(10, 0, 0))
            .await
            .unwrap();
        let second = distribute(pool, &LogNotifier, 1, conversation.id, monday(10, 5, 0))
            .await
            .unwrap();

        // Same waiting entry both times.
        assert_eq!(first, second);
        let waiting = database::queue::list_waiting(pool, 1).await.unwrap();
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].priority, 3);
    }

    #[tokio::test]
    async fn test_non_auto_assign_rule_queues() {
        let db = test_db().await;
        let pool = db.pool();

        database::attendant::create_attendant(pool, 1, "Ana").await.unwrap();
        let mut manual_only = rule("manual only", 50, 5);
        manual_only.auto_assign = false;
        database::distribution_rule::create_rule(pool, 1, &manual_only)
            .await
            .unwrap();

        let conversation = database::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();
        let outcome = distribute(pool, &LogNotifier, 1, conversation.id, monday(10, 0, 0))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Queued { .. }));
    }

    #[tokio::test]
    async fn test_notify_flag_emits_event() {
        let db = test_db().await;
        let pool = db.pool();

        let attendant = database::attendant::create_attendant(pool, 1, "Ana").await.unwrap();
        let mut noisy = rule("noisy", 50, 5);
        noisy.notify_attendant = true;
        database::distribution_rule::create_rule(pool, 1, &noisy).await.unwrap();

        let notifier = RecordingNotifier { events: Mutex::new(Vec::new()) };
        let conversation = database::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();
        distribute(pool, &notifier, 1, conversation.id, monday(10, 0, 0))
            .await
            .unwrap();

        let events = notifier.events.lock().unwrap();
        assert_eq!(*events, vec![(attendant.id, conversation.id)]);
    }

    #[tokio::test]
    async fn test_closed_and_assigned_conversations_are_refused() {
        let db = test_db().await;
        let pool = db.pool();

        let attendant = database::attendant::create_attendant(pool, 1, "Ana").await.unwrap();
        database::distribution_rule::create_rule(pool, 1, &rule("rr", 50, 5))
            .await
            .unwrap();

        let closed = database::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();
        database::conversation::close_conversation(pool, 1, closed.id, monday(9, 0, 0))
            .await
            .unwrap();
        let refused = distribute(pool, &LogNotifier, 1, closed.id, monday(10, 0, 0)).await;
        assert!(matches!(refused, Err(DispatchError::NotDistributable(_))));

        let taken = database::conversation::create_conversation(pool, 1, "whatsapp", None, 0)
            .await
            .unwrap();
        database::conversation::assign_conversation(
            pool, 1, taken.id, attendant.id, None, "manual", 0, monday(9, 30, 0),
        )
        .await
        .unwrap();
        let refused = distribute(pool, &LogNotifier, 1, taken.id, monday(10, 0, 0)).await;
        assert!(matches!(refused, Err(DispatchError::NotDistributable(_))));
    }
}
