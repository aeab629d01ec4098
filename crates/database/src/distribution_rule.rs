//! Distribution rule CRUD.
//!
//! Rules are read-only to the engine; supervisors create, edit, toggle and
//! delete them here.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::DistributionRule;
use crate::validation::{
    self, ValidationError,
};

/// Rule types understood by the engine.
pub const RULE_TYPES: &[&str] = &["round_robin", "load_based"];

/// Fields for creating or replacing a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRule {
    pub name: String,
    pub rule_type: String,
    pub priority: i64,
    pub max_per_attendant: i64,
    pub auto_assign: bool,
    pub notify_attendant: bool,
    pub work_hours_start: String,
    pub work_hours_end: String,
    pub work_days: Vec<u8>,
    pub is_active: bool,
}

impl NewRule {
    /// Validate all user-supplied fields.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        validation::validate_name("rule name", &self.name)?;
        if !RULE_TYPES.contains(&self.rule_type.as_str()) {
            return Err(ValidationError::UnknownValue {
                field: "rule type".to_string(),
                value: self.rule_type.clone(),
            });
        }
        validation::parse_time_of_day(&self.work_hours_start)?;
        validation::parse_time_of_day(&self.work_hours_end)?;
        validation::validate_work_days(&self.work_days)?;
        if self.max_per_attendant <= 0 {
            return Err(ValidationError::NonPositiveId(
                "max conversations per attendant".to_string(),
            ));
        }
        Ok(())
    }

    fn work_days_json(&self) -> String {
        serde_json::to_string(&self.work_days).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Create a rule for a tenant.
pub async fn create_rule(pool: &SqlitePool, tenant_id: i64, rule: &NewRule) -> Result<DistributionRule> {
    let result = sqlx::query(
        r#"
        INSERT INTO distribution_rules
            (tenant_id, name, rule_type, priority, max_per_attendant, auto_assign,
             notify_attendant, work_hours_start, work_hours_end, work_days, is_active)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(tenant_id)
    .bind(&rule.name)
    .bind(&rule.rule_type)
    .bind(rule.priority)
    .bind(rule.max_per_attendant)
    .bind(rule.auto_assign)
    .bind(rule.notify_attendant)
    .bind(&rule.work_hours_start)
    .bind(&rule.work_hours_end)
    .bind(rule.work_days_json())
    .bind(rule.is_active)
    .execute(pool)
    .await?;

    get_rule(pool, tenant_id, result.last_insert_rowid()).await
}

/// Get a rule by id, scoped to the tenant.
pub async fn get_rule(pool: &SqlitePool, tenant_id: i64, id: i64) -> Result<DistributionRule> {
    sqlx::query_as::<_, DistributionRule>(
        r#"
        SELECT id, tenant_id, name, rule_type, priority, max_per_attendant, auto_assign,
               notify_attendant, work_hours_start, work_hours_end, work_days, is_active,
               created_at
        FROM distribution_rules
        WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "DistributionRule",
        id: id.to_string(),
    })
}

/// List all rules for a tenant in evaluation order (priority descending,
/// then id ascending).
pub async fn list_rules(pool: &SqlitePool, tenant_id: i64) -> Result<Vec<DistributionRule>> {
    let rules = sqlx::query_as::<_, DistributionRule>(
        r#"
        SELECT id, tenant_id, name, rule_type, priority, max_per_attendant, auto_assign,
               notify_attendant, work_hours_start, work_hours_end, work_days, is_active,
               created_at
        FROM distribution_rules
        WHERE tenant_id = ?
        ORDER BY priority DESC, id ASC
        "#,
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    Ok(rules)
}

/// List only active rules, in evaluation order.
pub async fn list_active_rules(pool: &SqlitePool, tenant_id: i64) -> Result<Vec<DistributionRule>> {
    let rules = sqlx::query_as::<_, DistributionRule>(
        r#"
        SELECT id, tenant_id, name, rule_type, priority, max_per_attendant, auto_assign,
               notify_attendant, work_hours_start, work_hours_end, work_days, is_active,
               created_at
        FROM distribution_rules
        WHERE tenant_id = ? AND is_active = 1
        ORDER BY priority DESC, id ASC
        "#,
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    Ok(rules)
}

/// Replace a rule's fields.
pub async fn update_rule(
    pool: &SqlitePool,
    tenant_id: i64,
    id: i64,
    rule: &NewRule,
) -> Result<DistributionRule> {
    let result = sqlx::query(
        r#"
        UPDATE distribution_rules
        SET name = ?, rule_type = ?, priority = ?, max_per_attendant = ?, auto_assign = ?,
            notify_attendant = ?, work_hours_start = ?, work_hours_end = ?, work_days = ?,
            is_active = ?
        WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(&rule.name)
    .bind(&rule.rule_type)
    .bind(rule.priority)
    .bind(rule.max_per_attendant)
    .bind(rule.auto_assign)
    .bind(rule.notify_attendant)
    .bind(&rule.work_hours_start)
    .bind(&rule.work_hours_end)
    .bind(rule.work_days_json())
    .bind(rule.is_active)
    .bind(id)
    .bind(tenant_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "DistributionRule",
            id: id.to_string(),
        });
    }

    get_rule(pool, tenant_id, id).await
}

/// Flip a rule's active flag. Returns the new state.
pub async fn toggle_rule(pool: &SqlitePool, tenant_id: i64, id: i64) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE distribution_rules
        SET is_active = 1 - is_active
        WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "DistributionRule",
            id: id.to_string(),
        });
    }

    let rule = get_rule(pool, tenant_id, id).await?;
    Ok(rule.is_active)
}

/// Delete a rule.
pub async fn delete_rule(pool: &SqlitePool, tenant_id: i64, id: i64) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM distribution_rules
        WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "DistributionRule",
            id: id.to_string(),
        });
    }

    Ok(())
}
