//! Department records.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::Department;

/// Create a new department for a tenant.
pub async fn create_department(
    pool: &SqlitePool,
    tenant_id: i64,
    name: &str,
    color: &str,
) -> Result<Department> {
    let result = sqlx::query(
        r#"
        INSERT INTO departments (tenant_id, name, color)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(tenant_id)
    .bind(name)
    .bind(color)
    .execute(pool)
    .await?;

    get_department(pool, tenant_id, result.last_insert_rowid()).await
}

/// Get a department by id, scoped to the tenant.
pub async fn get_department(pool: &SqlitePool, tenant_id: i64, id: i64) -> Result<Department> {
    sqlx::query_as::<_, Department>(
        r#"
        SELECT id, tenant_id, name, color, is_active, created_at
        FROM departments
        WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Department",
        id: id.to_string(),
    })
}

/// List all departments for a tenant.
pub async fn list_departments(pool: &SqlitePool, tenant_id: i64) -> Result<Vec<Department>> {
    let departments = sqlx::query_as::<_, Department>(
        r#"
        SELECT id, tenant_id, name, color, is_active, created_at
        FROM departments
        WHERE tenant_id = ?
        ORDER BY name
        "#,
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    Ok(departments)
}

/// Activate or deactivate a department.
pub async fn set_active(pool: &SqlitePool, tenant_id: i64, id: i64, active: bool) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE departments
        SET is_active = ?
        WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(active)
    .bind(id)
    .bind(tenant_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Department",
            id: id.to_string(),
        });
    }

    Ok(())
}
