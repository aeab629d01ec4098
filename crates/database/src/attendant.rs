//! Attendant records and candidate listing for the distribution engine.

use sqlx::{FromRow, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::Attendant;

/// Create a new attendant for a tenant.
pub async fn create_attendant(pool: &SqlitePool, tenant_id: i64, name: &str) -> Result<Attendant> {
    let result = sqlx::query(
        r#"
        INSERT INTO attendants (tenant_id, name)
        VALUES (?, ?)
        "#,
    )
    .bind(tenant_id)
    .bind(name)
    .execute(pool)
    .await?;

    get_attendant(pool, tenant_id, result.last_insert_rowid()).await
}

/// Get an attendant by id, scoped to the tenant.
pub async fn get_attendant(pool: &SqlitePool, tenant_id: i64, id: i64) -> Result<Attendant> {
    sqlx::query_as::<_, Attendant>(
        r#"
        SELECT id, tenant_id, name, status, created_at
        FROM attendants
        WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Attendant",
        id: id.to_string(),
    })
}

/// List all attendants for a tenant.
pub async fn list_attendants(pool: &SqlitePool, tenant_id: i64) -> Result<Vec<Attendant>> {
    let attendants = sqlx::query_as::<_, Attendant>(
        r#"
        SELECT id, tenant_id, name, status, created_at
        FROM attendants
        WHERE tenant_id = ?
        ORDER BY name
        "#,
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    Ok(attendants)
}

/// Set an attendant's status ("active" or "blocked").
pub async fn set_status(pool: &SqlitePool, tenant_id: i64, id: i64, status: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE attendants
        SET status = ?
        WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(status)
    .bind(id)
    .bind(tenant_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Attendant",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Add an attendant to a department. Both must belong to the tenant.
pub async fn add_to_department(
    pool: &SqlitePool,
    tenant_id: i64,
    department_id: i64,
    attendant_id: i64,
) -> Result<()> {
    get_attendant(pool, tenant_id, attendant_id).await?;
    crate::department::get_department(pool, tenant_id, department_id).await?;

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO department_members (department_id, attendant_id)
        VALUES (?, ?)
        "#,
    )
    .bind(department_id)
    .bind(attendant_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove an attendant from a department.
pub async fn remove_from_department(
    pool: &SqlitePool,
    tenant_id: i64,
    department_id: i64,
    attendant_id: i64,
) -> Result<()> {
    crate::department::get_department(pool, tenant_id, department_id).await?;

    let result = sqlx::query(
        r#"
        DELETE FROM department_members
        WHERE department_id = ? AND attendant_id = ?
        "#,
    )
    .bind(department_id)
    .bind(attendant_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Department membership",
            id: format!("{}/{}", department_id, attendant_id),
        });
    }

    Ok(())
}

/// One attendant considered for assignment, with current load and the time
/// of their most recent assignment.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Candidate {
    pub attendant_id: i64,
    pub name: String,
    /// Count of conversations in status open or in_progress.
    pub active_count: i64,
    /// Most recent distribution_history.assigned_at, if any.
    pub last_assigned_at: Option<String>,
}

/// List active attendants eligible for assignment, optionally restricted to
/// a department's membership, with load and recency for policy selection.
/// Ordered by id so repeated evaluation sees the same sequence.
pub async fn list_candidates(
    pool: &SqlitePool,
    tenant_id: i64,
    department_id: Option<i64>,
) -> Result<Vec<Candidate>> {
    let candidates = sqlx::query_as::<_, Candidate>(
        r#"
        SELECT a.id AS attendant_id,
               a.name,
               (SELECT COUNT(*) FROM conversations c
                 WHERE c.assigned_to = a.id
                   AND c.status IN ('open', 'in_progress')) AS active_count,
               (SELECT MAX(h.assigned_at) FROM distribution_history h
                 WHERE h.attendant_id = a.id) AS last_assigned_at
        FROM attendants a
        WHERE a.tenant_id = ?1
          AND a.status = 'active'
          AND (?2 IS NULL OR EXISTS (
               SELECT 1 FROM department_members dm
                WHERE dm.department_id = ?2 AND dm.attendant_id = a.id))
        ORDER BY a.id
        "#,
    )
    .bind(tenant_id)
    .bind(department_id)
    .fetch_all(pool)
    .await?;

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    #[tokio::test]
    async fn test_candidates_scoped_to_department() {
        let db = test_db().await;
        let pool = db.pool();

        let dept = crate::department::create_department(pool, 1, "Sales", "#2ecc71")
            .await
            .unwrap();
        let inside = create_attendant(pool, 1, "Ana").await.unwrap();
        let outside = create_attendant(pool, 1, "Bia").await.unwrap();
        let blocked = create_attendant(pool, 1, "Caio").await.unwrap();

        add_to_department(pool, 1, dept.id, inside.id).await.unwrap();
        add_to_department(pool, 1, dept.id, blocked.id).await.unwrap();
        set_status(pool, 1, blocked.id, "blocked").await.unwrap();

        let in_dept = list_candidates(pool, 1, Some(dept.id)).await.unwrap();
        assert_eq!(in_dept.len(), 1);
        assert_eq!(in_dept[0].attendant_id, inside.id);
        assert_eq!(in_dept[0].active_count, 0);
        assert!(in_dept[0].last_assigned_at.is_none());

        let anywhere = list_candidates(pool, 1, None).await.unwrap();
        assert_eq!(anywhere.len(), 2);
        assert!(anywhere.iter().any(|c| c.attendant_id == outside.id));
    }
}
