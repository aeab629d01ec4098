//! Flow records, draft graph storage, and versioned publication.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Flow, FlowEdge, FlowNode, FlowVersion};
use crate::timestamp::format_timestamp;

/// A node as submitted by the editor, before it has a persisted id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFlowNode {
    /// Client-side temporary id. Falls back to the array index when absent.
    pub client_id: Option<i64>,
    pub node_type: String,
    pub label: String,
    /// Validated configuration JSON.
    pub config: String,
    pub pos_x: f64,
    pub pos_y: f64,
}

/// An edge as submitted by the editor, referencing client node ids.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFlowEdge {
    pub from: i64,
    pub to: i64,
    pub condition: Option<String>,
}

/// Create a flow in draft state.
pub async fn create_flow(
    pool: &SqlitePool,
    tenant_id: i64,
    owner_type: &str,
    owner_id: i64,
    name: &str,
    description: &str,
) -> Result<Flow> {
    let result = sqlx::query(
        r#"
        INSERT INTO flows (tenant_id, owner_type, owner_id, name, description)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(tenant_id)
    .bind(owner_type)
    .bind(owner_id)
    .bind(name)
    .bind(description)
    .execute(pool)
    .await?;

    get_flow(pool, tenant_id, result.last_insert_rowid()).await
}

const FLOW_COLUMNS: &str = r#"id, tenant_id, owner_type, owner_id, name, description, status,
    version, published_version, is_published, automation_config, created_at, updated_at"#;

/// Get a flow by id, scoped to the tenant.
pub async fn get_flow(pool: &SqlitePool, tenant_id: i64, id: i64) -> Result<Flow> {
    sqlx::query_as::<_, Flow>(&format!(
        "SELECT {FLOW_COLUMNS} FROM flows WHERE id = ? AND tenant_id = ?"
    ))
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Flow",
        id: id.to_string(),
    })
}

/// List every flow for a tenant, regardless of whether a supervisor or one
/// of their attendants owns it. Most recently edited first.
pub async fn list_flows(pool: &SqlitePool, tenant_id: i64) -> Result<Vec<Flow>> {
    let flows = sqlx::query_as::<_, Flow>(&format!(
        "SELECT {FLOW_COLUMNS} FROM flows WHERE tenant_id = ? ORDER BY updated_at DESC, id DESC"
    ))
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    Ok(flows)
}

/// Update a flow's metadata (name, description, optional status).
pub async fn update_flow(
    pool: &SqlitePool,
    tenant_id: i64,
    id: i64,
    name: &str,
    description: &str,
    status: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Flow> {
    let result = sqlx::query(
        r#"
        UPDATE flows
        SET name = ?, description = ?, status = COALESCE(?, status), updated_at = ?
        WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(name)
    .bind(description)
    .bind(status)
    .bind(format_timestamp(now))
    .bind(id)
    .bind(tenant_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Flow",
            id: id.to_string(),
        });
    }

    get_flow(pool, tenant_id, id).await
}

/// Save automation-specific configuration (trigger, channels) on a flow.
pub async fn set_automation_config(
    pool: &SqlitePool,
    tenant_id: i64,
    id: i64,
    config: &str,
    now: DateTime<Utc>,
) -> Result<Flow> {
    let result = sqlx::query(
        r#"
        UPDATE flows
        SET automation_config = ?, updated_at = ?
        WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(config)
    .bind(format_timestamp(now))
    .bind(id)
    .bind(tenant_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Flow",
            id: id.to_string(),
        });
    }

    get_flow(pool, tenant_id, id).await
}

/// Delete a flow and (via cascade) its nodes, edges, and versions.
pub async fn delete_flow(pool: &SqlitePool, tenant_id: i64, id: i64) -> Result<()> {
    let result = sqlx::query(
        r#"
        DELETE FROM flows
        WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(id)
    .bind(tenant_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Flow",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Load a flow with its graph. Nodes and edges come back ordered by
/// sort_order then id.
pub async fn get_graph(
    pool: &SqlitePool,
    tenant_id: i64,
    flow_id: i64,
) -> Result<(Flow, Vec<FlowNode>, Vec<FlowEdge>)> {
    let flow = get_flow(pool, tenant_id, flow_id).await?;

    let nodes = sqlx::query_as::<_, FlowNode>(
        r#"
        SELECT id, flow_id, node_type, label, config, pos_x, pos_y, sort_order
        FROM flow_nodes
        WHERE flow_id = ?
        ORDER BY sort_order ASC, id ASC
        "#,
    )
    .bind(flow_id)
    .fetch_all(pool)
    .await?;

    let edges = sqlx::query_as::<_, FlowEdge>(
        r#"
        SELECT id, flow_id, from_node, to_node, condition, sort_order
        FROM flow_edges
        WHERE flow_id = ?
        ORDER BY sort_order ASC, id ASC
        "#,
    )
    .bind(flow_id)
    .fetch_all(pool)
    .await?;

    Ok((flow, nodes, edges))
}

/// Replace a flow's entire graph with the submitted layout.
///
/// Deletes edges then nodes, inserts the submitted nodes in array order
/// (sort_order = index), and re-links edges through the returned
/// client-id → persisted-id map. Edges whose endpoints do not resolve
/// against the submitted node set are silently dropped, never persisted.
/// The whole operation is one transaction; on any failure the previous
/// graph survives untouched.
pub async fn replace_graph(
    pool: &SqlitePool,
    tenant_id: i64,
    flow_id: i64,
    nodes: &[NewFlowNode],
    edges: &[NewFlowEdge],
    now: DateTime<Utc>,
) -> Result<HashMap<i64, i64>> {
    let mut tx = pool.begin().await?;

    let owned = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT id FROM flows WHERE id = ? AND tenant_id = ?
        "#,
    )
    .bind(flow_id)
    .bind(tenant_id)
    .fetch_optional(&mut *tx)
    .await?;

    if owned.is_none() {
        return Err(DatabaseError::NotFound {
            entity: "Flow",
            id: flow_id.to_string(),
        });
    }

    // Edges first to respect the node foreign keys.
    sqlx::query("DELETE FROM flow_edges WHERE flow_id = ?")
        .bind(flow_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM flow_nodes WHERE flow_id = ?")
        .bind(flow_id)
        .execute(&mut *tx)
        .await?;

    let mut id_map = HashMap::with_capacity(nodes.len());
    for (index, node) in nodes.iter().enumerate() {
        let result = sqlx::query(
            r#"
            INSERT INTO flow_nodes (flow_id, node_type, label, config, pos_x, pos_y, sort_order)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(flow_id)
        .bind(&node.node_type)
        .bind(&node.label)
        .bind(&node.config)
        .bind(node.pos_x)
        .bind(node.pos_y)
        .bind(index as i64)
        .execute(&mut *tx)
        .await?;

        let client_id = node.client_id.unwrap_or(index as i64);
        id_map.insert(client_id, result.last_insert_rowid());
    }

    let mut sort_order = 0i64;
    for edge in edges {
        let (Some(&from), Some(&to)) = (id_map.get(&edge.from), id_map.get(&edge.to)) else {
            tracing::debug!(
                flow_id,
                from = edge.from,
                to = edge.to,
                "dropping edge with unresolved endpoint"
            );
            continue;
        };

        sqlx::query(
            r#"
            INSERT INTO flow_edges (flow_id, from_node, to_node, condition, sort_order)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(flow_id)
        .bind(from)
        .bind(to)
        .bind(&edge.condition)
        .bind(sort_order)
        .execute(&mut *tx)
        .await?;
        sort_order += 1;
    }

    sqlx::query("UPDATE flows SET updated_at = ? WHERE id = ?")
        .bind(format_timestamp(now))
        .bind(flow_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(flow_id, nodes = nodes.len(), edges = sort_order, "graph replaced");

    Ok(id_map)
}

/// Publish the flow's current graph as an immutable version.
///
/// Inserts the snapshot row and advances the flow's version pointers in one
/// transaction, so a published_version can never point at a version row
/// that was not written.
pub async fn publish_flow(
    pool: &SqlitePool,
    tenant_id: i64,
    flow_id: i64,
    now: DateTime<Utc>,
) -> Result<FlowVersion> {
    let mut tx = pool.begin().await?;

    let flow = sqlx::query_as::<_, Flow>(&format!(
        "SELECT {FLOW_COLUMNS} FROM flows WHERE id = ? AND tenant_id = ?"
    ))
    .bind(flow_id)
    .bind(tenant_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Flow",
        id: flow_id.to_string(),
    })?;

    let nodes = sqlx::query_as::<_, FlowNode>(
        r#"
        SELECT id, flow_id, node_type, label, config, pos_x, pos_y, sort_order
        FROM flow_nodes
        WHERE flow_id = ?
        ORDER BY sort_order ASC, id ASC
        "#,
    )
    .bind(flow_id)
    .fetch_all(&mut *tx)
    .await?;

    let edges = sqlx::query_as::<_, FlowEdge>(
        r#"
        SELECT id, flow_id, from_node, to_node, condition, sort_order
        FROM flow_edges
        WHERE flow_id = ?
        ORDER BY sort_order ASC, id ASC
        "#,
    )
    .bind(flow_id)
    .fetch_all(&mut *tx)
    .await?;

    let next_version = flow.version + 1;
    let payload = snapshot_payload(&flow, &nodes, &edges);
    let ts = format_timestamp(now);

    let inserted = sqlx::query(
        r#"
        INSERT INTO flow_versions (flow_id, version, name, description, payload, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(flow_id)
    .bind(next_version)
    .bind(&flow.name)
    .bind(&flow.description)
    .bind(payload.to_string())
    .bind(&ts)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE flows
        SET status = 'published', version = ?, published_version = ?, is_published = 1,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(next_version)
    .bind(next_version)
    .bind(&ts)
    .bind(flow_id)
    .execute(&mut *tx)
    .await?;

    let version = sqlx::query_as::<_, FlowVersion>(
        r#"
        SELECT id, flow_id, version, name, description, payload, created_at
        FROM flow_versions
        WHERE id = ?
        "#,
    )
    .bind(inserted.last_insert_rowid())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(flow_id, version = next_version, "flow published");

    Ok(version)
}

/// List a flow's published versions, newest first.
pub async fn list_versions(
    pool: &SqlitePool,
    tenant_id: i64,
    flow_id: i64,
) -> Result<Vec<FlowVersion>> {
    get_flow(pool, tenant_id, flow_id).await?;

    let versions = sqlx::query_as::<_, FlowVersion>(
        r#"
        SELECT id, flow_id, version, name, description, payload, created_at
        FROM flow_versions
        WHERE flow_id = ?
        ORDER BY version DESC
        "#,
    )
    .bind(flow_id)
    .fetch_all(pool)
    .await?;

    Ok(versions)
}

/// Serialize the full graph as it exists right now. Stored config/condition
/// JSON is inlined as objects; rows that predate config validation fall
/// back to an empty object rather than failing the publish.
fn snapshot_payload(flow: &Flow, nodes: &[FlowNode], edges: &[FlowEdge]) -> Value {
    let node_values: Vec<Value> = nodes
        .iter()
        .map(|n| {
            json!({
                "id": n.id,
                "type": n.node_type,
                "label": n.label,
                "config": serde_json::from_str::<Value>(&n.config).unwrap_or_else(|_| json!({})),
                "position": {"x": n.pos_x, "y": n.pos_y},
                "sort_order": n.sort_order,
            })
        })
        .collect();

    let edge_values: Vec<Value> = edges
        .iter()
        .map(|e| {
            json!({
                "id": e.id,
                "from": e.from_node,
                "to": e.to_node,
                "condition": e.condition.as_deref()
                    .and_then(|c| serde_json::from_str::<Value>(c).ok()),
                "sort_order": e.sort_order,
            })
        })
        .collect();

    json!({
        "flow": {
            "id": flow.id,
            "name": flow.name,
            "description": flow.description,
            "owner_type": flow.owner_type,
            "owner_id": flow.owner_id,
        },
        "nodes": node_values,
        "edges": edge_values,
    })
}
