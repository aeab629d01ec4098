//! Flow graph editor backend.
//!
//! The editor UI always submits the complete graph, so saves are full
//! replacements rather than diffs: simpler, and the persisted graph is
//! always exactly what the editor last showed. Client-side temporary node
//! ids are remapped to persisted ids and the mapping is returned so the
//! editor can reconcile.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;

use database::flow::{NewFlowEdge, NewFlowNode};
use database::models::{flow_status, Flow};
use database::validation;

use crate::config::{EdgeCondition, NodeConfig};
use crate::error::{FlowError, Result};

/// A node as submitted by the editor.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeInput {
    /// Client-side temporary id; the array index stands in when absent.
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub position: Position,
}

/// Canvas position of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// An edge as submitted by the editor, in client node ids.
#[derive(Debug, Clone, Deserialize)]
pub struct EdgeInput {
    pub from: i64,
    pub to: i64,
    #[serde(default)]
    pub condition: Option<EdgeCondition>,
}

/// A stored node, with its configuration inflated back to JSON.
#[derive(Debug, Clone, Serialize)]
pub struct NodeView {
    pub id: i64,
    #[serde(rename = "type")]
    pub node_type: String,
    pub label: String,
    pub config: Value,
    pub position: Position,
    pub sort_order: i64,
}

/// A stored edge.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeView {
    pub id: i64,
    pub from: i64,
    pub to: i64,
    pub condition: Option<Value>,
    pub sort_order: i64,
}

/// A flow together with its current graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphView {
    pub flow: Flow,
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
}

/// Load a flow and its graph for the editor.
pub async fn get_graph(pool: &SqlitePool, tenant_id: i64, flow_id: i64) -> Result<GraphView> {
    let (flow, nodes, edges) = database::flow::get_graph(pool, tenant_id, flow_id).await?;

    let nodes = nodes
        .into_iter()
        .map(|n| NodeView {
            id: n.id,
            node_type: n.node_type,
            label: n.label,
            config: serde_json::from_str(&n.config).unwrap_or(Value::Null),
            position: Position { x: n.pos_x, y: n.pos_y },
            sort_order: n.sort_order,
        })
        .collect();

    let edges = edges
        .into_iter()
        .map(|e| EdgeView {
            id: e.id,
            from: e.from_node,
            to: e.to_node,
            condition: e
                .condition
                .as_deref()
                .and_then(|c| serde_json::from_str(c).ok()),
            sort_order: e.sort_order,
        })
        .collect();

    Ok(GraphView { flow, nodes, edges })
}

/// Replace a flow's graph with the submitted layout.
///
/// Every block's configuration is validated against its declared kind
/// before anything is written; a single malformed block rejects the whole
/// save and leaves the stored graph untouched. Edges whose endpoints don't
/// resolve against the submitted node set are dropped silently. Returns
/// the client-id → persisted-id map.
pub async fn replace_graph(
    pool: &SqlitePool,
    tenant_id: i64,
    flow_id: i64,
    nodes: &[NodeInput],
    edges: &[EdgeInput],
    now: DateTime<Utc>,
) -> Result<HashMap<i64, i64>> {
    let mut new_nodes = Vec::with_capacity(nodes.len());
    for node in nodes {
        let parsed = NodeConfig::from_parts(&node.node_type, &node.config)?;
        new_nodes.push(NewFlowNode {
            client_id: node.id,
            node_type: parsed.kind().to_string(),
            label: node.label.clone(),
            config: parsed.config_value().to_string(),
            pos_x: node.position.x,
            pos_y: node.position.y,
        });
    }

    let new_edges: Vec<NewFlowEdge> = edges
        .iter()
        .map(|e| NewFlowEdge {
            from: e.from,
            to: e.to,
            condition: e
                .condition
                .as_ref()
                .map(|c| serde_json::to_string(c).unwrap_or_else(|_| "{}".to_string())),
        })
        .collect();

    let id_map =
        database::flow::replace_graph(pool, tenant_id, flow_id, &new_nodes, &new_edges, now).await?;

    Ok(id_map)
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
    validation::validate_name("flow name", name)?;
    validation::validate_text("flow description", description, validation::MAX_TEXT_LENGTH)?;
    if !matches!(owner_type, "supervisor" | "attendant") {
        return Err(FlowError::Validation(validation::ValidationError::UnknownValue {
            field: "owner type".to_string(),
            value: owner_type.to_string(),
        }));
    }

    Ok(database::flow::create_flow(pool, tenant_id, owner_type, owner_id, name, description).await?)
}

/// Every flow of the tenant: supervisor-owned and attendant-owned merged,
/// most recently edited first.
pub async fn list_flows(pool: &SqlitePool, tenant_id: i64) -> Result<Vec<Flow>> {
    Ok(database::flow::list_flows(pool, tenant_id).await?)
}

/// Update a flow's metadata.
pub async fn update_flow(
    pool: &SqlitePool,
    tenant_id: i64,
    flow_id: i64,
    name: &str,
    description: &str,
    status: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Flow> {
    validation::validate_name("flow name", name)?;
    validation::validate_text("flow description", description, validation::MAX_TEXT_LENGTH)?;
    if let Some(status) = status {
        if ![flow_status::DRAFT, flow_status::PUBLISHED, flow_status::PAUSED].contains(&status) {
            return Err(FlowError::Validation(validation::ValidationError::UnknownValue {
                field: "flow status".to_string(),
                value: status.to_string(),
            }));
        }
    }

    Ok(database::flow::update_flow(pool, tenant_id, flow_id, name, description, status, now).await?)
}

/// Save automation-specific configuration (trigger keyword, channels) on a
/// flow. The payload must at least be a JSON object.
pub async fn set_automation_config(
    pool: &SqlitePool,
    tenant_id: i64,
    flow_id: i64,
    config: &Value,
    now: DateTime<Utc>,
) -> Result<Flow> {
    if !config.is_object() {
        return Err(FlowError::InvalidConfig {
            node_type: "automation".to_string(),
            reason: "expected a JSON object".to_string(),
        });
    }

    Ok(database::flow::set_automation_config(pool, tenant_id, flow_id, &config.to_string(), now).await?)
}

/// Delete a flow with its graph and versions.
pub async fn delete_flow(pool: &SqlitePool, tenant_id: i64, flow_id: i64) -> Result<()> {
    Ok(database::flow::delete_flow(pool, tenant_id, flow_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use database::Database;
    use serde_json::json;

    async fn test_db() -> Database {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 16, h, m, 0).unwrap()
    }

    fn node(id: i64, node_type: &str, config: Value) -> NodeInput {
        NodeInput {
            id: Some(id),
            node_type: node_type.to_string(),
            label: node_type.to_string(),
            config,
            position: Position { x: 10.0 * id as f64, y: 0.0 },
        }
    }

    #[tokio::test]
    async fn test_save_and_reload_typed_graph() {
        let db = test_db().await;
        let pool = db.pool();

        let flow = create_flow(pool, 1, "supervisor", 1, "Welcome", "greets people")
            .await
            .unwrap();

        let nodes = vec![
            node(1, "start", Value::Null),
            node(2, "message", json!({"text": "Hi there!"})),
            node(3, "question", json!({"text": "What is your name?", "variable": "name"})),
        ];
        let edges = vec![
            EdgeInput { from: 1, to: 2, condition: None },
            EdgeInput {
                from: 2,
                to: 3,
                condition: Some(EdgeCondition {
                    label: "always".to_string(),
                    comparison: crate::config::Comparison::Equals,
                    value: json!(true),
                }),
            },
        ];

        let map = replace_graph(pool, 1, flow.id, &nodes, &edges, at(10, 0)).await.unwrap();
        assert_eq!(map.len(), 3);

        let graph = get_graph(pool, 1, flow.id).await.unwrap();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.nodes[1].config["text"], "Hi there!");
        assert_eq!(graph.nodes[1].position.x, 20.0);
        assert_eq!(graph.edges[1].condition.as_ref().unwrap()["label"], "always");
    }

    #[tokio::test]
    async fn test_malformed_block_rejects_whole_save() {
        let db = test_db().await;
        let pool = db.pool();

        let flow = create_flow(pool, 1, "supervisor", 1, "Welcome", "").await.unwrap();
        replace_graph(pool, 1, flow.id, &[node(1, "start", Value::Null)], &[], at(10, 0))
            .await
            .unwrap();

        // Second save has a bad message block: nothing may change.
        let bad = replace_graph(
            pool,
            1,
            flow.id,
            &[node(1, "start", Value::Null), node(2, "message", json!({"txet": "typo"}))],
            &[],
            at(10, 5),
        )
        .await;
        assert!(matches!(bad, Err(FlowError::InvalidConfig { .. })));

        let graph = get_graph(pool, 1, flow.id).await.unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].node_type, "start");
    }

    #[tokio::test]
    async fn test_extension_blocks_survive_save() {
        let db = test_db().await;
        let pool = db.pool();

        let flow = create_flow(pool, 1, "attendant", 4, "Custom", "").await.unwrap();
        let raw = json!({"script": "return ctx.score > 3;"});
        replace_graph(pool, 1, flow.id, &[node(1, "scorer_v2", raw.clone())], &[], at(10, 0))
            .await
            .unwrap();

        let graph = get_graph(pool, 1, flow.id).await.unwrap();
        assert_eq!(graph.nodes[0].node_type, "scorer_v2");
        assert_eq!(graph.nodes[0].config, raw);
    }

    #[tokio::test]
    async fn test_flow_metadata_validation() {
        let db = test_db().await;
        let pool = db.pool();

        let blank = create_flow(pool, 1, "supervisor", 1, "  ", "").await;
        assert!(matches!(blank, Err(FlowError::Validation(_))));

        let bad_owner = create_flow(pool, 1, "robot", 1, "ok", "").await;
        assert!(matches!(bad_owner, Err(FlowError::Validation(_))));

        let flow = create_flow(pool, 1, "supervisor", 1, "Welcome", "").await.unwrap();
        let bad_status = update_flow(pool, 1, flow.id, "Welcome", "", Some("archived"), at(10, 0)).await;
        assert!(matches!(bad_status, Err(FlowError::Validation(_))));

        let paused = update_flow(pool, 1, flow.id, "Welcome", "", Some("paused"), at(10, 0))
            .await
            .unwrap();
        assert_eq!(paused.status, "paused");
    }

    #[tokio::test]
    async fn test_automation_config_must_be_object() {
        let db = test_db().await;
        let pool = db.pool();

        let flow = create_flow(pool, 1, "supervisor", 1, "Welcome", "").await.unwrap();

        let bad = set_automation_config(pool, 1, flow.id, &json!("keyword"), at(10, 0)).await;
        assert!(matches!(bad, Err(FlowError::InvalidConfig { .. })));

        let saved = set_automation_config(
            pool,
            1,
            flow.id,
            &json!({"trigger": "hello", "channels": ["whatsapp"]}),
            at(10, 0),
        )
        .await
        .unwrap();
        let config: Value = serde_json::from_str(saved.automation_config.as_deref().unwrap()).unwrap();
        assert_eq!(config["trigger"], "hello");
    }
}
