//! Flow editor and publisher routes.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use flows::{editor, publisher, EdgeInput, NodeInput};

use crate::auth::Principal;
use crate::error::Result;
use crate::state::AppState;

/// GET /api/flows
pub async fn list_flows(State(state): State<AppState>, principal: Principal) -> Result<Json<Value>> {
    principal.require_flow_access()?;
    let flows = editor::list_flows(state.db.pool(), principal.tenant_id).await?;
    Ok(Json(json!({ "success": true, "flows": flows })))
}

/// Flow creation/update body.
#[derive(Debug, Deserialize)]
pub struct FlowBody {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// POST /api/flows
pub async fn create_flow(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<FlowBody>,
) -> Result<Json<Value>> {
    principal.require_flow_access()?;
    let (owner_type, owner_id) = principal.owner();
    let flow = editor::create_flow(
        state.db.pool(),
        principal.tenant_id,
        owner_type,
        owner_id,
        &body.name,
        &body.description,
    )
    .await?;
    Ok(Json(json!({ "success": true, "flow": flow })))
}

/// GET /api/flows/:id — the flow with its full graph.
pub async fn get_flow(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    principal.require_flow_access()?;
    let graph = editor::get_graph(state.db.pool(), principal.tenant_id, id).await?;
    Ok(Json(json!({
        "success": true,
        "flow": graph.flow,
        "nodes": graph.nodes,
        "edges": graph.edges,
    })))
}

/// PUT /api/flows/:id
pub async fn update_flow(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(body): Json<FlowBody>,
) -> Result<Json<Value>> {
    principal.require_flow_access()?;
    let flow = editor::update_flow(
        state.db.pool(),
        principal.tenant_id,
        id,
        &body.name,
        &body.description,
        body.status.as_deref(),
        Utc::now(),
    )
    .await?;
    Ok(Json(json!({ "success": true, "flow": flow })))
}

/// DELETE /api/flows/:id
pub async fn delete_flow(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    principal.require_flow_access()?;
    editor::delete_flow(state.db.pool(), principal.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "message": "flow deleted" })))
}

/// Full layout submission.
#[derive(Debug, Deserialize)]
pub struct LayoutBody {
    #[serde(default)]
    pub nodes: Vec<NodeInput>,
    #[serde(default)]
    pub edges: Vec<EdgeInput>,
}

/// PUT /api/flows/:id/layout — full graph replacement.
///
/// Responds with the temporary-id → persisted-id map so the editor can
/// reconcile its canvas state.
pub async fn save_layout(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(body): Json<LayoutBody>,
) -> Result<Json<Value>> {
    principal.require_flow_access()?;
    let id_map = editor::replace_graph(
        state.db.pool(),
        principal.tenant_id,
        id,
        &body.nodes,
        &body.edges,
        Utc::now(),
    )
    .await?;

    // String keys for JSON.
    let id_map: serde_json::Map<String, Value> = id_map
        .into_iter()
        .map(|(client, persisted)| (client.to_string(), json!(persisted)))
        .collect();

    Ok(Json(json!({ "success": true, "id_map": id_map })))
}

/// POST /api/flows/:id/publish
pub async fn publish_flow(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    principal.require_flow_access()?;
    let version = publisher::publish(state.db.pool(), principal.tenant_id, id, Utc::now()).await?;
    Ok(Json(json!({ "success": true, "version": version })))
}

/// GET /api/flows/:id/versions
pub async fn list_versions(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    principal.require_flow_access()?;
    let versions = publisher::list_versions(state.db.pool(), principal.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "versions": versions })))
}

/// PUT /api/flows/:id/automation — automation-specific configuration.
pub async fn save_automation(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(config): Json<Value>,
) -> Result<Json<Value>> {
    principal.require_flow_access()?;
    let flow =
        editor::set_automation_config(state.db.pool(), principal.tenant_id, id, &config, Utc::now())
            .await?;
    Ok(Json(json!({ "success": true, "flow": flow })))
}
