//! Conversation action routes: resolve, close, transfer, notes.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use dispatch::actions::{self, TransferRequest};

use crate::auth::Principal;
use crate::error::Result;
use crate::state::AppState;

/// POST /api/conversations/:id/resolve
pub async fn resolve(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    principal.require_supervisor()?;
    let conversation = actions::resolve(state.db.pool(), principal.tenant_id, id, Utc::now()).await?;
    Ok(Json(json!({ "success": true, "conversation": conversation })))
}

/// POST /api/conversations/:id/close
pub async fn close(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    principal.require_supervisor()?;
    let conversation = actions::close(state.db.pool(), principal.tenant_id, id, Utc::now()).await?;
    Ok(Json(json!({ "success": true, "conversation": conversation })))
}

/// Transfer body: at least one target plus a free-text reason.
#[derive(Debug, Deserialize)]
pub struct TransferBody {
    #[serde(default)]
    pub to_attendant: Option<i64>,
    #[serde(default)]
    pub to_department: Option<i64>,
    #[serde(default)]
    pub reason: String,
}

/// POST /api/conversations/:id/transfer
pub async fn transfer(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(body): Json<TransferBody>,
) -> Result<Json<Value>> {
    principal.require_supervisor()?;
    let request = TransferRequest {
        to_attendant: body.to_attendant,
        to_department: body.to_department,
        reason: body.reason,
    };
    let record = actions::transfer(
        state.db.pool(),
        state.notifier.as_ref(),
        principal.tenant_id,
        id,
        &request,
        Utc::now(),
    )
    .await?;
    Ok(Json(json!({ "success": true, "transfer": record })))
}

/// Note body.
#[derive(Debug, Deserialize)]
pub struct NoteBody {
    pub body: String,
}

/// POST /api/conversations/:id/notes
pub async fn add_note(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(body): Json<NoteBody>,
) -> Result<Json<Value>> {
    principal.require_supervisor()?;
    let note = actions::add_note(
        state.db.pool(),
        principal.tenant_id,
        id,
        principal.actor_id(),
        &body.body,
    )
    .await?;
    Ok(Json(json!({ "success": true, "note": note })))
}

/// GET /api/conversations/:id/notes
pub async fn list_notes(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    principal.require_supervisor()?;
    let notes = actions::list_notes(state.db.pool(), principal.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "notes": notes })))
}

/// DELETE /api/conversations/:id/notes/:note_id
pub async fn delete_note(
    State(state): State<AppState>,
    principal: Principal,
    Path((_id, note_id)): Path<(i64, i64)>,
) -> Result<Json<Value>> {
    principal.require_supervisor()?;
    actions::delete_note(state.db.pool(), principal.tenant_id, note_id).await?;
    Ok(Json(json!({ "success": true, "message": "note deleted" })))
}

/// GET /api/conversations/:id/transfers
pub async fn list_transfers(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    principal.require_supervisor()?;
    let transfers = actions::list_transfers(state.db.pool(), principal.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "transfers": transfers })))
}
