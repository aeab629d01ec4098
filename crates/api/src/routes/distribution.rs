//! Distribution routes: rules, queue, history, stats.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use database::distribution_rule::NewRule;

use crate::auth::Principal;
use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Rule fields as submitted by the frontend.
#[derive(Debug, Deserialize)]
pub struct RuleRequest {
    pub name: String,
    #[serde(default = "default_rule_type")]
    pub rule_type: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default = "default_max_per_attendant")]
    pub max_per_attendant: i64,
    #[serde(default = "default_true")]
    pub auto_assign: bool,
    #[serde(default)]
    pub notify_attendant: bool,
    #[serde(default = "default_hours_start")]
    pub work_hours_start: String,
    #[serde(default = "default_hours_end")]
    pub work_hours_end: String,
    #[serde(default = "default_work_days")]
    pub work_days: Vec<u8>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_rule_type() -> String {
    "round_robin".to_string()
}

fn default_max_per_attendant() -> i64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_hours_start() -> String {
    "00:00".to_string()
}

fn default_hours_end() -> String {
    "24:00".to_string()
}

fn default_work_days() -> Vec<u8> {
    vec![0, 1, 2, 3, 4, 5, 6]
}

impl RuleRequest {
    fn into_new_rule(self) -> Result<NewRule> {
        let rule = NewRule {
            name: self.name,
            rule_type: self.rule_type,
            priority: self.priority,
            max_per_attendant: self.max_per_attendant,
            auto_assign: self.auto_assign,
            notify_attendant: self.notify_attendant,
            work_hours_start: self.work_hours_start,
            work_hours_end: self.work_hours_end,
            work_days: self.work_days,
            is_active: self.is_active,
        };
        rule.validate()
            .map_err(|err| ApiError::BadRequest(err.to_string()))?;
        Ok(rule)
    }
}

/// GET /api/distribution/rules
pub async fn list_rules(State(state): State<AppState>, principal: Principal) -> Result<Json<Value>> {
    principal.require_supervisor()?;
    let rules = database::distribution_rule::list_rules(state.db.pool(), principal.tenant_id).await?;
    Ok(Json(json!({ "success": true, "rules": rules })))
}

/// POST /api/distribution/rules
pub async fn create_rule(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<RuleRequest>,
) -> Result<Json<Value>> {
    principal.require_supervisor()?;
    let rule = request.into_new_rule()?;
    let created =
        database::distribution_rule::create_rule(state.db.pool(), principal.tenant_id, &rule).await?;
    Ok(Json(json!({ "success": true, "rule": created })))
}

/// GET /api/distribution/rules/:id
pub async fn get_rule(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    principal.require_supervisor()?;
    let rule = database::distribution_rule::get_rule(state.db.pool(), principal.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "rule": rule })))
}

/// PUT /api/distribution/rules/:id
pub async fn update_rule(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(request): Json<RuleRequest>,
) -> Result<Json<Value>> {
    principal.require_supervisor()?;
    let rule = request.into_new_rule()?;
    let updated =
        database::distribution_rule::update_rule(state.db.pool(), principal.tenant_id, id, &rule)
            .await?;
    Ok(Json(json!({ "success": true, "rule": updated })))
}

/// DELETE /api/distribution/rules/:id
pub async fn delete_rule(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    principal.require_supervisor()?;
    database::distribution_rule::delete_rule(state.db.pool(), principal.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "message": "rule deleted" })))
}

/// POST /api/distribution/rules/:id/toggle
pub async fn toggle_rule(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    principal.require_supervisor()?;
    let is_active =
        database::distribution_rule::toggle_rule(state.db.pool(), principal.tenant_id, id).await?;
    Ok(Json(json!({ "success": true, "is_active": is_active })))
}

/// GET /api/distribution/queue
pub async fn get_queue(State(state): State<AppState>, principal: Principal) -> Result<Json<Value>> {
    principal.require_supervisor()?;
    let entries = dispatch::queue::list_waiting(state.db.pool(), principal.tenant_id).await?;
    Ok(Json(json!({ "success": true, "queue": entries })))
}

/// Manual queue assignment body.
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub attendant_id: i64,
}

/// POST /api/distribution/queue/:id/assign
pub async fn assign_queue_entry(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
    Json(request): Json<AssignRequest>,
) -> Result<Json<Value>> {
    principal.require_supervisor()?;
    let entry = dispatch::queue::assign_manual(
        state.db.pool(),
        principal.tenant_id,
        id,
        request.attendant_id,
        Utc::now(),
    )
    .await?;
    Ok(Json(json!({ "success": true, "entry": entry })))
}

/// POST /api/distribution/queue/retry
pub async fn retry_queue(State(state): State<AppState>, principal: Principal) -> Result<Json<Value>> {
    principal.require_supervisor()?;
    let report = dispatch::queue::retry_queue(
        state.db.pool(),
        state.notifier.as_ref(),
        principal.tenant_id,
        Utc::now(),
    )
    .await?;
    Ok(Json(json!({ "success": true, "report": report })))
}

/// POST /api/distribution/conversations/:id/distribute
///
/// Entry point for the message-ingestion collaborator: runs the engine
/// over one newly created or unassigned conversation.
pub async fn distribute_conversation(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    principal.require_supervisor()?;
    let outcome = dispatch::distribute(
        state.db.pool(),
        state.notifier.as_ref(),
        principal.tenant_id,
        id,
        Utc::now(),
    )
    .await?;

    let body = match outcome {
        dispatch::Outcome::Assigned { attendant_id, rule_id } => json!({
            "success": true,
            "outcome": "assigned",
            "attendant_id": attendant_id,
            "rule_id": rule_id,
        }),
        dispatch::Outcome::Queued { entry_id } => json!({
            "success": true,
            "outcome": "queued",
            "entry_id": entry_id,
        }),
    };
    Ok(Json(body))
}

/// History listing parameters.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(default = "default_history_limit")]
    pub limit: i64,
}

fn default_history_limit() -> i64 {
    50
}

/// GET /api/distribution/history
pub async fn get_history(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Value>> {
    principal.require_supervisor()?;
    let limit = params.limit.clamp(1, 500);
    let history = database::history::list_history(state.db.pool(), principal.tenant_id, limit).await?;
    Ok(Json(json!({ "success": true, "history": history })))
}

/// GET /api/distribution/stats
pub async fn get_stats(State(state): State<AppState>, principal: Principal) -> Result<Json<Value>> {
    principal.require_supervisor()?;
    let stats = dispatch::queue::stats(state.db.pool(), principal.tenant_id, Utc::now()).await?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}
