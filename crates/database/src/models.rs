//! Database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Conversation status values.
pub mod conversation_status {
    pub const OPEN: &str = "open";
    pub const IN_PROGRESS: &str = "in_progress";
    pub const RESOLVED: &str = "resolved";
    pub const CLOSED: &str = "closed";
    pub const TRANSFERRED: &str = "transferred";
}

/// Queue entry status values.
pub mod queue_status {
    pub const WAITING: &str = "waiting";
    pub const ASSIGNED: &str = "assigned";
}

/// Distribution history record origin.
pub mod distribution_type {
    pub const MANUAL: &str = "manual";
    pub const AUTOMATIC: &str = "automatic";
}

/// Flow lifecycle status values.
pub mod flow_status {
    pub const DRAFT: &str = "draft";
    pub const PUBLISHED: &str = "published";
    pub const PAUSED: &str = "paused";
}

/// A support agent belonging to one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Attendant {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    /// "active" or "blocked".
    pub status: String,
    pub created_at: String,
}

/// A department grouping attendants and conversations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Department {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub color: String,
    pub is_active: bool,
    pub created_at: String,
}

/// A single customer thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    pub id: i64,
    pub tenant_id: i64,
    /// Channel the conversation arrived on (e.g. "whatsapp", "teams").
    pub channel: String,
    /// See [`conversation_status`].
    pub status: String,
    pub assigned_to: Option<i64>,
    pub department_id: Option<i64>,
    pub priority: i64,
    pub is_archived: bool,
    pub created_at: String,
    pub started_at: Option<String>,
    pub resolved_at: Option<String>,
    pub closed_at: Option<String>,
}

/// A configured auto-assignment policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DistributionRule {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    /// "round_robin" or "load_based".
    pub rule_type: String,
    /// Higher wins; ties broken by id ascending.
    pub priority: i64,
    pub max_per_attendant: i64,
    pub auto_assign: bool,
    pub notify_attendant: bool,
    /// "HH:MM", inclusive start of the daily window.
    pub work_hours_start: String,
    /// "HH:MM", exclusive end of the daily window.
    pub work_hours_end: String,
    /// JSON array of weekday numbers, 0 = Sunday.
    pub work_days: String,
    pub is_active: bool,
    pub created_at: String,
}

impl DistributionRule {
    /// Decode the stored weekday set. Malformed data yields an empty set,
    /// which makes the rule match no day at all.
    pub fn work_day_set(&self) -> Vec<u8> {
        serde_json::from_str(&self.work_days).unwrap_or_default()
    }
}

/// A conversation waiting for assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct QueueEntry {
    pub id: i64,
    pub tenant_id: i64,
    pub conversation_id: i64,
    pub department_id: Option<i64>,
    pub priority: i64,
    /// See [`queue_status`].
    pub status: String,
    pub queued_at: String,
    pub assigned_to: Option<i64>,
    pub assigned_at: Option<String>,
    /// Elapsed seconds between queueing and assignment; immutable once set.
    pub wait_time_seconds: Option<i64>,
}

/// Append-only audit row for one assignment event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DistributionHistoryRecord {
    pub id: i64,
    pub tenant_id: i64,
    pub conversation_id: i64,
    pub attendant_id: i64,
    /// Null for manual assignments.
    pub rule_id: Option<i64>,
    /// See [`distribution_type`].
    pub distribution_type: String,
    pub wait_time_seconds: i64,
    pub assigned_at: String,
}

/// Append-only audit row for one conversation transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TransferRecord {
    pub id: i64,
    pub tenant_id: i64,
    pub conversation_id: i64,
    pub from_attendant: Option<i64>,
    pub to_attendant: Option<i64>,
    pub from_department: Option<i64>,
    pub to_department: Option<i64>,
    pub reason: String,
    pub created_at: String,
}

/// An internal note on a conversation, invisible to the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ConversationNote {
    pub id: i64,
    pub tenant_id: i64,
    pub conversation_id: i64,
    pub author_id: i64,
    pub body: String,
    pub created_at: String,
}

/// An automation flow: a directed graph of blocks, editable as a draft and
/// snapshotted into [`FlowVersion`]s on publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Flow {
    pub id: i64,
    pub tenant_id: i64,
    /// "supervisor" or "attendant".
    pub owner_type: String,
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    /// See [`flow_status`].
    pub status: String,
    pub version: i64,
    /// Always <= `version`.
    pub published_version: Option<i64>,
    pub is_published: bool,
    /// Trigger/channel configuration JSON, saved by its own endpoint.
    pub automation_config: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One block in a flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FlowNode {
    pub id: i64,
    pub flow_id: i64,
    pub node_type: String,
    pub label: String,
    /// Type-dependent configuration JSON.
    pub config: String,
    pub pos_x: f64,
    pub pos_y: f64,
    pub sort_order: i64,
}

/// One transition between two blocks of the same flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FlowEdge {
    pub id: i64,
    pub flow_id: i64,
    pub from_node: i64,
    pub to_node: i64,
    /// Optional condition JSON (label, comparison, value).
    pub condition: Option<String>,
    pub sort_order: i64,
}

/// Immutable snapshot of a flow's graph taken at publish time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FlowVersion {
    pub id: i64,
    pub flow_id: i64,
    pub version: i64,
    pub name: String,
    pub description: String,
    /// Serialized `{flow, nodes, edges}` as they existed at publish time.
    pub payload: String,
    pub created_at: String,
}
