//! Flow publisher: freezes the current graph into an immutable version.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use database::models::FlowVersion;

use crate::error::Result;

/// Publish whatever graph is currently persisted for the flow.
///
/// The snapshot row and the flow's version pointers move together in one
/// transaction, so `published_version` can never point at a version that
/// was not written. Pending editor state the server never received is not
/// the publisher's concern: the editor saves the layout first, then asks
/// to publish. Returns the new version number.
pub async fn publish(
    pool: &SqlitePool,
    tenant_id: i64,
    flow_id: i64,
    now: DateTime<Utc>,
) -> Result<i64> {
    let version = database::flow::publish_flow(pool, tenant_id, flow_id, now).await?;
    Ok(version.version)
}

/// List a flow's published versions, newest first.
pub async fn list_versions(
    pool: &SqlitePool,
    tenant_id: i64,
    flow_id: i64,
) -> Result<Vec<FlowVersion>> {
    Ok(database::flow::list_versions(pool, tenant_id, flow_id).await?)
}
