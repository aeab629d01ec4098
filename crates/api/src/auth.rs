//! Request principal extraction.
//!
//! Session mechanics live in the authenticating front proxy; by the time a
//! request reaches this API the proxy has stamped identity headers on it.
//! Those headers become an explicit [`Principal`] that every core
//! operation receives as a parameter — no handler reads ambient identity
//! state.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::error::ApiError;

/// Who is acting: the supervisor account itself, or one of its attendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Supervisor,
    Attendant { id: i64, flow_access: bool },
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    /// The tenant (supervisor account) every query is scoped to.
    pub tenant_id: i64,
    pub actor: Actor,
}

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .filter(|id| *id > 0)
}

fn header_flag(headers: &HeaderMap, name: &str) -> bool {
    matches!(
        headers.get(name).and_then(|value| value.to_str().ok()),
        Some("1") | Some("true")
    )
}

impl Principal {
    /// Build a principal from the proxy's identity headers.
    ///
    /// `x-tenant-id` is always required. `x-actor` defaults to
    /// `supervisor`; `attendant` additionally requires `x-attendant-id`
    /// and may carry `x-flow-access` for the flow-management permission.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let tenant_id = header_i64(headers, "x-tenant-id").ok_or(ApiError::Unauthorized)?;

        let actor = match headers
            .get("x-actor")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("supervisor")
        {
            "supervisor" => Actor::Supervisor,
            "attendant" => Actor::Attendant {
                id: header_i64(headers, "x-attendant-id").ok_or(ApiError::Unauthorized)?,
                flow_access: header_flag(headers, "x-flow-access"),
            },
            _ => return Err(ApiError::Unauthorized),
        };

        Ok(Self { tenant_id, actor })
    }

    /// Supervisor-only operations: rules, queue, conversation actions.
    pub fn require_supervisor(&self) -> Result<(), ApiError> {
        match self.actor {
            Actor::Supervisor => Ok(()),
            Actor::Attendant { .. } => Err(ApiError::Forbidden),
        }
    }

    /// Flow operations: supervisors always, attendants only with the
    /// flow-management permission.
    pub fn require_flow_access(&self) -> Result<(), ApiError> {
        match self.actor {
            Actor::Supervisor => Ok(()),
            Actor::Attendant { flow_access: true, .. } => Ok(()),
            Actor::Attendant { flow_access: false, .. } => Err(ApiError::Forbidden),
        }
    }

    /// Flow ownership for records created by this principal.
    pub fn owner(&self) -> (&'static str, i64) {
        match self.actor {
            Actor::Supervisor => ("supervisor", self.tenant_id),
            Actor::Attendant { id, .. } => ("attendant", id),
        }
    }

    /// The acting individual's id, for authorship fields.
    pub fn actor_id(&self) -> i64 {
        match self.actor {
            Actor::Supervisor => self.tenant_id,
            Actor::Attendant { id, .. } => id,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}
