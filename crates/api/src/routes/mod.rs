//! Route handlers for the helpdesk API.

pub mod conversations;
pub mod distribution;
pub mod flows;
pub mod health;

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health))
        // Distribution rules
        .route(
            "/api/distribution/rules",
            get(distribution::list_rules).post(distribution::create_rule),
        )
        .route(
            "/api/distribution/rules/:id",
            get(distribution::get_rule)
                .put(distribution::update_rule)
                .delete(distribution::delete_rule),
        )
        .route("/api/distribution/rules/:id/toggle", post(distribution::toggle_rule))
        // Queue
        .route("/api/distribution/queue", get(distribution::get_queue))
        .route("/api/distribution/queue/retry", post(distribution::retry_queue))
        .route(
            "/api/distribution/queue/:id/assign",
            post(distribution::assign_queue_entry),
        )
        .route(
            "/api/distribution/conversations/:id/distribute",
            post(distribution::distribute_conversation),
        )
        .route("/api/distribution/history", get(distribution::get_history))
        .route("/api/distribution/stats", get(distribution::get_stats))
        // Flows
        .route("/api/flows", get(flows::list_flows).post(flows::create_flow))
        .route(
            "/api/flows/:id",
            get(flows::get_flow).put(flows::update_flow).delete(flows::delete_flow),
        )
        .route("/api/flows/:id/layout", put(flows::save_layout))
        .route("/api/flows/:id/publish", post(flows::publish_flow))
        .route("/api/flows/:id/versions", get(flows::list_versions))
        .route("/api/flows/:id/automation", put(flows::save_automation))
        // Conversation actions
        .route("/api/conversations/:id/resolve", post(conversations::resolve))
        .route("/api/conversations/:id/close", post(conversations::close))
        .route("/api/conversations/:id/transfer", post(conversations::transfer))
        .route("/api/conversations/:id/transfers", get(conversations::list_transfers))
        .route(
            "/api/conversations/:id/notes",
            get(conversations::list_notes).post(conversations::add_note),
        )
        .route(
            "/api/conversations/:id/notes/:note_id",
            delete(conversations::delete_note),
        )
}
