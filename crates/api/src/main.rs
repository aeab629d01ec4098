//! HTTP API for the helpdesk distribution and flow-builder core.
//!
//! Stateless request handlers over a shared SQLite store: conversation
//! distribution rules and queue, flow graph editing and publishing, and
//! conversation lifecycle actions.

mod auth;
mod config;
mod error;
mod routes;
mod state;

use std::sync::Arc;

use axum::http::HeaderValue;
use database::Database;
use dispatch::LogNotifier;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting helpdesk API server");

    // Connect to database
    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    // Build application state
    let state = AppState::new(db, Arc::new(LogNotifier));

    // CORS for the SPA frontend
    let cors = match &config.cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    // Build router
    let app = routes::router().layer(cors).with_state(state);

    // Start server
    info!(addr = %config.addr, "Helpdesk API listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
