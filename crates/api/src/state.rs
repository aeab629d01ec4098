//! Application state shared across handlers.

use std::sync::Arc;

use database::Database;
use dispatch::Notifier;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
    /// Assignment notification channel.
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Create new application state.
    pub fn new(db: Database, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, notifier }
    }
}
