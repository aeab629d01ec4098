//! SQLite persistence layer for the helpdesk core.
//!
//! This crate provides async database operations for conversations,
//! attendants, distribution rules, the waiting queue, and automation flows
//! using SQLx with SQLite.
//!
//! # Example
//!
//! ```no_run
//! use database::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:helpdesk.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let attendant = database::attendant::create_attendant(db.pool(), 1, "Ana").await?;
//!     println!("attendant #{}", attendant.id);
//!
//!     Ok(())
//! }
//! ```

pub mod attendant;
pub mod conversation;
pub mod department;
pub mod distribution_rule;
pub mod error;
pub mod flow;
pub mod history;
pub mod models;
pub mod note;
pub mod queue;
pub mod timestamp;
pub mod transfer;
pub mod validation;

pub use error::{DatabaseError, Result};
pub use models::{
    Attendant, Conversation, ConversationNote, Department, DistributionHistoryRecord,
    DistributionRule, Flow, FlowEdge, FlowNode, FlowVersion, QueueEntry, TransferRecord,
};
pub use timestamp::{format_timestamp, parse_timestamp};
pub use validation::ValidationError;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    /// Sized for concurrent request handlers sharing the store.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
