//! Database layer for Contactdesk
//!
//! Provides:
//! - SeaORM entity models
//! - Repository pattern for data access
//! - Connection pool management

pub mod models;
mod repository;

pub use repository::{NewContact, Repository};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper, cheap to clone
#[derive(Clone)]
pub struct DbPool {
    conn: Arc<DatabaseConnection>,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(config.sql_logging);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::Internal {
                message: format!("Failed to connect to database: {}", e),
            })?;

        info!("Database connection established");
        Ok(Self::from_connection(conn))
    }

    /// Wrap an existing connection
    pub fn from_connection(conn: DatabaseConnection) -> Self {
        Self {
            conn: Arc::new(conn),
        }
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Create the contact table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(backend);

        let mut table = schema.create_table_from_entity(models::ContactEntity);
        table.if_not_exists();

        self.conn.execute(backend.build(&table)).await?;
        info!("Contact table ready");
        Ok(())
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn.ping().await.map_err(Into::into)
    }

    /// Close the pool at shutdown. Every clone sees the closed pool.
    pub async fn close(&self) -> Result<()> {
        self.conn.close_by_ref().await.map_err(Into::into)
    }
}
