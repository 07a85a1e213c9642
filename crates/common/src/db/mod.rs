//! Persistence gateway (C1): the only connection to the relational store
//! with vector-index support, plus the repository operations every later
//! stage calls through.
//!
//! The original lazily initializes a separate sync and async connection the
//! first time each is needed. Here a single pooled `DatabaseConnection` is
//! constructed explicitly once at orchestrator entry and handed down —
//! sea-orm's async pool serves every call site, so the sync/async split (an
//! artifact of psycopg's driver API, not a semantic requirement) collapses
//! to one connection object, closed unconditionally on the orchestrator's
//! cleanup path.

pub mod models;
pub mod repository;

pub use repository::Repository;

use crate::config::DatabaseConfig;
use crate::errors::{PipelineError, Result};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct DbPool {
    pub conn: DatabaseConnection,
}

impl DbPool {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("connecting to database");

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(config.max_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .sqlx_logging(false);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| PipelineError::fatal("db connect", e))?;

        info!("database connection established");
        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| PipelineError::fatal("db ping", e))?;
        Ok(())
    }

    /// Closes the pooled connection. Called unconditionally by the
    /// orchestrator's cleanup path, on every exit from `run_pipeline`.
    pub async fn close(self) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(PipelineError::Database)?;
        info!("database connection closed");
        Ok(())
    }
}
