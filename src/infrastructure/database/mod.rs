//! Database infrastructure using SeaORM

use crate::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::info;

pub mod entities;
pub mod migration;

/// Shared handle over the pooled Postgres connection. The same pool backs
/// entity persistence and the advisory-lock coordination.
pub struct Database {
    conn: DatabaseConnection,
}

impl Database {
    /// Connect to the configured Postgres instance
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbErr> {
        let mut opt = ConnectOptions::new(&config.url);
        opt.max_connections(config.max_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .sqlx_logging(false); // We'll use tracing instead

        let conn = SeaDatabase::connect(opt).await?;
        info!("Connected to database");

        Ok(Self { conn })
    }

    /// Wrap an already-established connection (tests, embedded use)
    pub fn from_connection(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Run pending migrations
    pub async fn migrate(&self) -> Result<(), DbErr> {
        migration::Migrator::up(&self.conn, None).await?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the database connection
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }
}
