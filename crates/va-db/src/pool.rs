//! Postgres pool for the `STORAGE=postgres` deployment
//!
//! The schema ships inside the binary and is applied on startup.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use va_core::config::DatabaseConfig;

/// Connections kept open even when idle
const MIN_CONNECTIONS: u32 = 1;
const IDLE_TIMEOUT_SECS: u64 = 600;
const MAX_LIFETIME_SECS: u64 = 1800;

/// Shared handle to the SmartVA database
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open the pool described by `DATABASE_URL` and the pool settings
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .min_connections(MIN_CONNECTIONS.min(config.pool_size))
            .acquire_timeout(Duration::from_secs(config.pool_timeout_seconds))
            .idle_timeout(Duration::from_secs(IDLE_TIMEOUT_SECS))
            .max_lifetime(Duration::from_secs(MAX_LIFETIME_SECS))
            .connect(&config.url)
            .await?;

        tracing::info!(
            max_connections = config.pool_size,
            "Database pool created"
        );

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded migrations
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Round trip used by the readiness probe
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
        }
    }
}

/// Pool statistics
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
}
