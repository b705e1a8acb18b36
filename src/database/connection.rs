use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::QueueResult;

/// Transactional pool shared by the job store and the upload sink
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    pub async fn connect(config: &DatabaseConfig) -> QueueResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.url)
            .await?;

        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Database pool connected"
        );

        Ok(Self { pool })
    }

    /// Wrap an existing pool, e.g. one handed out by `#[sqlx::test]`
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> QueueResult<bool> {
        let row = sqlx::query("SELECT 1 as health")
            .fetch_one(&self.pool)
            .await?;

        let health: i32 = row.try_get("health")?;
        Ok(health == 1)
    }

    /// Apply the bundled `migrations/` directory
    pub async fn run_migrations(&self) -> QueueResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
