use std::str::FromStr;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

/// Synthetic row id handed back on insert.
pub type RecordId = i64;

/// Handle to the embedded record store.
///
/// Every operation is a short auto-committing statement except
/// [`RecordStore::save_generation`], which writes a reading and its plan in a
/// single transaction. The handle is cheap to clone and must be closed
/// explicitly with [`RecordStore::close`] on shutdown.
#[derive(Clone, Debug)]
pub struct RecordStore {
    pub(crate) pool: SqlitePool,
}

impl RecordStore {
    pub async fn open(database_url: &str) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("parse database url {database_url}"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .context("connect to database")?;
        Self::migrate(pool).await
    }

    /// Private in-memory database; all connections share one handle so the
    /// data survives for the lifetime of the store.
    pub async fn open_in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("open in-memory database")?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> anyhow::Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("run migrations")?;
        tracing::debug!("record store ready");
        Ok(Self { pool })
    }

    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("record store closed");
    }

    /// Clears both tables for every user.
    pub async fn reset_all(&self) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM meal_plans").execute(&self.pool).await?;
        sqlx::query("DELETE FROM readings").execute(&self.pool).await?;
        tracing::warn!("record store reset");
        Ok(())
    }
}
