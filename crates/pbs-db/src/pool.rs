use pbs_errors::PbsError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

/// A pooled connection to the PBS Postgres database.
///
/// Every stage and backfiller holds a cloned `Store` (the underlying
/// `PgPool` is itself cheaply cloneable); there is no global connection.
#[derive(Debug, Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Connects with a bounded pool of `max_connections` and runs pending
    /// migrations. Connection failure or a migration error is
    /// fatal-at-startup.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, PbsError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| PbsError::FatalStartup(format!("cannot connect to database: {e}")))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| PbsError::FatalStartup(format!("schema migration failed: {e}")))?;

        Ok(Self { pool })
    }

    #[cfg(test)]
    pub(crate) fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Opens a new transaction. Callers upsert rows and advance the
    /// checkpoint that covers them through this same `Transaction`, then
    /// call [`commit`](Store::commit). Dropping the transaction without
    /// committing rolls it back, so an early `?` return on any error
    /// undoes everything issued against it — there is no path that
    /// commits a partial unit of work.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, PbsError> {
        Ok(self.pool.begin().await?)
    }

    /// Commits a transaction opened with [`begin`](Store::begin).
    pub async fn commit(tx: Transaction<'static, Postgres>) -> Result<(), PbsError> {
        tx.commit().await?;
        Ok(())
    }
}
