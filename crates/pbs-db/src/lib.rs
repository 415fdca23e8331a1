//! Persistence layer: scoped transactions with guaranteed rollback,
//! primary-key upserts for every entity, range selects, and conflict-free
//! checkpoint bookkeeping. Every stage in the pipeline is safely
//! re-runnable against this layer without producing duplicates.

mod adjustments;
mod aggregate;
mod balances;
mod blocks;
mod checkpoints;
mod convert;
mod pool;
mod relay_payloads;

pub use pool::Store;

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    /// Connects against `PBS_TEST_DATABASE_URL` when set. Skipped
    /// otherwise — these exercise real Postgres upsert/transaction
    /// semantics and are not meaningful against a mock.
    async fn test_store() -> Option<Store> {
        let url = std::env::var("PBS_TEST_DATABASE_URL").ok()?;
        let pool = PgPoolOptions::new().max_connections(2).connect(&url).await.ok()?;
        sqlx::migrate!("./migrations").run(&pool).await.ok()?;
        Some(Store::from_pool(pool))
    }

    #[tokio::test]
    async fn checkpoint_advance_is_monotone() {
        let Some(store) = test_store().await else { return };
        store.ensure_checkpoint("test-stream").await.unwrap();

        let mut tx = store.begin().await.unwrap();
        Store::advance_checkpoint(&mut tx, "test-stream", 100, None).await.unwrap();
        Store::commit(tx).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        Store::advance_checkpoint(&mut tx, "test-stream", 10, None).await.unwrap();
        Store::commit(tx).await.unwrap();

        let cp = store.get_checkpoint("test-stream").await.unwrap().unwrap();
        assert_eq!(cp.last_processed_marker, 100);
    }

    #[tokio::test]
    async fn block_upsert_is_idempotent() {
        let Some(store) = test_store().await else { return };
        let block = pbs_primitives::Block {
            number: 1,
            hash: Default::default(),
            parent_hash: Default::default(),
            timestamp: chrono::Utc::now(),
            fee_recipient: Default::default(),
            extra_data: Default::default(),
            gas_used: 1,
            gas_limit: 2,
            state_root: Default::default(),
            size: 3,
        };
        for _ in 0..2 {
            let mut tx = store.begin().await.unwrap();
            Store::upsert_blocks(&mut tx, std::slice::from_ref(&block)).await.unwrap();
            Store::commit(tx).await.unwrap();
        }
        let fetched = store.get_block(1).await.unwrap().unwrap();
        assert_eq!(fetched.gas_limit, 2);
    }
}
