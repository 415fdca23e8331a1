use crate::Store;
use pbs_errors::PbsError;
use pbs_primitives::AggregateRecord;
use sqlx::{Postgres, Transaction};

impl Store {
    /// Upserts the derived aggregate record. This is the only table the
    /// aggregator writes and the only writer of this table in the whole
    /// pipeline — rerunning aggregation for a block simply overwrites its
    /// row, which is what makes aggregation rerunnable.
    pub async fn upsert_aggregate(tx: &mut Transaction<'_, Postgres>, record: &AggregateRecord) -> Result<(), PbsError> {
        sqlx::query(
            r#"
            INSERT INTO aggregate_records
                (block_number, block_ts, builder_name, proposer_name, is_block_vanilla, relays, n_relays,
                 builder_balance_increase, builder_extra_transfers, proposer_subsidy, relay_fee, total_value)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (block_number) DO UPDATE SET
                block_ts = EXCLUDED.block_ts,
                builder_name = EXCLUDED.builder_name,
                proposer_name = EXCLUDED.proposer_name,
                is_block_vanilla = EXCLUDED.is_block_vanilla,
                relays = EXCLUDED.relays,
                n_relays = EXCLUDED.n_relays,
                builder_balance_increase = EXCLUDED.builder_balance_increase,
                builder_extra_transfers = EXCLUDED.builder_extra_transfers,
                proposer_subsidy = EXCLUDED.proposer_subsidy,
                relay_fee = EXCLUDED.relay_fee,
                total_value = EXCLUDED.total_value
            "#,
        )
        .bind(record.block_number as i64)
        .bind(record.block_timestamp)
        .bind(&record.builder_name)
        .bind(&record.proposer_name)
        .bind(record.is_block_vanilla)
        .bind(&record.relays)
        .bind(record.n_relays as i32)
        .bind(record.builder_balance_increase)
        .bind(record.builder_extra_transfers)
        .bind(record.proposer_subsidy)
        .bind(record.relay_fee)
        .bind(record.total_value)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Block numbers with a stored header but no `AggregateRecord` row
    /// yet, newest first — the aggregate backfiller's unit of work.
    pub async fn blocks_missing_aggregate(&self, limit: i64) -> Result<Vec<u64>, PbsError> {
        let rows: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT b.number FROM blocks b
            LEFT JOIN aggregate_records a ON a.block_number = b.number
            WHERE a.block_number IS NULL
            ORDER BY b.number DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(|n| n as u64).collect())
    }

    pub async fn get_aggregate(&self, block_number: u64) -> Result<Option<AggregateRecord>, PbsError> {
        let row = sqlx::query_as::<_, AggregateRow>(
            r#"
            SELECT block_number, block_ts, builder_name, proposer_name, is_block_vanilla, relays, n_relays,
                   builder_balance_increase, builder_extra_transfers, proposer_subsidy, relay_fee, total_value
            FROM aggregate_records WHERE block_number = $1
            "#,
        )
        .bind(block_number as i64)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(Into::into))
    }
}

#[derive(sqlx::FromRow)]
struct AggregateRow {
    block_number: i64,
    block_ts: chrono::DateTime<chrono::Utc>,
    builder_name: String,
    proposer_name: String,
    is_block_vanilla: bool,
    relays: Vec<String>,
    n_relays: i32,
    builder_balance_increase: f64,
    builder_extra_transfers: f64,
    proposer_subsidy: f64,
    relay_fee: f64,
    total_value: f64,
}

impl From<AggregateRow> for AggregateRecord {
    fn from(row: AggregateRow) -> Self {
        Self {
            block_number: row.block_number as u64,
            block_timestamp: row.block_ts,
            builder_name: row.builder_name,
            proposer_name: row.proposer_name,
            is_block_vanilla: row.is_block_vanilla,
            relays: row.relays,
            n_relays: row.n_relays as u32,
            builder_balance_increase: row.builder_balance_increase,
            builder_extra_transfers: row.builder_extra_transfers,
            proposer_subsidy: row.proposer_subsidy,
            relay_fee: row.relay_fee,
            total_value: row.total_value,
        }
    }
}
