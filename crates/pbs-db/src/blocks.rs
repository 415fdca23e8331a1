use crate::convert::{address_to_text, bytea_to_bytes, bytes_to_bytea, hash_to_text, text_to_address, text_to_hash};
use crate::Store;
use pbs_errors::PbsError;
use pbs_primitives::Block;
use sqlx::{Postgres, Transaction};

impl Store {
    /// Upserts a batch of blocks by `number` inside the given transaction.
    /// Re-inserting an already-stored block overwrites it with identical
    /// values, keeping ingest idempotent.
    pub async fn upsert_blocks(tx: &mut Transaction<'_, Postgres>, blocks: &[Block]) -> Result<(), PbsError> {
        for block in blocks {
            sqlx::query(
                r#"
                INSERT INTO blocks
                    (number, hash, parent_hash, block_ts, fee_recipient, extra_data, gas_used, gas_limit, state_root, size_bytes)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (number) DO UPDATE SET
                    hash = EXCLUDED.hash,
                    parent_hash = EXCLUDED.parent_hash,
                    block_ts = EXCLUDED.block_ts,
                    fee_recipient = EXCLUDED.fee_recipient,
                    extra_data = EXCLUDED.extra_data,
                    gas_used = EXCLUDED.gas_used,
                    gas_limit = EXCLUDED.gas_limit,
                    state_root = EXCLUDED.state_root,
                    size_bytes = EXCLUDED.size_bytes
                "#,
            )
            .bind(block.number as i64)
            .bind(hash_to_text(block.hash))
            .bind(hash_to_text(block.parent_hash))
            .bind(block.timestamp)
            .bind(address_to_text(block.fee_recipient))
            .bind(bytes_to_bytea(&block.extra_data))
            .bind(block.gas_used as i64)
            .bind(block.gas_limit as i64)
            .bind(hash_to_text(block.state_root))
            .bind(block.size as i64)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    pub async fn get_block(&self, number: u64) -> Result<Option<Block>, PbsError> {
        let row = sqlx::query_as::<_, BlockRow>(
            "SELECT number, hash, parent_hash, block_ts, fee_recipient, extra_data, gas_used, gas_limit, state_root, size_bytes FROM blocks WHERE number = $1",
        )
        .bind(number as i64)
        .fetch_optional(self.pool())
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    /// Block numbers in `[lo, hi]` that have no stored header yet, used by
    /// the archive backfiller to figure out what a date's file still owes.
    pub async fn missing_block_numbers(&self, numbers: &[i64]) -> Result<Vec<u64>, PbsError> {
        let existing: Vec<i64> = sqlx::query_scalar("SELECT number FROM blocks WHERE number = ANY($1)")
            .bind(numbers)
            .fetch_all(self.pool())
            .await?;
        let existing: std::collections::HashSet<i64> = existing.into_iter().collect();
        Ok(numbers.iter().filter(|n| !existing.contains(n)).map(|&n| n as u64).collect())
    }

    /// Block numbers in `[lo, hi]` that already have a header, newest
    /// first — the unit of work for stages that key off an existing block
    /// (balance tracker, relay collection, adjustments, aggregation).
    pub async fn block_numbers_in_range(&self, lo: u64, hi: u64) -> Result<Vec<u64>, PbsError> {
        let rows: Vec<i64> = sqlx::query_scalar("SELECT number FROM blocks WHERE number BETWEEN $1 AND $2 ORDER BY number DESC")
            .bind(lo as i64)
            .bind(hi as i64)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(|n| n as u64).collect())
    }
}

#[derive(sqlx::FromRow)]
struct BlockRow {
    number: i64,
    hash: String,
    parent_hash: String,
    block_ts: chrono::DateTime<chrono::Utc>,
    fee_recipient: String,
    extra_data: Vec<u8>,
    gas_used: i64,
    gas_limit: i64,
    state_root: String,
    size_bytes: i64,
}

impl TryFrom<BlockRow> for Block {
    type Error = PbsError;

    fn try_from(row: BlockRow) -> Result<Self, Self::Error> {
        Ok(Self {
            number: row.number as u64,
            hash: text_to_hash(&row.hash)?,
            parent_hash: text_to_hash(&row.parent_hash)?,
            timestamp: row.block_ts,
            fee_recipient: text_to_address(&row.fee_recipient)?,
            extra_data: bytea_to_bytes(row.extra_data),
            gas_used: row.gas_used as u64,
            gas_limit: row.gas_limit as u64,
            state_root: text_to_hash(&row.state_root)?,
            size: row.size_bytes as u64,
        })
    }
}
