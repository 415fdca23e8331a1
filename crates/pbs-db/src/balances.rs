use crate::convert::{address_to_text, i256_to_numeric, numeric_to_i256, numeric_to_u256, text_to_address, u256_to_numeric};
use crate::Store;
use bigdecimal::BigDecimal;
use pbs_errors::PbsError;
use pbs_primitives::{AuxiliaryBuilderDelta, BalanceDelta};
use sqlx::{Postgres, Transaction};

impl Store {
    pub async fn upsert_balance_delta(tx: &mut Transaction<'_, Postgres>, delta: &BalanceDelta) -> Result<(), PbsError> {
        sqlx::query(
            r#"
            INSERT INTO balance_deltas (block_number, address, balance_before, balance_after, balance_increase)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (block_number) DO UPDATE SET
                address = EXCLUDED.address,
                balance_before = EXCLUDED.balance_before,
                balance_after = EXCLUDED.balance_after,
                balance_increase = EXCLUDED.balance_increase
            "#,
        )
        .bind(delta.block_number as i64)
        .bind(address_to_text(delta.address))
        .bind(u256_to_numeric(delta.balance_before))
        .bind(u256_to_numeric(delta.balance_after))
        .bind(i256_to_numeric(delta.balance_increase))
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn get_balance_delta(&self, block_number: u64) -> Result<Option<BalanceDelta>, PbsError> {
        let row = sqlx::query_as::<_, BalanceDeltaRow>(
            "SELECT block_number, address, balance_before, balance_after, balance_increase FROM balance_deltas WHERE block_number = $1",
        )
        .bind(block_number as i64)
        .fetch_optional(self.pool())
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    pub async fn upsert_auxiliary_deltas(
        tx: &mut Transaction<'_, Postgres>,
        deltas: &[AuxiliaryBuilderDelta],
    ) -> Result<(), PbsError> {
        for delta in deltas {
            sqlx::query(
                r#"
                INSERT INTO auxiliary_builder_deltas (block_number, address, balance_before, balance_after, balance_increase)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (block_number, address) DO UPDATE SET
                    balance_before = EXCLUDED.balance_before,
                    balance_after = EXCLUDED.balance_after,
                    balance_increase = EXCLUDED.balance_increase
                "#,
            )
            .bind(delta.block_number as i64)
            .bind(address_to_text(delta.address))
            .bind(u256_to_numeric(delta.balance_before))
            .bind(u256_to_numeric(delta.balance_after))
            .bind(i256_to_numeric(delta.balance_increase))
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Block numbers with a stored header but no `BalanceDelta` row yet,
    /// newest first — the balance backfiller's unit of work (§4.8,
    /// "newest-first for balance/relay work").
    pub async fn blocks_missing_balance_delta(&self, limit: i64) -> Result<Vec<u64>, PbsError> {
        let rows: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT b.number FROM blocks b
            LEFT JOIN balance_deltas d ON d.block_number = b.number
            WHERE d.block_number IS NULL
            ORDER BY b.number DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(|n| n as u64).collect())
    }

    pub async fn auxiliary_deltas_for_block(&self, block_number: u64) -> Result<Vec<AuxiliaryBuilderDelta>, PbsError> {
        let rows = sqlx::query_as::<_, AuxDeltaRow>(
            "SELECT block_number, address, balance_before, balance_after, balance_increase FROM auxiliary_builder_deltas WHERE block_number = $1",
        )
        .bind(block_number as i64)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

#[derive(sqlx::FromRow)]
struct BalanceDeltaRow {
    block_number: i64,
    address: String,
    balance_before: BigDecimal,
    balance_after: BigDecimal,
    balance_increase: BigDecimal,
}

impl TryFrom<BalanceDeltaRow> for BalanceDelta {
    type Error = PbsError;

    fn try_from(row: BalanceDeltaRow) -> Result<Self, Self::Error> {
        Ok(Self {
            block_number: row.block_number as u64,
            address: text_to_address(&row.address)?,
            balance_before: numeric_to_u256(&row.balance_before)?,
            balance_after: numeric_to_u256(&row.balance_after)?,
            balance_increase: numeric_to_i256(&row.balance_increase)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AuxDeltaRow {
    block_number: i64,
    address: String,
    balance_before: BigDecimal,
    balance_after: BigDecimal,
    balance_increase: BigDecimal,
}

impl TryFrom<AuxDeltaRow> for AuxiliaryBuilderDelta {
    type Error = PbsError;

    fn try_from(row: AuxDeltaRow) -> Result<Self, Self::Error> {
        Ok(Self {
            block_number: row.block_number as u64,
            address: text_to_address(&row.address)?,
            balance_before: numeric_to_u256(&row.balance_before)?,
            balance_after: numeric_to_u256(&row.balance_after)?,
            balance_increase: numeric_to_i256(&row.balance_increase)?,
        })
    }
}
