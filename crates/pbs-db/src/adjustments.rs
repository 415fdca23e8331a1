use crate::convert::{i256_to_numeric, numeric_to_i256};
use crate::Store;
use bigdecimal::BigDecimal;
use pbs_errors::PbsError;
use pbs_primitives::Adjustment;
use sqlx::{Postgres, Transaction};

impl Store {
    pub async fn upsert_adjustments(tx: &mut Transaction<'_, Postgres>, adjustments: &[Adjustment]) -> Result<(), PbsError> {
        for adj in adjustments {
            sqlx::query(
                r#"
                INSERT INTO adjustments (slot, delta_value, relay_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (slot) DO UPDATE SET delta_value = EXCLUDED.delta_value, relay_id = EXCLUDED.relay_id
                "#,
            )
            .bind(adj.slot as i64)
            .bind(i256_to_numeric(adj.delta_value))
            .bind(&adj.relay_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Sum of adjustment deltas for a slot. Most blocks have zero or one
    /// adjustment row, but the schema does not forbid more than one relay
    /// publishing for the same slot, so the aggregator's rule (§4.7 rule
    /// 5) is a sum, not a single lookup.
    pub async fn adjustment_sum_for_slot(&self, slot: u64) -> Result<alloy_primitives::I256, PbsError> {
        let rows: Vec<BigDecimal> = sqlx::query_scalar("SELECT delta_value FROM adjustments WHERE slot = $1")
            .bind(slot as i64)
            .fetch_all(self.pool())
            .await?;
        let mut sum = alloy_primitives::I256::ZERO;
        for row in rows {
            sum += numeric_to_i256(&row)?;
        }
        Ok(sum)
    }
}
