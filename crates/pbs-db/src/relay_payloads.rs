use crate::convert::{address_to_text, numeric_to_u256, text_to_address, u256_to_numeric};
use crate::Store;
use bigdecimal::BigDecimal;
use pbs_errors::PbsError;
use pbs_primitives::RelayPayload;
use sqlx::{Postgres, Transaction};

impl Store {
    /// Upserts a batch of payloads for a single relay. Keyed on
    /// `(relay_id, slot)`, so re-running a paginator over already-seen
    /// slots is a no-op at the storage layer.
    pub async fn upsert_relay_payloads(tx: &mut Transaction<'_, Postgres>, payloads: &[RelayPayload]) -> Result<(), PbsError> {
        for payload in payloads {
            sqlx::query(
                r#"
                INSERT INTO relay_payloads
                    (relay_id, slot, block_number, builder_public_key, proposer_public_key, proposer_fee_recipient, value, gas_used, gas_limit)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (relay_id, slot) DO UPDATE SET
                    block_number = EXCLUDED.block_number,
                    builder_public_key = EXCLUDED.builder_public_key,
                    proposer_public_key = EXCLUDED.proposer_public_key,
                    proposer_fee_recipient = EXCLUDED.proposer_fee_recipient,
                    value = EXCLUDED.value,
                    gas_used = EXCLUDED.gas_used,
                    gas_limit = EXCLUDED.gas_limit
                "#,
            )
            .bind(&payload.relay_id)
            .bind(payload.slot as i64)
            .bind(payload.block_number.map(|n| n as i64))
            .bind(&payload.builder_public_key)
            .bind(&payload.proposer_public_key)
            .bind(address_to_text(payload.proposer_fee_recipient))
            .bind(u256_to_numeric(payload.value))
            .bind(payload.gas_used as i64)
            .bind(payload.gas_limit as i64)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// All relay payloads recorded for `block_number`, in the order they
    /// were first inserted — the PBS aggregator relies on this ordering
    /// for the `relays` field's insertion-order contract.
    pub async fn relay_payloads_for_block(&self, block_number: u64) -> Result<Vec<RelayPayload>, PbsError> {
        let rows = sqlx::query_as::<_, RelayPayloadRow>(
            r#"
            SELECT relay_id, slot, block_number, builder_public_key, proposer_public_key, proposer_fee_recipient, value, gas_used, gas_limit
            FROM relay_payloads WHERE block_number = $1 ORDER BY ctid
            "#,
        )
        .bind(block_number as i64)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Count of payloads received per `(relay_id, date)`, for the gap
    /// detector's mean/stddev computation over observed history.
    pub async fn relay_payload_counts_by_date(&self, relay_id: &str) -> Result<Vec<(chrono::NaiveDate, i64)>, PbsError> {
        let slots: Vec<i64> = sqlx::query_scalar("SELECT slot FROM relay_payloads WHERE relay_id = $1")
            .bind(relay_id)
            .fetch_all(self.pool())
            .await?;
        let mut by_date: std::collections::HashMap<chrono::NaiveDate, i64> = std::collections::HashMap::new();
        for slot in slots {
            if let Some(date) = pbs_primitives::slot::slot_date(slot as u64) {
                *by_date.entry(date).or_insert(0) += 1;
            }
        }
        let mut out: Vec<_> = by_date.into_iter().collect();
        out.sort_by_key(|(date, _)| *date);
        Ok(out)
    }

    pub async fn max_slot_for_relay(&self, relay_id: &str) -> Result<Option<u64>, PbsError> {
        let max: Option<i64> = sqlx::query_scalar("SELECT MAX(slot) FROM relay_payloads WHERE relay_id = $1")
            .bind(relay_id)
            .fetch_one(self.pool())
            .await?;
        Ok(max.map(|s| s as u64))
    }

    /// Slots already present for a relay within `[lo, hi]`, used by
    /// targeted repair to know what can be skipped.
    pub async fn relay_slots_in_range(&self, relay_id: &str, lo: u64, hi: u64) -> Result<std::collections::HashSet<u64>, PbsError> {
        let rows: Vec<i64> = sqlx::query_scalar("SELECT slot FROM relay_payloads WHERE relay_id = $1 AND slot BETWEEN $2 AND $3")
            .bind(relay_id)
            .bind(lo as i64)
            .bind(hi as i64)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(|s| s as u64).collect())
    }
}

#[derive(sqlx::FromRow)]
struct RelayPayloadRow {
    relay_id: String,
    slot: i64,
    block_number: Option<i64>,
    builder_public_key: String,
    proposer_public_key: String,
    proposer_fee_recipient: String,
    value: BigDecimal,
    gas_used: i64,
    gas_limit: i64,
}

impl TryFrom<RelayPayloadRow> for RelayPayload {
    type Error = PbsError;

    fn try_from(row: RelayPayloadRow) -> Result<Self, Self::Error> {
        Ok(Self {
            relay_id: row.relay_id,
            slot: row.slot as u64,
            block_number: row.block_number.map(|n| n as u64),
            builder_public_key: row.builder_public_key,
            proposer_public_key: row.proposer_public_key,
            proposer_fee_recipient: text_to_address(&row.proposer_fee_recipient)?,
            value: numeric_to_u256(&row.value)?,
            gas_used: row.gas_used as u64,
            gas_limit: row.gas_limit as u64,
        })
    }
}
