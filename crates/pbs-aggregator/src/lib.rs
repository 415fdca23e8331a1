//! PBS aggregator: fuses a block's header, balance deltas, relay
//! payloads and adjustments into one [`pbs_primitives::AggregateRecord`].
//!
//! [`rules::derive_aggregate`] is the pure fusion function (the nine
//! numbered rules of the design doc, reproduced verbatim); [`Aggregator`]
//! is the thin store-backed shell around it that gathers inputs and
//! upserts the result. Aggregation is always a full re-derivation — there
//! is no incremental update path, which is what makes rerunning it over
//! the same range idempotent.

mod rules;

use alloy_primitives::I256;
use pbs_db::Store;
use pbs_errors::PbsError;
use pbs_primitives::AggregateRecord;

pub use rules::{derive_aggregate, AggregateInputs};

#[derive(Debug, Clone)]
pub struct Aggregator {
    store: Store,
}

impl Aggregator {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Re-derives the aggregate record for one block from whatever
    /// inputs are currently in the store. Returns `None` if the block
    /// itself has not been ingested yet — there is nothing to aggregate.
    pub async fn aggregate_block(&self, block_number: u64) -> Result<Option<AggregateRecord>, PbsError> {
        let Some(block) = self.store.get_block(block_number).await? else {
            return Ok(None);
        };
        let relay_payloads = self.store.relay_payloads_for_block(block_number).await?;
        let balance_delta = self.store.get_balance_delta(block_number).await?;
        let auxiliary = self.store.auxiliary_deltas_for_block(block_number).await?;

        let auxiliary_increase_sum = auxiliary.iter().fold(I256::ZERO, |acc, d| acc + d.balance_increase);

        let relay_fee_sum = match relay_payloads.first() {
            Some(payload) => self.store.adjustment_sum_for_slot(payload.slot).await?,
            None => I256::ZERO,
        };

        let proposer_name = match relay_payloads.first() {
            Some(payload) => pbs_normalize::resolve_proposer_name(&payload.proposer_fee_recipient, &[]),
            None => AggregateRecord::UNKNOWN.to_string(),
        };

        let inputs = AggregateInputs {
            block,
            relay_payloads,
            balance_increase: balance_delta.map(|d| d.balance_increase),
            auxiliary_increase_sum,
            relay_fee_sum,
            proposer_name,
        };

        Ok(Some(derive_aggregate(inputs)))
    }

    /// Re-aggregates every block in `[lo, hi]` that already has a header,
    /// upserting each record in its own transaction. Rerunnable: a second
    /// call over the same range produces byte-identical rows (§8
    /// aggregate-determinism property).
    pub async fn aggregate_range(&self, lo: u64, hi: u64) -> Result<u64, PbsError> {
        let mut aggregated = 0u64;
        for number in self.store.block_numbers_in_range(lo, hi).await? {
            let Some(record) = self.aggregate_block(number).await? else { continue };
            let mut tx = self.store.begin().await?;
            Store::upsert_aggregate(&mut tx, &record).await?;
            Store::commit(tx).await?;
            aggregated += 1;
        }
        tracing::debug!(lo, hi, aggregated, "aggregated block range");
        Ok(aggregated)
    }
}
