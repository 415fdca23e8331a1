use crate::relay::RelayId;
use chrono::{DateTime, Utc};

/// The fully-recomputable, per-block derived record the PBS aggregator
/// produces by fusing [`crate::Block`], [`crate::BalanceDelta`],
/// [`crate::AuxiliaryBuilderDelta`], [`crate::RelayPayload`] and
/// [`crate::Adjustment`] rows. See `pbs-aggregator` for the fusion rules.
///
/// Eth-denominated fields are `f64`: the aggregator divides by 10^18 as its
/// last step, after all upstream arithmetic has happened over 256-bit
/// integers, so precision loss here is bounded to display precision.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AggregateRecord {
    pub block_number: u64,
    pub block_timestamp: DateTime<Utc>,
    pub builder_name: String,
    pub proposer_name: String,
    pub is_block_vanilla: bool,
    /// Relays that delivered this block, in the order their payload was
    /// first observed. Empty iff `is_block_vanilla`.
    pub relays: Vec<RelayId>,
    pub n_relays: u32,
    pub builder_balance_increase: f64,
    pub builder_extra_transfers: f64,
    pub proposer_subsidy: f64,
    pub relay_fee: f64,
    pub total_value: f64,
}

impl AggregateRecord {
    pub const UNKNOWN: &'static str = "unknown";
}
