use alloy_primitives::{Address, U256};

/// Identifies a relay by its hostname (e.g. `"boost-relay.flashbots.net"`).
///
/// Display names shown to humans are a presentation concern derived from
/// this identifier elsewhere; the identifier itself is the join key
/// everywhere in the pipeline.
pub type RelayId = String;

/// One relay's record of a bid, keyed by `(relay_identifier, slot)`.
///
/// `block_number` is absent for bids the relay recorded but that were never
/// delivered as the winning payload for their slot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RelayPayload {
    pub relay_id: RelayId,
    pub slot: u64,
    pub block_number: Option<u64>,
    pub builder_public_key: String,
    pub proposer_public_key: String,
    pub proposer_fee_recipient: Address,
    pub value: U256,
    pub gas_used: u64,
    pub gas_limit: u64,
}
