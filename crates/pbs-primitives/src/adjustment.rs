use crate::relay::RelayId;
use alloy_primitives::I256;

/// A post-hoc bid-value correction published by the subset of relays that
/// support it, keyed by consensus-layer `slot`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Adjustment {
    pub slot: u64,
    pub delta_value: I256,
    pub relay_id: RelayId,
}
