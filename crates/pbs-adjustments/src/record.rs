use alloy_primitives::I256;
use pbs_errors::PbsError;
use pbs_primitives::relay::RelayId;
use pbs_primitives::Adjustment;
use serde::Deserialize;

/// One post-hoc bid-adjustment record, as published by the relay subset
/// that corrects bid values after delivery (currently one relay).
#[derive(Debug, Deserialize)]
pub struct AdjustmentRecord {
    pub slot: String,
    pub delta_value: String,
}

impl AdjustmentRecord {
    pub fn into_adjustment(self, relay_id: RelayId) -> Result<Adjustment, PbsError> {
        Ok(Adjustment {
            slot: self.slot.parse().map_err(|e| PbsError::DataFormat(format!("invalid slot {:?}: {e}", self.slot)))?,
            delta_value: I256::from_dec_str(&self.delta_value)
                .map_err(|e| PbsError::DataFormat(format!("invalid delta_value {:?}: {e}", self.delta_value)))?,
            relay_id,
        })
    }
}
