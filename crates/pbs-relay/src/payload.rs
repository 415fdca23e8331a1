use alloy_primitives::{Address, U256};
use pbs_errors::PbsError;
use pbs_primitives::relay::{RelayId, RelayPayload};
use serde::Deserialize;

/// One relay's bid-trace row, as returned by
/// `GET /relay/v1/data/bidtraces/proposer_payload_delivered`. Relays
/// agree on this shape (it originates from the mev-boost-relay reference
/// implementation) but differ in which optional fields they bother to
/// fill in; unknown extra fields are ignored by `serde`.
#[derive(Debug, Deserialize)]
pub struct BidTrace {
    pub slot: String,
    pub block_number: Option<String>,
    pub builder_pubkey: String,
    pub proposer_pubkey: String,
    pub proposer_fee_recipient: Address,
    pub value: String,
    pub gas_used: String,
    pub gas_limit: String,
}

impl BidTrace {
    pub fn into_payload(self, relay_id: RelayId) -> Result<RelayPayload, PbsError> {
        Ok(RelayPayload {
            relay_id,
            slot: parse_u64(&self.slot)?,
            block_number: self.block_number.as_deref().map(parse_u64).transpose()?,
            builder_public_key: self.builder_pubkey,
            proposer_public_key: self.proposer_pubkey,
            proposer_fee_recipient: self.proposer_fee_recipient,
            value: U256::from_str_radix(&self.value, 10)
                .map_err(|e| PbsError::DataFormat(format!("invalid bid value {:?}: {e}", self.value)))?,
            gas_used: parse_u64(&self.gas_used)?,
            gas_limit: parse_u64(&self.gas_limit)?,
        })
    }
}

fn parse_u64(s: &str) -> Result<u64, PbsError> {
    s.parse().map_err(|e| PbsError::DataFormat(format!("invalid integer {s:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_delivered_bid_trace() {
        let raw = serde_json::json!({
            "slot": "1000",
            "block_number": "500",
            "builder_pubkey": "0xabc",
            "proposer_pubkey": "0xdef",
            "proposer_fee_recipient": "0x0000000000000000000000000000000000000001",
            "value": "50000000000000000",
            "gas_used": "21000",
            "gas_limit": "30000000"
        });
        let trace: BidTrace = serde_json::from_value(raw).unwrap();
        let payload = trace.into_payload("ultrasound.money".to_string()).unwrap();
        assert_eq!(payload.slot, 1000);
        assert_eq!(payload.block_number, Some(500));
        assert_eq!(payload.value, U256::from(50_000_000_000_000_000u128));
    }
}
