use alloy_primitives::{Address, Bytes, B256};
use chrono::{TimeZone, Utc};
use pbs_errors::PbsError;
use pbs_primitives::Block;
use serde::Deserialize;

/// `eth_getBlockByNumber` response shape, decoded with hex-quantity
/// fields left as strings. BSC-family chains append consensus fields
/// this pipeline does not need (`validators`, `turnLength`, ...); a
/// hand-rolled struct tolerates those extras where a strict upstream
/// `Header` type would reject them.
#[derive(Debug, Deserialize)]
pub struct RpcBlockHeader {
    pub number: String,
    pub hash: B256,
    #[serde(rename = "parentHash")]
    pub parent_hash: B256,
    pub timestamp: String,
    #[serde(rename = "miner")]
    pub fee_recipient: Address,
    #[serde(rename = "extraData")]
    pub extra_data: Bytes,
    #[serde(rename = "gasUsed")]
    pub gas_used: String,
    #[serde(rename = "gasLimit")]
    pub gas_limit: String,
    #[serde(rename = "stateRoot")]
    pub state_root: B256,
    pub size: String,
}

impl TryFrom<RpcBlockHeader> for Block {
    type Error = PbsError;

    fn try_from(raw: RpcBlockHeader) -> Result<Self, Self::Error> {
        let number = parse_hex_quantity(&raw.number)?;
        let timestamp_secs = parse_hex_quantity(&raw.timestamp)? as i64;
        let timestamp = Utc
            .timestamp_opt(timestamp_secs, 0)
            .single()
            .ok_or_else(|| PbsError::DataFormat(format!("block {number}: implausible timestamp")))?;

        Ok(Block {
            number,
            hash: raw.hash,
            parent_hash: raw.parent_hash,
            timestamp,
            fee_recipient: raw.fee_recipient,
            extra_data: raw.extra_data,
            gas_used: parse_hex_quantity(&raw.gas_used)?,
            gas_limit: parse_hex_quantity(&raw.gas_limit)?,
            state_root: raw.state_root,
            size: parse_hex_quantity(&raw.size)?,
        })
    }
}

fn parse_hex_quantity(s: &str) -> Result<u64, PbsError> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| PbsError::DataFormat(format!("malformed hex quantity {s:?}: {e}")))
}
