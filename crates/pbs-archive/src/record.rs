use alloy_primitives::{Address, Bytes, B256};
use chrono::{TimeZone, Utc};
use pbs_errors::PbsError;
use pbs_primitives::Block;
use serde::Deserialize;

/// One row of a date-partitioned archive file, decimal-encoded rather than
/// hex like the live RPC shape — the archive is an offline export, not a
/// JSON-RPC response, so its columns carry plain integers.
#[derive(Debug, Deserialize)]
pub struct ArchiveBlockRecord {
    pub number: u64,
    pub hash: B256,
    pub parent_hash: B256,
    pub timestamp: i64,
    pub fee_recipient: Address,
    pub extra_data: Bytes,
    pub gas_used: u64,
    pub gas_limit: u64,
    pub state_root: B256,
    pub size: u64,
}

impl TryFrom<ArchiveBlockRecord> for Block {
    type Error = PbsError;

    fn try_from(row: ArchiveBlockRecord) -> Result<Self, Self::Error> {
        let timestamp = Utc
            .timestamp_opt(row.timestamp, 0)
            .single()
            .ok_or_else(|| PbsError::DataFormat(format!("block {}: implausible timestamp", row.number)))?;
        Ok(Self {
            number: row.number,
            hash: row.hash,
            parent_hash: row.parent_hash,
            timestamp,
            fee_recipient: row.fee_recipient,
            extra_data: row.extra_data,
            gas_used: row.gas_used,
            gas_limit: row.gas_limit,
            state_root: row.state_root,
            size: row.size,
        })
    }
}
