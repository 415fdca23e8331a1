use alloy_primitives::{Address, Bytes, B256};
use chrono::{DateTime, Utc};

/// A minimal execution-layer block header, as captured by the ingest pipeline.
///
/// `number` is the primary key; blocks are immutable after insert and the
/// only mutation is upsert-by-number (re-running ingest for an already
/// stored block overwrites it with the same values).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub number: u64,
    pub hash: B256,
    pub parent_hash: B256,
    pub timestamp: DateTime<Utc>,
    pub fee_recipient: Address,
    /// Opaque builder-identification payload, up to ~32 bytes.
    pub extra_data: Bytes,
    pub gas_used: u64,
    pub gas_limit: u64,
    pub state_root: B256,
    pub size: u64,
}
