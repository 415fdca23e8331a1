//! Domain entities shared across the PBS ingestion pipeline: blocks,
//! balance deltas, relay payloads, adjustments, the derived aggregate
//! record, and per-stream checkpoints.
//!
//! Everything here is a plain data type. Nothing in this crate talks to a
//! database, an RPC endpoint, or a relay — those live in their respective
//! crates and depend on this one, not the other way around.

mod adjustment;
mod aggregate;
mod balance;
mod block;
mod checkpoint;
pub mod relay;
pub mod slot;

pub use adjustment::Adjustment;
pub use aggregate::AggregateRecord;
pub use balance::{AuxiliaryBuilderDelta, BalanceDelta};
pub use block::Block;
pub use checkpoint::{Checkpoint, StreamKey};
pub use relay::{RelayId, RelayPayload};
