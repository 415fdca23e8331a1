//! Backfill drivers for every resumable ingestion stream.
//!
//! [`skeleton::BackfillDriver`] is the shared checkpoint/chunk loop used
//! by the sources in [`sources`] (block archive, balance tracking,
//! aggregation). Relay payload and adjustment backfill do not need that
//! skeleton — their collectors already own a complete resumable sync —
//! so they're driven instead by [`relay_orchestrator::RelayBackfillOrchestrator`].

mod relay_orchestrator;
mod skeleton;
mod sources;

pub use relay_orchestrator::RelayBackfillOrchestrator;
pub use skeleton::{BackfillDriver, BackfillSource, BackfillSummary};
pub use sources::{AggregateBackfiller, BalanceBackfiller, BlockBackfiller};
