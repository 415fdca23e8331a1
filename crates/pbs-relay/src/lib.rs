//! Multi-relay MEV-Boost payload collector.
//!
//! One [`RelayClient`]/[`RelayCollector`] pair per relay endpoint. Relays
//! are isolated from each other structurally: nothing in this crate ever
//! holds more than one relay's state at a time, so a caller driving N
//! relays concurrently (the live coordinator spawns one task per relay
//! per block; the backfiller runs every relay's paginator concurrently)
//! gets per-relay success/failure independently, per §4.4.

mod client;
mod collector;
mod gap;
mod payload;

pub use client::RelayClient;
pub use collector::RelayCollector;
pub use gap::{consolidate_gaps, outlier_dates, repair_gaps, Gap};
pub use payload::BidTrace;
