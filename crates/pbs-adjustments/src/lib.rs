//! Collector for the per-slot post-hoc bid-value corrections published by
//! the relay subset that supports them (currently one relay). Shaped
//! after `pbs-relay`'s collector but on its own independent checkpoint
//! stream, since adjustments and regular payload delivery advance at
//! different paces for the same relay.

mod client;
mod collector;
mod record;

pub use client::AdjustmentClient;
pub use collector::AdjustmentCollector;
