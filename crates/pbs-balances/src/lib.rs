//! Per-block balance delta tracking for the fee-recipient address and a
//! fixed set of known auxiliary builder addresses.
//!
//! All reads for a block are issued from the same logical unit and
//! written in a single transaction: if any read fails, nothing for that
//! block is written, so the block is simply retried whole on the next
//! pass rather than left half-populated (§4.5 invariant).

use alloy_primitives::{Address, U256};
use pbs_db::Store;
use pbs_errors::PbsError;
use pbs_primitives::{AuxiliaryBuilderDelta, Block, BalanceDelta};
use pbs_rpc_client::RpcReadClient;

#[derive(Debug, Clone)]
pub struct BalanceTracker {
    rpc: RpcReadClient,
    store: Store,
    auxiliary_addresses: Vec<Address>,
}

impl BalanceTracker {
    pub fn new(rpc: RpcReadClient, store: Store, auxiliary_addresses: Vec<Address>) -> Self {
        Self { rpc, store, auxiliary_addresses }
    }

    /// Reads balances before/after `block` for the fee recipient and
    /// every configured auxiliary address, then upserts both delta kinds
    /// together.
    pub async fn track_block(&self, block: &Block) -> Result<(), PbsError> {
        let before_block = block.number.saturating_sub(1);

        let mut reads = vec![(block.fee_recipient, before_block), (block.fee_recipient, block.number)];
        for addr in &self.auxiliary_addresses {
            reads.push((*addr, before_block));
            reads.push((*addr, block.number));
        }

        let balances = self.rpc.get_balances(&reads).await?;
        let delta = BalanceDelta::new(block.number, block.fee_recipient, balances[0], balances[1]);
        let auxiliary = build_auxiliary_deltas(block.number, &self.auxiliary_addresses, &balances[2..]);

        let mut tx = self.store.begin().await?;
        Store::upsert_balance_delta(&mut tx, &delta).await?;
        Store::upsert_auxiliary_deltas(&mut tx, &auxiliary).await?;
        Store::commit(tx).await?;

        tracing::debug!(block = block.number, increase = %delta.balance_increase, "tracked balance delta");
        Ok(())
    }
}

fn build_auxiliary_deltas(block_number: u64, addresses: &[Address], balances: &[U256]) -> Vec<AuxiliaryBuilderDelta> {
    addresses
        .iter()
        .enumerate()
        .map(|(i, addr)| AuxiliaryBuilderDelta::new(block_number, *addr, balances[2 * i], balances[2 * i + 1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auxiliary_deltas_pair_up_before_after_reads() {
        let addrs = vec![Address::repeat_byte(1), Address::repeat_byte(2)];
        let balances = vec![U256::from(10u64), U256::from(15u64), U256::from(100u64), U256::from(90u64)];
        let deltas = build_auxiliary_deltas(42, &addrs, &balances);
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].address, addrs[0]);
        assert_eq!(deltas[0].balance_increase, alloy_primitives::I256::try_from(5i64).unwrap());
        assert_eq!(deltas[1].address, addrs[1]);
        assert_eq!(deltas[1].balance_increase, alloy_primitives::I256::try_from(-10i64).unwrap());
    }

    #[test]
    fn no_auxiliary_addresses_yields_no_deltas() {
        assert!(build_auxiliary_deltas(1, &[], &[]).is_empty());
    }
}
