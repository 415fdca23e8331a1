use alloy_primitives::{Address, I256, U256};

/// Signed balance delta for the fee-recipient address of a single block.
///
/// Keyed by `block_number`; written once by the balance tracker and never
/// mutated afterwards. `balance_increase` may be negative when the
/// fee-recipient paid out more than it received (an overbid, see the
/// aggregator's total-value rule).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BalanceDelta {
    pub block_number: u64,
    pub address: Address,
    pub balance_before: U256,
    pub balance_after: U256,
    pub balance_increase: I256,
}

impl BalanceDelta {
    pub fn new(block_number: u64, address: Address, before: U256, after: U256) -> Self {
        let increase = I256::from_raw(after) - I256::from_raw(before);
        Self { block_number, address, balance_before: before, balance_after: after, balance_increase: increase }
    }
}

/// Balance delta for one of the fixed set of known auxiliary builder
/// addresses (proposer/refund addresses for builders that route payment
/// through a second address rather than the block's fee recipient).
///
/// Keyed by `(block_number, address)`; a block yields zero or more rows,
/// one per auxiliary address that had a nonzero balance read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AuxiliaryBuilderDelta {
    pub block_number: u64,
    pub address: Address,
    pub balance_before: U256,
    pub balance_after: U256,
    pub balance_increase: I256,
}

impl AuxiliaryBuilderDelta {
    pub fn new(block_number: u64, address: Address, before: U256, after: U256) -> Self {
        let increase = I256::from_raw(after) - I256::from_raw(before);
        Self { block_number, address, balance_before: before, balance_after: after, balance_increase: increase }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_delta_is_preserved() {
        let addr = Address::ZERO;
        let delta = BalanceDelta::new(1, addr, U256::from(100u64), U256::from(40u64));
        assert_eq!(delta.balance_increase, I256::try_from(-60i64).unwrap());
    }

    #[test]
    fn positive_delta_is_preserved() {
        let addr = Address::ZERO;
        let delta = BalanceDelta::new(1, addr, U256::from(40u64), U256::from(100u64));
        assert_eq!(delta.balance_increase, I256::try_from(60i64).unwrap());
    }
}
