use alloy_primitives::{I256, U256};
use pbs_primitives::relay::{RelayId, RelayPayload};
use pbs_primitives::{AggregateRecord, Block};

/// Every input the fusion rules need for one block, already fetched from
/// the store. Kept separate from the store-backed [`crate::Aggregator`]
/// so the nine rules below are a pure function: same inputs, same
/// output, independent of when or how many times it runs (the
/// aggregate-determinism property in §8).
#[derive(Debug, Clone)]
pub struct AggregateInputs {
    pub block: Block,
    pub relay_payloads: Vec<RelayPayload>,
    pub balance_increase: Option<I256>,
    pub auxiliary_increase_sum: I256,
    pub relay_fee_sum: I256,
    pub proposer_name: String,
}

/// Applies the nine numbered fusion rules verbatim.
pub fn derive_aggregate(inputs: AggregateInputs) -> AggregateRecord {
    let AggregateInputs { block, relay_payloads, balance_increase, auxiliary_increase_sum, relay_fee_sum, proposer_name } = inputs;

    // Rule 2: relays in insertion order (the store preserves this).
    let relays: Vec<RelayId> = relay_payloads.iter().map(|p| p.relay_id.clone()).collect();
    // Rule 3.
    let is_block_vanilla = relays.is_empty();
    let n_relays = relays.len() as u32;

    // Rule 4: max value across relays, wei -> eth; 0 if vanilla.
    let proposer_subsidy = if is_block_vanilla {
        0.0
    } else {
        wei_u256_to_eth(relay_payloads.iter().map(|p| p.value).max().unwrap_or(U256::ZERO))
    };

    // Rule 5.
    let relay_fee = wei_i256_to_eth(relay_fee_sum);

    // Rule 6: absent row -> 0.
    let builder_balance_increase = balance_increase.map(wei_i256_to_eth).unwrap_or(0.0);

    // Rule 7.
    let builder_extra_transfers = wei_i256_to_eth(auxiliary_increase_sum);

    // Rule 8.
    let naive_total = builder_balance_increase + proposer_subsidy;
    let total_value = if naive_total < 0.0 { naive_total + builder_extra_transfers } else { naive_total };

    // Rule 9.
    let builder_name = pbs_normalize::normalize_builder_name(&block.extra_data);

    AggregateRecord {
        block_number: block.number,
        // Rule 1.
        block_timestamp: block.timestamp,
        builder_name,
        // Rule 10.
        proposer_name,
        is_block_vanilla,
        relays,
        n_relays,
        builder_balance_increase,
        builder_extra_transfers,
        proposer_subsidy,
        relay_fee,
        total_value,
    }
}

fn wei_u256_to_eth(v: U256) -> f64 {
    v.to_string().parse::<f64>().expect("U256 decimal string always parses") / 1e18
}

fn wei_i256_to_eth(v: I256) -> f64 {
    v.to_string().parse::<f64>().expect("I256 decimal string always parses") / 1e18
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, B256};
    use chrono::{TimeZone, Utc};

    fn sample_block(extra_data: &[u8]) -> Block {
        Block {
            number: 100,
            hash: B256::ZERO,
            parent_hash: B256::ZERO,
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            fee_recipient: Address::ZERO,
            extra_data: Bytes::from(extra_data.to_vec()),
            gas_used: 0,
            gas_limit: 0,
            state_root: B256::ZERO,
            size: 0,
        }
    }

    fn payload(relay_id: &str, value: u128) -> RelayPayload {
        RelayPayload {
            relay_id: relay_id.to_string(),
            slot: 1,
            block_number: Some(100),
            builder_public_key: "0x".into(),
            proposer_public_key: "0x".into(),
            proposer_fee_recipient: Address::ZERO,
            value: U256::from(value),
            gas_used: 0,
            gas_limit: 0,
        }
    }

    /// Scenario 1: pure vanilla block.
    #[test]
    fn vanilla_block_has_no_relays_and_zero_subsidy() {
        let record = derive_aggregate(AggregateInputs {
            block: sample_block(b"geth/v1.13.0"),
            relay_payloads: vec![],
            balance_increase: Some(I256::try_from(12_345i64).unwrap()),
            auxiliary_increase_sum: I256::ZERO,
            relay_fee_sum: I256::ZERO,
            proposer_name: "unknown".into(),
        });

        assert!(record.is_block_vanilla);
        assert_eq!(record.n_relays, 0);
        assert!(record.relays.is_empty());
        assert_eq!(record.builder_name, "unknown");
        assert_eq!(record.proposer_subsidy, 0.0);
        assert!((record.builder_balance_increase - 0.000_000_000_000_012_345).abs() < 1e-18);
        assert!((record.total_value - 0.000_000_000_000_012_345).abs() < 1e-18);
    }

    /// Scenario 2: two-relay MEV-Boost block, relays in insertion order.
    #[test]
    fn two_relay_block_sums_balance_and_max_subsidy() {
        let record = derive_aggregate(AggregateInputs {
            block: sample_block(b"beaverbuild.org"),
            relay_payloads: vec![payload("ultrasound.money", 50_000_000_000_000_000), payload("boost-relay.flashbots.net", 48_000_000_000_000_000)],
            balance_increase: Some(I256::try_from(52_000_000_000_000_000i128).unwrap()),
            auxiliary_increase_sum: I256::ZERO,
            relay_fee_sum: I256::ZERO,
            proposer_name: "unknown".into(),
        });

        assert!(!record.is_block_vanilla);
        assert_eq!(record.n_relays, 2);
        assert_eq!(record.relays, vec!["ultrasound.money", "boost-relay.flashbots.net"]);
        assert!((record.proposer_subsidy - 0.050).abs() < 1e-12);
        assert!((record.builder_balance_increase - 0.052).abs() < 1e-12);
        assert!((record.total_value - 0.102).abs() < 1e-12);
    }

    /// Scenario 3: overbid block, but the refund keeps the naive total
    /// positive, so auxiliary transfers never enter `total_value`.
    #[test]
    fn positive_naive_total_ignores_auxiliary_transfers() {
        let record = derive_aggregate(AggregateInputs {
            block: sample_block(b"titanbuilder.xyz"),
            relay_payloads: vec![payload("agnostic-relay.net", 10_000_000_000_000_000)],
            balance_increase: Some(I256::try_from(-3_000_000_000_000_000i128).unwrap()),
            auxiliary_increase_sum: I256::try_from(4_000_000_000_000_000i128).unwrap(),
            relay_fee_sum: I256::ZERO,
            proposer_name: "unknown".into(),
        });

        assert!((record.total_value - 0.007).abs() < 1e-12);
        assert!((record.builder_extra_transfers - 0.004).abs() < 1e-12);
    }

    /// Scenario 4: overbid block where the naive total stays negative, so
    /// the refund rule offsets it.
    #[test]
    fn negative_naive_total_is_offset_by_auxiliary_transfers() {
        let record = derive_aggregate(AggregateInputs {
            block: sample_block(b"titanbuilder.xyz"),
            relay_payloads: vec![payload("agnostic-relay.net", 10_000_000_000_000_000)],
            balance_increase: Some(I256::try_from(-20_000_000_000_000_000i128).unwrap()),
            auxiliary_increase_sum: I256::try_from(4_000_000_000_000_000i128).unwrap(),
            relay_fee_sum: I256::ZERO,
            proposer_name: "unknown".into(),
        });

        assert!((record.total_value - (-0.006)).abs() < 1e-12);
    }

    #[test]
    fn missing_balance_delta_row_defaults_to_zero() {
        let record = derive_aggregate(AggregateInputs {
            block: sample_block(b""),
            relay_payloads: vec![],
            balance_increase: None,
            auxiliary_increase_sum: I256::ZERO,
            relay_fee_sum: I256::ZERO,
            proposer_name: "unknown".into(),
        });
        assert_eq!(record.builder_balance_increase, 0.0);
        assert_eq!(record.total_value, 0.0);
    }

    #[test]
    fn vanilla_equivalence_holds() {
        let vanilla = derive_aggregate(AggregateInputs {
            block: sample_block(b""),
            relay_payloads: vec![],
            balance_increase: None,
            auxiliary_increase_sum: I256::ZERO,
            relay_fee_sum: I256::ZERO,
            proposer_name: "unknown".into(),
        });
        assert_eq!(vanilla.is_block_vanilla, vanilla.n_relays == 0);
        assert_eq!(vanilla.is_block_vanilla, vanilla.relays.is_empty());
        assert_eq!(vanilla.is_block_vanilla, vanilla.proposer_subsidy == 0.0);
    }
}
