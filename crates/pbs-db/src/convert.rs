//! Conversions between `alloy_primitives` types and the column types
//! `sqlx`/Postgres natively understand. `alloy_primitives` has no `sqlx`
//! column mapping of its own, so this module owns the wire-format
//! boundary: addresses and hashes travel as lowercase `0x`-prefixed hex
//! `TEXT`, and 256-bit integers travel as `NUMERIC` via `bigdecimal`.

use alloy_primitives::{Address, Bytes, B256, I256, U256};
use bigdecimal::BigDecimal;
use pbs_errors::PbsError;
use std::str::FromStr;

pub fn address_to_text(addr: Address) -> String {
    addr.to_string()
}

pub fn text_to_address(s: &str) -> Result<Address, PbsError> {
    s.parse().map_err(|e| PbsError::DataFormat(format!("invalid address {s}: {e}")))
}

pub fn hash_to_text(hash: B256) -> String {
    hash.to_string()
}

pub fn text_to_hash(s: &str) -> Result<B256, PbsError> {
    s.parse().map_err(|e| PbsError::DataFormat(format!("invalid hash {s}: {e}")))
}

pub fn bytes_to_bytea(b: &Bytes) -> Vec<u8> {
    b.to_vec()
}

pub fn bytea_to_bytes(b: Vec<u8>) -> Bytes {
    Bytes::from(b)
}

pub fn u256_to_numeric(v: U256) -> BigDecimal {
    BigDecimal::from_str(&v.to_string()).expect("U256 decimal string always parses")
}

pub fn numeric_to_u256(v: &BigDecimal) -> Result<U256, PbsError> {
    U256::from_str_radix(&v.with_scale(0).to_string(), 10)
        .map_err(|e| PbsError::DataFormat(format!("invalid U256 numeric {v}: {e}")))
}

pub fn i256_to_numeric(v: I256) -> BigDecimal {
    BigDecimal::from_str(&v.to_string()).expect("I256 decimal string always parses")
}

pub fn numeric_to_i256(v: &BigDecimal) -> Result<I256, PbsError> {
    I256::from_dec_str(&v.with_scale(0).to_string())
        .map_err(|e| PbsError::DataFormat(format!("invalid I256 numeric {v}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u256_round_trips_through_numeric() {
        let v = U256::from(123456789012345678u128);
        assert_eq!(numeric_to_u256(&u256_to_numeric(v)).unwrap(), v);
    }

    #[test]
    fn i256_round_trips_negative_values() {
        let v = I256::try_from(-42i64).unwrap();
        assert_eq!(numeric_to_i256(&i256_to_numeric(v)).unwrap(), v);
    }

    #[test]
    fn address_round_trips_through_text() {
        let a = Address::repeat_byte(0xab);
        assert_eq!(text_to_address(&address_to_text(a)).unwrap(), a);
    }
}
