use chrono::{DateTime, NaiveDate, Utc};

/// Unix time of Ethereum mainnet's beacon-chain genesis. Slot 0's wall
/// clock time; every other slot is 12 seconds later.
pub const GENESIS_UNIX: i64 = 1_606_824_023;

/// Seconds per consensus-layer slot.
pub const SECONDS_PER_SLOT: i64 = 12;

/// Wall-clock time of the start of `slot`.
pub fn slot_time(slot: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(GENESIS_UNIX + slot as i64 * SECONDS_PER_SLOT, 0)
}

/// The calendar date (UTC) a slot falls in.
pub fn slot_date(slot: u64) -> Option<NaiveDate> {
    slot_time(slot).map(|dt| dt.date_naive())
}

/// The consensus slot whose wall-clock window contains `timestamp` —
/// the inverse of [`slot_time`], used to scope a live block's relay and
/// adjustment lookups to its slot when only the execution timestamp is
/// known (blocks carry no slot number of their own).
pub fn slot_for_timestamp(timestamp: DateTime<Utc>) -> u64 {
    ((timestamp.timestamp() - GENESIS_UNIX).max(0) / SECONDS_PER_SLOT) as u64
}

/// The inclusive `[start_slot, end_slot]` range of slots whose wall-clock
/// time falls on `date`.
pub fn slots_for_date(date: NaiveDate) -> (u64, u64) {
    let start = date.and_hms_opt(0, 0, 0).expect("valid time").and_utc().timestamp();
    let end = date.and_hms_opt(23, 59, 59).expect("valid time").and_utc().timestamp();
    let start_slot = ((start - GENESIS_UNIX).max(0)) / SECONDS_PER_SLOT;
    let end_slot = ((end - GENESIS_UNIX).max(0)) / SECONDS_PER_SLOT;
    (start_slot as u64, end_slot as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_slot_is_genesis_time() {
        let dt = slot_time(0).unwrap();
        assert_eq!(dt.timestamp(), GENESIS_UNIX);
    }

    #[test]
    fn slot_for_timestamp_inverts_slot_time() {
        let dt = slot_time(1_000_000).unwrap();
        assert_eq!(slot_for_timestamp(dt), 1_000_000);
    }

    #[test]
    fn slots_for_date_round_trips_into_same_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let (start, end) = slots_for_date(date);
        assert_eq!(slot_date(start).unwrap(), date);
        assert_eq!(slot_date(end).unwrap(), date);
        assert!(start <= end);
    }
}
