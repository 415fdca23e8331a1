use chrono::NaiveDate;
use pbs_db::Store;
use pbs_errors::PbsError;
use pbs_primitives::slot::slots_for_date;

use crate::client::RelayClient;

/// An inclusive slot range a relay appears to be missing payloads for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub start_slot: u64,
    pub end_slot: u64,
}

/// A day is an outlier for a relay if its payload count is less than half
/// the relay's historical mean, or more than two standard deviations
/// below it — either threshold alone is enough to flag the day.
pub fn outlier_dates(counts: &[(NaiveDate, i64)]) -> Vec<NaiveDate> {
    if counts.len() < 2 {
        return Vec::new();
    }
    let n = counts.len() as f64;
    let mean = counts.iter().map(|(_, c)| *c as f64).sum::<f64>() / n;
    let variance = counts.iter().map(|(_, c)| (*c as f64 - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    counts
        .iter()
        .filter(|(_, count)| {
            let count = *count as f64;
            count < 0.5 * mean || count < mean - 2.0 * stddev
        })
        .map(|(date, _)| *date)
        .collect()
}

/// Merges adjacent outlier dates into contiguous slot ranges. Dates must
/// already be sorted ascending (as returned by
/// [`pbs_db::Store::relay_payload_counts_by_date`]).
pub fn consolidate_gaps(mut dates: Vec<NaiveDate>) -> Vec<Gap> {
    dates.sort();
    let mut gaps: Vec<Gap> = Vec::new();
    for date in dates {
        let (start_slot, end_slot) = slots_for_date(date);
        match gaps.last_mut() {
            Some(gap) if date.pred_opt().map(|prev| slots_for_date(prev).1) == Some(gap.end_slot) => {
                gap.end_slot = end_slot;
            }
            _ => gaps.push(Gap { start_slot, end_slot }),
        }
    }
    gaps
}

/// For each gap, re-queries the relay scoped to that slot range and
/// merges any rows missing from the store. Does not touch the relay's
/// regular checkpoint — repair is an out-of-band top-up, not a resume.
pub async fn repair_gaps(client: &RelayClient, store: &Store, gaps: &[Gap]) -> Result<u64, PbsError> {
    let mut repaired = 0u64;
    for gap in gaps {
        let already = store.relay_slots_in_range(client.relay_id(), gap.start_slot, gap.end_slot).await?;
        let payloads = client.page_slot_range(gap.start_slot, gap.end_slot).await?;
        let missing: Vec<_> = payloads.into_iter().filter(|p| !already.contains(&p.slot)).collect();
        if missing.is_empty() {
            continue;
        }
        repaired += missing.len() as u64;
        let mut tx = store.begin().await?;
        Store::upsert_relay_payloads(&mut tx, &missing).await?;
        Store::commit(tx).await?;
        tracing::info!(relay = %client.relay_id(), start = gap.start_slot, end = gap.end_slot, filled = missing.len(), "repaired relay gap");
    }
    Ok(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn flags_days_well_below_the_mean() {
        let counts = vec![
            (date(2024, 1, 1), 7000),
            (date(2024, 1, 2), 7200),
            (date(2024, 1, 3), 6900),
            (date(2024, 1, 4), 500),
            (date(2024, 1, 5), 7100),
        ];
        let outliers = outlier_dates(&counts);
        assert_eq!(outliers, vec![date(2024, 1, 4)]);
    }

    #[test]
    fn uniform_history_has_no_outliers() {
        let counts = vec![(date(2024, 1, 1), 7000), (date(2024, 1, 2), 7010), (date(2024, 1, 3), 6990)];
        assert!(outlier_dates(&counts).is_empty());
    }

    #[test]
    fn adjacent_outlier_days_consolidate_into_one_gap() {
        let dates = vec![date(2024, 1, 4), date(2024, 1, 5)];
        let gaps = consolidate_gaps(dates);
        assert_eq!(gaps.len(), 1);
        let (expected_start, _) = slots_for_date(date(2024, 1, 4));
        let (_, expected_end) = slots_for_date(date(2024, 1, 5));
        assert_eq!(gaps[0].start_slot, expected_start);
        assert_eq!(gaps[0].end_slot, expected_end);
    }

    #[test]
    fn non_adjacent_outlier_days_stay_separate_gaps() {
        let dates = vec![date(2024, 1, 4), date(2024, 1, 20)];
        let gaps = consolidate_gaps(dates);
        assert_eq!(gaps.len(), 2);
    }
}
