use chrono::{Datelike, NaiveDate, Utc};
use pbs_aggregator::Aggregator;
use pbs_archive::ArchiveReader;
use pbs_balances::BalanceTracker;
use pbs_db::Store;
use pbs_errors::PbsError;

use crate::skeleton::BackfillSource;

/// The first date the archive is expected to carry data for. Chosen as
/// the mainnet Merge, when block building moved to PBS — there is
/// nothing upstream of it worth backfilling for this pipeline.
fn floor_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 9, 15).expect("valid constant date")
}

/// Pure date-range expansion for [`BlockBackfiller::select_work`]: every
/// date strictly after `floor`'s ordinal (or [`floor_date`] if the
/// checkpoint is still fresh) up to but excluding `today`, capped at
/// `limit` entries.
fn pending_dates(floor: i64, limit: usize, today: NaiveDate) -> Result<Vec<NaiveDate>, PbsError> {
    let next = if floor <= 0 {
        floor_date()
    } else {
        NaiveDate::from_num_days_from_ce_opt((floor + 1) as i32)
            .ok_or_else(|| PbsError::FatalRun(format!("checkpoint marker {floor} is not a valid date ordinal")))?
    };

    let mut dates = Vec::new();
    let mut date = next;
    while date < today && dates.len() < limit {
        dates.push(date);
        date = date.succ_opt().expect("calendar date does not overflow within pipeline lifetime");
    }
    Ok(dates)
}

/// Date-ascending reader of the object-store block archive. `floor` is a
/// genuine contiguous boundary here: the checkpoint marker is the number
/// of days since the proleptic Gregorian calendar's epoch for the last
/// date fully ingested, so resuming simply continues the day after it.
pub struct BlockBackfiller {
    archive: ArchiveReader,
    store: Store,
}

impl BlockBackfiller {
    pub fn new(archive: ArchiveReader, store: Store) -> Self {
        Self { archive, store }
    }
}

#[async_trait::async_trait]
impl BackfillSource for BlockBackfiller {
    type Unit = NaiveDate;

    async fn select_work(&self, floor: i64, limit: usize) -> Result<Vec<NaiveDate>, PbsError> {
        pending_dates(floor, limit, Utc::now().date_naive())
    }

    fn sequential(&self) -> bool {
        true
    }

    async fn process_unit(&self, stream_key: &str, date: NaiveDate) -> Result<i64, PbsError> {
        let blocks = self.archive.read_date(date).await?;
        let marker = date.num_days_from_ce() as i64;

        let mut tx = self.store.begin().await?;
        Store::upsert_blocks(&mut tx, &blocks).await?;
        Store::advance_checkpoint(&mut tx, stream_key, marker, None).await?;
        Store::commit(tx).await?;

        tracing::debug!(%date, blocks = blocks.len(), "backfilled block archive date");
        Ok(marker)
    }
}

/// Newest-first balance backfiller. Unlike the block archive, "missing
/// work" here is not a contiguous boundary — a block's header can land
/// well before its balance delta does, and earlier gaps can remain while
/// more recent ones are filled. `select_work` therefore re-derives the
/// to-do list directly from the store every call instead of trusting
/// `floor` to gate it; `floor` is advanced purely as a processed-count
/// for progress reporting (still monotone, per the checkpoint
/// invariant, just not a cursor this source reads back).
pub struct BalanceBackfiller {
    tracker: BalanceTracker,
    store: Store,
}

impl BalanceBackfiller {
    pub fn new(tracker: BalanceTracker, store: Store) -> Self {
        Self { tracker, store }
    }
}

#[async_trait::async_trait]
impl BackfillSource for BalanceBackfiller {
    type Unit = u64;

    async fn select_work(&self, _floor: i64, limit: usize) -> Result<Vec<u64>, PbsError> {
        self.store.blocks_missing_balance_delta(limit as i64).await
    }

    async fn process_unit(&self, stream_key: &str, number: u64) -> Result<i64, PbsError> {
        let Some(block) = self.store.get_block(number).await? else {
            return Err(PbsError::NotFound(format!("block {number} has no header to balance-track")));
        };
        self.tracker.track_block(&block).await?;

        let mut tx = self.store.begin().await?;
        Store::advance_checkpoint(&mut tx, stream_key, number as i64, None).await?;
        Store::commit(tx).await?;
        Ok(number as i64)
    }
}

/// Recomputes `AggregateRecord`s for blocks that have a header but no
/// aggregate row yet. The one backfiller with no external collaborator —
/// every input it needs is already persisted by the other stages.
pub struct AggregateBackfiller {
    aggregator: Aggregator,
    store: Store,
}

impl AggregateBackfiller {
    pub fn new(aggregator: Aggregator, store: Store) -> Self {
        Self { aggregator, store }
    }
}

#[async_trait::async_trait]
impl BackfillSource for AggregateBackfiller {
    type Unit = u64;

    async fn select_work(&self, _floor: i64, limit: usize) -> Result<Vec<u64>, PbsError> {
        self.store.blocks_missing_aggregate(limit as i64).await
    }

    async fn process_unit(&self, stream_key: &str, number: u64) -> Result<i64, PbsError> {
        self.aggregator.aggregate_range(number, number).await?;

        let mut tx = self.store.begin().await?;
        Store::advance_checkpoint(&mut tx, stream_key, number as i64, None).await?;
        Store::commit(tx).await?;
        Ok(number as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn fresh_checkpoint_starts_at_the_merge_date() {
        let dates = pending_dates(0, 5, date(2022, 9, 20)).unwrap();
        assert_eq!(dates, vec![date(2022, 9, 15), date(2022, 9, 16), date(2022, 9, 17), date(2022, 9, 18), date(2022, 9, 19)]);
    }

    #[test]
    fn resumes_the_day_after_the_marker() {
        let floor = date(2024, 1, 10).num_days_from_ce() as i64;
        let dates = pending_dates(floor, 3, date(2024, 1, 20)).unwrap();
        assert_eq!(dates, vec![date(2024, 1, 11), date(2024, 1, 12), date(2024, 1, 13)]);
    }

    #[test]
    fn stops_at_today_exclusive() {
        let floor = date(2024, 1, 18).num_days_from_ce() as i64;
        let dates = pending_dates(floor, 10, date(2024, 1, 20)).unwrap();
        assert_eq!(dates, vec![date(2024, 1, 19)]);
    }

    #[test]
    fn caught_up_to_today_yields_no_dates() {
        let floor = date(2024, 1, 19).num_days_from_ce() as i64;
        let dates = pending_dates(floor, 10, date(2024, 1, 20)).unwrap();
        assert!(dates.is_empty());
    }
}
