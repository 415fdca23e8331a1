use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use pbs_db::Store;
use pbs_errors::PbsError;

/// One backfillable source: what work is still missing, and how to
/// process a single unit of it. `Unit` is whatever this source chunks
/// its work into — a block number, a date, a slot.
#[async_trait]
pub trait BackfillSource: Send + Sync {
    type Unit: Send + 'static;

    /// Returns up to `limit` units not yet covered by `floor` (the
    /// checkpoint's current `last_processed_marker`), in this source's
    /// required order — newest-first for balance/relay/adjustment work,
    /// date-ascending for the block archive (§4.8).
    async fn select_work(&self, floor: i64, limit: usize) -> Result<Vec<Self::Unit>, PbsError>;

    /// Processes one unit end-to-end and, on success, upserts its rows
    /// and advances `stream_key`'s checkpoint in a single transaction.
    /// Returns the marker the checkpoint was advanced to.
    async fn process_unit(&self, stream_key: &str, unit: Self::Unit) -> Result<i64, PbsError>;

    /// Whether units in a chunk must be processed strictly in the order
    /// `select_work` returned them, stopping at the first unit-retryable
    /// failure rather than racing the rest of the chunk concurrently.
    /// Sources whose checkpoint marker is a genuine contiguous boundary
    /// (the block archive's date ordinal) need this — with concurrent
    /// processing, a later unit finishing first would advance the marker
    /// past an interior unit that is still missing, and that unit would
    /// never be re-selected. Sources that re-derive their to-do list from
    /// the store on every call (balances, aggregates) have no such
    /// ordering dependency and keep the default.
    fn sequential(&self) -> bool {
        false
    }
}

/// Outcome of one [`BackfillDriver::run`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillSummary {
    pub processed: u64,
    pub failed: u64,
}

/// The shared skeleton every backfiller is built from: read the
/// checkpoint, ask the source for a bounded chunk of missing work,
/// process units with bounded concurrency, repeat until the source
/// reports nothing left.
pub struct BackfillDriver<S: BackfillSource> {
    source: S,
    store: Store,
    stream_key: String,
    concurrency: usize,
    chunk_size: usize,
}

impl<S: BackfillSource> BackfillDriver<S> {
    pub fn new(source: S, store: Store, stream_key: impl Into<String>, concurrency: usize, chunk_size: usize) -> Self {
        Self { source, store, stream_key: stream_key.into(), concurrency: concurrency.max(1), chunk_size: chunk_size.max(1) }
    }

    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }

    /// Drives the source to completion for this invocation: a unit-level
    /// failure marks that unit failed (not advanced, retried on the next
    /// run) without aborting the rest of the chunk; a failure the unit's
    /// own retry budget could not absorb and that is not unit-retryable
    /// is fatal to this run, leaving every checkpoint already committed
    /// intact (§4.8 failure semantics).
    pub async fn run(&self) -> Result<BackfillSummary, PbsError> {
        self.store.ensure_checkpoint(&self.stream_key).await?;
        let mut summary = BackfillSummary::default();

        loop {
            let checkpoint = self
                .store
                .get_checkpoint(&self.stream_key)
                .await?
                .ok_or_else(|| PbsError::FatalRun(format!("checkpoint {} vanished mid-run", self.stream_key)))?;
            if checkpoint.completed {
                break;
            }

            let units = self.source.select_work(checkpoint.last_processed_marker, self.chunk_size).await?;
            if units.is_empty() {
                break;
            }

            let progress = indicatif::ProgressBar::new(units.len() as u64);
            progress.set_style(
                indicatif::ProgressStyle::with_template("{bar:40} {pos}/{len} ({eta}) {msg}")
                    .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
            );
            progress.set_message(self.stream_key.clone());

            let stream_key = self.stream_key.as_str();
            let results: Vec<Result<i64, PbsError>> = if self.source.sequential() {
                let mut results = Vec::new();
                for unit in units {
                    let result = self.source.process_unit(stream_key, unit).await;
                    progress.inc(1);
                    let stop = result.is_err();
                    results.push(result);
                    if stop {
                        // A gap here would let a later unit advance the
                        // checkpoint past it; stop the chunk and let the
                        // next run re-select starting from this unit.
                        break;
                    }
                }
                results
            } else {
                stream::iter(units)
                    .map(|unit| {
                        let progress = progress.clone();
                        async move {
                            let result = self.source.process_unit(stream_key, unit).await;
                            progress.inc(1);
                            result
                        }
                    })
                    .buffer_unordered(self.concurrency)
                    .collect()
                    .await
            };
            progress.finish_and_clear();

            let mut chunk_processed = 0u64;
            for result in results {
                match result {
                    Ok(_) => {
                        summary.processed += 1;
                        chunk_processed += 1;
                    }
                    Err(e) if e.is_unit_retryable() => {
                        summary.failed += 1;
                        tracing::warn!(stream = %self.stream_key, error = %e, "backfill unit failed, retrying next run");
                    }
                    Err(e) => return Err(e),
                }
            }

            if chunk_processed == 0 {
                // Nothing in this chunk advanced the checkpoint; re-selecting
                // would hand back the same failed units forever. Stop here
                // and let the next invocation retry them.
                break;
            }
        }

        tracing::info!(stream = %self.stream_key, processed = summary.processed, failed = summary.failed, "backfill pass complete");
        Ok(summary)
    }
}
