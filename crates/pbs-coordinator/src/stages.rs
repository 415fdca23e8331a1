use std::sync::Arc;
use std::time::Duration;

use pbs_adjustments::AdjustmentCollector;
use pbs_aggregator::Aggregator;
use pbs_balances::BalanceTracker;
use pbs_db::Store;
use pbs_errors::PbsError;
use pbs_primitives::slot::slot_for_timestamp;
use pbs_relay::RelayCollector;

/// Everything one block's six-stage fan-out needs. Cheap to clone —
/// every field is itself a cheaply-cloneable handle (pool, HTTP clients) —
/// so a fresh `Arc<StageContext>` is handed to each spawned block task
/// rather than threading individual collaborators through.
pub struct StageContext {
    pub store: Store,
    pub rpc: pbs_rpc_client::RpcReadClient,
    pub balances: BalanceTracker,
    pub relays: Vec<RelayCollector>,
    pub adjustments: Vec<AdjustmentCollector>,
    pub aggregator: Aggregator,
    pub relay_pre_wait: Duration,
}

/// Outcome of one block's full stage fan-out, for logging and metrics.
/// A per-stage failure here is "defined failure" in the §4.9 sense: it is
/// recorded and does not stop the other stages or the next head.
#[derive(Debug, Default)]
pub struct BlockOutcome {
    pub header_ok: bool,
    pub balance_ok: bool,
    pub relay_ok: bool,
    pub adjustment_ok: bool,
    pub aggregate_ok: bool,
}

/// Runs the six-stage pipeline for one block: the header stage first
/// (every other stage needs the stored `Block`), then balance/auxiliary,
/// relay collection, and adjustment collection concurrently, and finally
/// the aggregate stage once those three have each reported success or
/// defined failure (§4.9 stage ordering).
pub async fn process_block(ctx: Arc<StageContext>, number: u64) -> BlockOutcome {
    let mut outcome = BlockOutcome::default();

    let started = std::time::Instant::now();
    let block = match fetch_and_store_header(&ctx, number).await {
        Ok(block) => {
            outcome.header_ok = true;
            pbs_metrics::record_stage("header", "success", started.elapsed());
            block
        }
        Err(e) => {
            pbs_metrics::record_stage("header", "failure", started.elapsed());
            tracing::error!(block = number, error = %e, stage = "header", "stage failed");
            return outcome;
        }
    };

    let slot = slot_for_timestamp(block.timestamp);

    let balance_started = std::time::Instant::now();
    let relay_started = std::time::Instant::now();
    let adjustment_started = std::time::Instant::now();
    let (balance_result, relay_result, adjustment_result) = tokio::join!(
        ctx.balances.track_block(&block),
        collect_relays(&ctx, slot),
        collect_adjustments(&ctx, slot),
    );

    outcome.balance_ok = log_stage_result(number, "balance", balance_result, balance_started.elapsed());
    outcome.relay_ok = log_stage_result(number, "relay", relay_result, relay_started.elapsed());
    outcome.adjustment_ok = log_stage_result(number, "adjustment", adjustment_result, adjustment_started.elapsed());

    let aggregate_started = std::time::Instant::now();
    match ctx.aggregator.aggregate_range(number, number).await {
        Ok(_) => {
            outcome.aggregate_ok = true;
            pbs_metrics::record_stage("aggregate", "success", aggregate_started.elapsed());
        }
        Err(e) => {
            pbs_metrics::record_stage("aggregate", "failure", aggregate_started.elapsed());
            tracing::error!(block = number, error = %e, stage = "aggregate", "stage failed");
        }
    }

    outcome
}

async fn fetch_and_store_header(ctx: &StageContext, number: u64) -> Result<pbs_primitives::Block, PbsError> {
    let mut headers = ctx.rpc.get_block_headers(&[number]).await?;
    let block = headers.pop().ok_or_else(|| PbsError::NotFound(format!("block {number} not returned by rpc")))?;

    let mut tx = ctx.store.begin().await?;
    Store::upsert_blocks(&mut tx, std::slice::from_ref(&block)).await?;
    Store::commit(tx).await?;
    Ok(block)
}

/// Relays lag block production, so this waits `relay_pre_wait` (5-10
/// minutes per §4.9) before the first attempt, then queries every
/// configured relay for this block's slot concurrently — one relay's
/// failure never blocks another's (§4.4 per-relay isolation).
async fn collect_relays(ctx: &StageContext, slot: u64) -> Result<(), PbsError> {
    let results = futures::future::join_all(
        ctx.relays.iter().map(|collector| collector.collect_for_slot(slot, ctx.relay_pre_wait)),
    )
    .await;

    let mut first_err = None;
    for (collector, result) in ctx.relays.iter().zip(results) {
        if let Err(e) = result {
            tracing::warn!(relay = %collector.relay_id(), slot, error = %e, "relay collection failed for slot");
            first_err.get_or_insert(e);
        }
    }
    first_err.map_or(Ok(()), |e| Err(e))
}

/// Re-syncs every configured adjustment stream. There is no per-slot
/// adjustment lookup — the one relay that publishes them exposes only
/// cursor pagination — so the live stage is the same resumable `sync`
/// the backfiller uses; once caught up it is a cheap no-op.
async fn collect_adjustments(ctx: &StageContext, _slot: u64) -> Result<(), PbsError> {
    let results = futures::future::join_all(ctx.adjustments.iter().map(|collector| collector.sync())).await;
    let mut first_err = None;
    for (collector, result) in ctx.adjustments.iter().zip(results) {
        if let Err(e) = result {
            tracing::warn!(relay = %collector.relay_id(), error = %e, "adjustment sync failed");
            first_err.get_or_insert(e);
        }
    }
    first_err.map_or(Ok(()), |e| Err(e))
}

fn log_stage_result(block: u64, stage: &'static str, result: Result<(), PbsError>, elapsed: Duration) -> bool {
    match result {
        Ok(()) => {
            pbs_metrics::record_stage(stage, "success", elapsed);
            true
        }
        Err(e) => {
            pbs_metrics::record_stage(stage, "failure", elapsed);
            tracing::error!(block, stage, error = %e, "stage failed");
            false
        }
    }
}
