//! Live coordinator: the concurrency core that drives ingestion off a
//! WebSocket head subscription instead of a backfill checkpoint.
//!
//! [`ws_reader`] owns the WebSocket connection's state machine and
//! reconnect/backoff behavior; [`stages`] owns the six-stage per-block
//! fan-out; [`Coordinator`] wires the two together through a bounded
//! FIFO queue and handles graceful shutdown.

mod stages;
mod ws_reader;

use std::sync::Arc;
use std::time::Duration;

use pbs_errors::PbsError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

pub use stages::{BlockOutcome, StageContext};

/// Owns the head queue and the set of in-flight per-block stage tasks.
/// One `Coordinator` is the whole live side of the pipeline; backfill
/// runs as an entirely separate binary invocation (`crates/pbs-backfill`).
pub struct Coordinator {
    ctx: Arc<StageContext>,
    ws_url: String,
    queue_capacity: usize,
    shutdown_grace: Duration,
}

impl Coordinator {
    pub fn new(ctx: StageContext, ws_url: String, queue_capacity: usize, shutdown_grace: Duration) -> Self {
        Self { ctx: Arc::new(ctx), ws_url, queue_capacity: queue_capacity.max(1), shutdown_grace }
    }

    /// Runs until `shutdown` fires: subscribes to new heads, fans each
    /// one out to the six per-block stages with bounded concurrency (the
    /// queue's capacity is the only bound — stage tasks themselves are
    /// not separately capped, matching "stages for block N+1 may overlap
    /// stages for block N" in §4.9), and on shutdown stops accepting new
    /// heads, drains in-flight stage tasks up to the grace period, then
    /// returns.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), PbsError> {
        let (heads_tx, mut heads_rx) = mpsc::channel::<u64>(self.queue_capacity);

        let depth_sender = heads_tx.clone();
        let reader_shutdown = shutdown.clone();
        let reader_handle = tokio::spawn(ws_reader::run_head_reader(self.ws_url.clone(), heads_tx, reader_shutdown));

        let mut in_flight: JoinSet<BlockOutcome> = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                head = heads_rx.recv() => {
                    match head {
                        Some(number) => {
                            let depth = depth_sender.max_capacity() - depth_sender.capacity();
                            pbs_metrics::record_queue_depth(depth);
                            if depth == depth_sender.max_capacity() {
                                tracing::warn!(depth, "head queue at capacity, reader will stall until a slot frees");
                            }

                            let ctx = Arc::clone(&self.ctx);
                            in_flight.spawn(async move { stages::process_block(ctx, number).await });
                            // Bound memory for a long-running process: stop tracking
                            // outcomes of tasks that have already finished.
                            while in_flight.try_join_next().is_some() {}
                        }
                        None => {
                            tracing::warn!("head channel closed, coordinator stopping");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("coordinator shutting down, draining in-flight stages");
        let drained = tokio::time::timeout(self.shutdown_grace, async {
            while in_flight.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            tracing::warn!(remaining = in_flight.len(), "shutdown grace period elapsed with stages still in flight");
        }

        reader_handle.abort();
        tracing::info!("coordinator shutdown complete");
        Ok(())
    }
}
