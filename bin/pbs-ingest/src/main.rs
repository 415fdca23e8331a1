//! Process entry point: parses the subcommand, wires up configuration
//! and every collaborator crate, and dispatches to either the live
//! coordinator (`run`) or one of the resumable backfillers (`backfill
//! <source>`). Exit code is 0 on clean shutdown, non-zero on a
//! fatal-at-startup or fatal-mid-run error (§6).

mod wiring;

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use pbs_config::Config;
use pbs_errors::PbsError;
use tokio::sync::watch;

#[derive(Debug, Parser)]
#[command(name = "pbs-ingest", about = "PBS market data ingestion and aggregation pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Runs the live coordinator until a termination signal is received.
    Run,
    /// Runs one backfillable stream to catch-up, then exits.
    Backfill {
        #[arg(value_enum)]
        source: BackfillSource,
    },
    /// Detects and repairs relay payload gaps against observed history.
    RepairRelayGaps,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackfillSource {
    Block,
    Balance,
    Relay,
    Adjustment,
    Aggregate,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "pbs-ingest exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), PbsError> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    if let Some(addr) = &config.metrics_addr {
        let addr = addr.parse().map_err(|e| PbsError::FatalStartup(format!("invalid METRICS_ADDR {addr}: {e}")))?;
        pbs_metrics::install_exporter(addr)
            .map_err(|e| PbsError::FatalStartup(format!("failed to install metrics exporter: {e}")))?;
    }

    let store = pbs_db::Store::connect(&config.database_url, config.db_pool_size).await?;

    match cli.command {
        Command::Run => run_coordinator(config, store).await,
        Command::Backfill { source } => run_backfill(config, store, source).await,
        Command::RepairRelayGaps => run_gap_repair(config, store).await,
    }
}

async fn run_coordinator(config: Config, store: pbs_db::Store) -> Result<(), PbsError> {
    let ctx = wiring::build_stage_context(&config, store)?;
    let coordinator = pbs_coordinator::Coordinator::new(ctx, config.eth_ws_url.clone(), config.queue_capacity, config.shutdown_grace);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(wait_for_termination(shutdown_tx));

    coordinator.run(shutdown_rx).await
}

async fn run_backfill(config: Config, store: pbs_db::Store, source: BackfillSource) -> Result<(), PbsError> {
    const CONCURRENCY: usize = 8;
    const CHUNK_SIZE: usize = 200;

    match source {
        BackfillSource::Block => {
            let archive_url = config
                .archive_base_url
                .as_ref()
                .ok_or_else(|| PbsError::FatalStartup("ARCHIVE_BASE_URL is required for block backfill".into()))?;
            let url = url::Url::parse(archive_url).map_err(|e| PbsError::FatalStartup(format!("invalid ARCHIVE_BASE_URL: {e}")))?;
            let source = pbs_backfill::BlockBackfiller::new(pbs_archive::ArchiveReader::new(url), store.clone());
            let driver = pbs_backfill::BackfillDriver::new(source, store, "blocks", CONCURRENCY, CHUNK_SIZE);
            report_summary(driver.run().await?);
        }
        BackfillSource::Balance => {
            let rpc = wiring::build_rpc_client(&config)?;
            let tracker = pbs_balances::BalanceTracker::new(rpc, store.clone(), config.auxiliary_builder_addresses.clone());
            let source = pbs_backfill::BalanceBackfiller::new(tracker, store.clone());
            let driver = pbs_backfill::BackfillDriver::new(source, store, "balances", CONCURRENCY, CHUNK_SIZE);
            report_summary(driver.run().await?);
        }
        BackfillSource::Relay => {
            let relays = wiring::build_relay_collectors(&config, store.clone())?;
            let adjustments = wiring::build_adjustment_collectors(&config, store.clone())?;
            let orchestrator = pbs_backfill::RelayBackfillOrchestrator::new(store, relays, adjustments);
            let failed = orchestrator.sync_all().await;
            if failed > 0 {
                tracing::warn!(failed, "some relays failed to sync this pass");
            }
        }
        BackfillSource::Adjustment => {
            let adjustments = wiring::build_adjustment_collectors(&config, store)?;
            for collector in adjustments {
                if let Err(e) = collector.sync().await {
                    tracing::error!(relay = %collector.relay_id(), error = %e, "adjustment backfill failed");
                }
            }
        }
        BackfillSource::Aggregate => {
            let aggregator = pbs_aggregator::Aggregator::new(store.clone());
            let source = pbs_backfill::AggregateBackfiller::new(aggregator, store.clone());
            let driver = pbs_backfill::BackfillDriver::new(source, store, "aggregates", CONCURRENCY, CHUNK_SIZE);
            report_summary(driver.run().await?);
        }
    }
    Ok(())
}

async fn run_gap_repair(config: Config, store: pbs_db::Store) -> Result<(), PbsError> {
    let relays = wiring::build_relay_collectors(&config, store.clone())?;
    let adjustments = wiring::build_adjustment_collectors(&config, store.clone())?;
    let orchestrator = pbs_backfill::RelayBackfillOrchestrator::new(store, relays, adjustments);
    let repaired = orchestrator.repair_gaps().await?;
    tracing::info!(repaired, "relay gap repair complete");
    Ok(())
}

fn report_summary(summary: pbs_backfill::BackfillSummary) {
    tracing::info!(processed = summary.processed, failed = summary.failed, "backfill run complete");
}

/// Resolves once either SIGINT or (on unix) SIGTERM arrives, flipping the
/// shared shutdown flag so every watcher wakes up together (§6).
async fn wait_for_termination(shutdown_tx: watch::Sender<bool>) {
    #[cfg(unix)]
    {
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("termination signal received, beginning graceful shutdown");
    let _ = shutdown_tx.send(true);
}
