//! Thin metrics wrapper around the `metrics` facade, mirroring the
//! teacher's own always-on metrics crate: counters and histograms are free
//! functions keyed by a `stage` label, and installing an exporter is a
//! one-line opt-in the binary performs only if `METRICS_ADDR` is set.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Installs a Prometheus exporter bound to `addr`. Call once at process
/// startup; subsequent `metrics::counter!`/`metrics::histogram!` calls from
/// anywhere in the process are then scraped from `/metrics`.
pub fn install_exporter(addr: SocketAddr) -> Result<(), metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(%addr, "metrics exporter installed");
    Ok(())
}

/// Records a stage's outcome: one counter increment per `(stage, outcome)`
/// pair, plus a duration histogram for successful runs.
pub fn record_stage(stage: &'static str, outcome: &'static str, elapsed: std::time::Duration) {
    metrics::counter!("pbs_stage_total", "stage" => stage, "outcome" => outcome).increment(1);
    if outcome == "success" {
        metrics::histogram!("pbs_stage_duration_seconds", "stage" => stage).record(elapsed.as_secs_f64());
    }
}

/// Records the current depth of the live coordinator's bounded queue.
pub fn record_queue_depth(depth: usize) {
    metrics::gauge!("pbs_queue_depth").set(depth as f64);
}

/// Records a checkpoint advance for a backfill stream.
pub fn record_checkpoint_advance(stream_key: &str, marker: i64) {
    metrics::gauge!("pbs_checkpoint_marker", "stream" => stream_key.to_owned()).set(marker as f64);
}
