//! Builds every collaborator crate's entry point from [`Config`], so
//! `main.rs` stays a thin dispatcher over already-wired components.

use pbs_adjustments::{AdjustmentClient, AdjustmentCollector};
use pbs_config::Config;
use pbs_coordinator::StageContext;
use pbs_db::Store;
use pbs_errors::PbsError;
use pbs_relay::{RelayClient, RelayCollector};
use pbs_rpc_client::RpcReadClient;
use url::Url;

/// Relay token-bucket default, absent a per-relay override in
/// configuration — most public relays document a limit in this range.
const DEFAULT_RELAY_REQUESTS_PER_SECOND: u32 = 10;

pub fn build_rpc_client(config: &Config) -> Result<RpcReadClient, PbsError> {
    let url = Url::parse(&config.eth_rpc_url).map_err(|e| PbsError::FatalStartup(format!("invalid ETH_RPC_URL: {e}")))?;
    Ok(RpcReadClient::new(url, config.rpc_batch_size, config.balance_batch_size, config.rpc_concurrency))
}

/// Derives a relay's identifier from its base URL's hostname, per the
/// configuration contract in §6 ("each yields one relay identifier, its
/// hostname").
fn relay_id_for(url: &Url) -> Result<String, PbsError> {
    url.host_str().map(str::to_owned).ok_or_else(|| PbsError::FatalStartup(format!("relay url {url} has no host")))
}

pub fn build_relay_collectors(config: &Config, store: Store) -> Result<Vec<RelayCollector>, PbsError> {
    config
        .relay_urls
        .iter()
        .map(|raw| {
            let url = Url::parse(raw).map_err(|e| PbsError::FatalStartup(format!("invalid relay url {raw}: {e}")))?;
            let relay_id = relay_id_for(&url)?;
            let client = RelayClient::new(relay_id, url, DEFAULT_RELAY_REQUESTS_PER_SECOND);
            Ok(RelayCollector::new(client, store.clone()))
        })
        .collect()
}

pub fn build_adjustment_collectors(config: &Config, store: Store) -> Result<Vec<AdjustmentCollector>, PbsError> {
    let Some(raw) = &config.adjustment_relay_url else { return Ok(Vec::new()) };
    let url = Url::parse(raw).map_err(|e| PbsError::FatalStartup(format!("invalid adjustment relay url {raw}: {e}")))?;
    let relay_id = relay_id_for(&url)?;
    let client = AdjustmentClient::new(relay_id, url);
    Ok(vec![AdjustmentCollector::new(client, store)])
}

pub fn build_stage_context(config: &Config, store: Store) -> Result<StageContext, PbsError> {
    let rpc = build_rpc_client(config)?;
    let balances = pbs_balances::BalanceTracker::new(rpc.clone(), store.clone(), config.auxiliary_builder_addresses.clone());
    let relays = build_relay_collectors(config, store.clone())?;
    let adjustments = build_adjustment_collectors(config, store.clone())?;
    let aggregator = pbs_aggregator::Aggregator::new(store.clone());

    Ok(StageContext { store, rpc, balances, relays, adjustments, aggregator, relay_pre_wait: config.relay_pre_wait })
}
