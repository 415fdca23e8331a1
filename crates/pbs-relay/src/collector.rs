use std::time::Duration;

use pbs_db::Store;
use pbs_errors::PbsError;
use pbs_primitives::relay::{RelayId, RelayPayload};

use crate::client::RelayClient;

const PAGE_SIZE: u32 = 200;

/// Drives one relay's pagination against the store. Per-relay isolation
/// is structural: a `RelayCollector` only ever touches its own stream_key
/// and its own checkpoint row, so one relay erroring never blocks, locks
/// out, or rolls back another relay's progress.
#[derive(Clone)]
pub struct RelayCollector {
    client: RelayClient,
    store: Store,
}

impl RelayCollector {
    pub fn new(client: RelayClient, store: Store) -> Self {
        Self { client, store }
    }

    pub fn relay_id(&self) -> &RelayId {
        self.client.relay_id()
    }

    /// Exposes the underlying client for the gap detector's targeted
    /// repair queries, which operate outside the regular sync cursor.
    pub fn client(&self) -> &RelayClient {
        &self.client
    }

    fn stream_key(&self) -> String {
        format!("relay:{}", self.client.relay_id())
    }

    /// Pages newest-to-oldest until the cursor reaches the checkpoint's
    /// `last_processed_marker`, upserting and advancing the checkpoint
    /// once per page inside one transaction. Returns the maximum slot
    /// observed this run.
    pub async fn sync(&self) -> Result<u64, PbsError> {
        let stream_key = self.stream_key();
        let checkpoint = self.store.ensure_checkpoint(&stream_key).await?;
        let floor = checkpoint.last_processed_marker.max(0) as u64;
        let mut cursor = checkpoint.cursor.as_deref().and_then(|c| c.parse::<u64>().ok());
        let mut max_seen = floor;

        loop {
            let (page, next_cursor) = self.client.page(cursor, PAGE_SIZE).await?;
            if page.is_empty() {
                break;
            }

            let min_slot_in_page = page.iter().map(|p| p.slot).min().unwrap_or(floor);
            let fresh: Vec<RelayPayload> = page.into_iter().filter(|p| p.slot > floor).collect();
            if let Some(max_slot) = fresh.iter().map(|p| p.slot).max() {
                max_seen = max_seen.max(max_slot);
            }

            if !fresh.is_empty() {
                let mut tx = self.store.begin().await?;
                Store::upsert_relay_payloads(&mut tx, &fresh).await?;
                Store::advance_checkpoint(&mut tx, &stream_key, max_seen as i64, next_cursor.map(|c| c.to_string()).as_deref())
                    .await?;
                Store::commit(tx).await?;
            }

            if min_slot_in_page <= floor || next_cursor.is_none() {
                break;
            }
            cursor = next_cursor;
        }

        tracing::debug!(relay = %self.relay_id(), max_seen, "relay sync caught up");
        Ok(max_seen)
    }

    /// Live path: waits `pre_wait` for the relay to publish (relays lag
    /// block production), then queries the single slot directly. The
    /// caller is responsible for racing this against a shutdown signal —
    /// the sleep itself carries no cancellation of its own.
    pub async fn collect_for_slot(&self, slot: u64, pre_wait: Duration) -> Result<Option<RelayPayload>, PbsError> {
        tokio::time::sleep(pre_wait).await;
        let payloads = self.client.page_slot_range(slot, slot).await?;
        let payload = payloads.into_iter().find(|p| p.slot == slot);
        if let Some(payload) = &payload {
            let mut tx = self.store.begin().await?;
            Store::upsert_relay_payloads(&mut tx, std::slice::from_ref(payload)).await?;
            Store::commit(tx).await?;
        }
        Ok(payload)
    }
}
