use pbs_db::Store;
use pbs_errors::PbsError;
use pbs_primitives::relay::RelayId;
use pbs_primitives::Adjustment;

use crate::client::AdjustmentClient;

const PAGE_SIZE: u32 = 200;

/// Drives the adjustment relay's pagination against the store, on its own
/// checkpoint stream independent of that relay's regular payload stream.
#[derive(Clone)]
pub struct AdjustmentCollector {
    client: AdjustmentClient,
    store: Store,
}

impl AdjustmentCollector {
    pub fn new(client: AdjustmentClient, store: Store) -> Self {
        Self { client, store }
    }

    pub fn relay_id(&self) -> &RelayId {
        self.client.relay_id()
    }

    fn stream_key(&self) -> String {
        format!("adjustments:{}", self.client.relay_id())
    }

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

            let min_slot_in_page = page.iter().map(|a| a.slot).min().unwrap_or(floor);
            let fresh: Vec<Adjustment> = page.into_iter().filter(|a| a.slot > floor).collect();
            if let Some(max_slot) = fresh.iter().map(|a| a.slot).max() {
                max_seen = max_seen.max(max_slot);
            }

            if !fresh.is_empty() {
                let mut tx = self.store.begin().await?;
                Store::upsert_adjustments(&mut tx, &fresh).await?;
                Store::advance_checkpoint(&mut tx, &stream_key, max_seen as i64, next_cursor.map(|c| c.to_string()).as_deref())
                    .await?;
                Store::commit(tx).await?;
            }

            if min_slot_in_page <= floor || next_cursor.is_none() {
                break;
            }
            cursor = next_cursor;
        }

        Ok(max_seen)
    }
}
