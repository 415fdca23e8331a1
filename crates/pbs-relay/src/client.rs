use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use pbs_errors::PbsError;
use pbs_primitives::relay::{RelayId, RelayPayload};
use url::Url;

use crate::payload::BidTrace;

const RETRY_BASE: Duration = Duration::from_secs(1);
const RETRY_CAP: Duration = Duration::from_secs(60);
const RETRY_ATTEMPTS: usize = 5;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// One relay's HTTP client: a bounded token bucket, shared across every
/// call this client makes, sits in front of every request so a single
/// relay's rate limit never starves or gets starved by another relay's.
#[derive(Clone)]
pub struct RelayClient {
    relay_id: RelayId,
    base_url: Url,
    http: reqwest::Client,
    limiter: Arc<Limiter>,
}

impl RelayClient {
    /// `requests_per_second` feeds a `governor` token bucket sized to the
    /// relay's documented or observed rate limit (see `constants`-style
    /// defaults in the coordinator's configuration).
    pub fn new(relay_id: RelayId, base_url: Url, requests_per_second: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(requests_per_second.max(1)).expect("nonzero"));
        Self { relay_id, base_url, http: reqwest::Client::new(), limiter: Arc::new(RateLimiter::direct(quota)) }
    }

    pub fn relay_id(&self) -> &RelayId {
        &self.relay_id
    }

    /// One page of up to `limit` payloads, newest-to-oldest. `cursor` is
    /// the slot to page from; `None` starts from the relay's most recent
    /// delivered payload. Returns the page and the cursor for the next
    /// (older) page, or `None` once the relay has nothing older to offer.
    pub async fn page(&self, cursor: Option<u64>, limit: u32) -> Result<(Vec<RelayPayload>, Option<u64>), PbsError> {
        let traces = self.get_traces(cursor, limit).await?;
        let payloads = traces
            .into_iter()
            .map(|t| t.into_payload(self.relay_id.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        let next_cursor = if payloads.len() as u32 >= limit {
            payloads.iter().map(|p| p.slot).min().map(|s| s.saturating_sub(1))
        } else {
            None
        };
        Ok((payloads, next_cursor))
    }

    /// Queries a bounded slot range directly, used by targeted gap repair
    /// and by the live coordinator's single-block lookup. Paginates
    /// internally until the range is exhausted.
    pub async fn page_slot_range(&self, start_slot: u64, end_slot: u64) -> Result<Vec<RelayPayload>, PbsError> {
        let mut out = Vec::new();
        let mut cursor = Some(end_slot);
        loop {
            let (page, next) = self.page(cursor, 200).await?;
            let mut exhausted = false;
            for payload in page {
                if payload.slot < start_slot {
                    exhausted = true;
                    continue;
                }
                out.push(payload);
            }
            match next {
                Some(c) if c >= start_slot && !exhausted => cursor = Some(c),
                _ => break,
            }
        }
        Ok(out)
    }

    async fn get_traces(&self, cursor: Option<u64>, limit: u32) -> Result<Vec<BidTrace>, PbsError> {
        self.limiter.until_ready().await;

        (|| async { self.request_traces(cursor, limit).await })
            .retry(retry_policy())
            .when(|e: &PbsError| e.is_unit_retryable())
            .await
    }

    async fn request_traces(&self, cursor: Option<u64>, limit: u32) -> Result<Vec<BidTrace>, PbsError> {
        let mut url = self
            .base_url
            .join("relay/v1/data/bidtraces/proposer_payload_delivered")
            .map_err(|e| PbsError::DataFormat(format!("invalid relay base url: {e}")))?;
        {
            let mut qs = url.query_pairs_mut();
            qs.append_pair("limit", &limit.to_string());
            if let Some(c) = cursor {
                qs.append_pair("cursor", &c.to_string());
            }
        }

        let resp = self.http.get(url).send().await.map_err(|e| PbsError::Transport(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PbsError::RateLimited { retry_after: None });
        }
        let resp = resp.error_for_status().map_err(|e| {
            if e.status().map(|s| s.is_server_error()).unwrap_or(false) {
                PbsError::Transport(e.to_string())
            } else {
                PbsError::ContractViolation(e.to_string())
            }
        })?;

        resp.json::<Vec<BidTrace>>().await.map_err(|e| PbsError::DataFormat(e.to_string()))
    }
}

fn retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default().with_min_delay(RETRY_BASE).with_max_delay(RETRY_CAP).with_max_times(RETRY_ATTEMPTS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn trace_json(slot: u64) -> serde_json::Value {
        serde_json::json!({
            "slot": slot.to_string(),
            "block_number": (slot * 2).to_string(),
            "builder_pubkey": "0xabc",
            "proposer_pubkey": "0xdef",
            "proposer_fee_recipient": "0x0000000000000000000000000000000000000001",
            "value": "1000000000000000",
            "gas_used": "21000",
            "gas_limit": "30000000"
        })
    }

    #[tokio::test]
    async fn page_reports_no_next_cursor_below_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/relay/v1/data/bidtraces/proposer_payload_delivered"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![trace_json(100), trace_json(99)]))
            .mount(&server)
            .await;

        let client = RelayClient::new("test-relay".to_string(), Url::parse(&server.uri()).unwrap(), 50);
        let (payloads, next) = client.page(None, 200).await.unwrap();
        assert_eq!(payloads.len(), 2);
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn full_page_yields_a_next_cursor_below_the_minimum_slot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/relay/v1/data/bidtraces/proposer_payload_delivered"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![trace_json(100), trace_json(99)]))
            .mount(&server)
            .await;

        let client = RelayClient::new("test-relay".to_string(), Url::parse(&server.uri()).unwrap(), 50);
        let (_, next) = client.page(None, 2).await.unwrap();
        assert_eq!(next, Some(98));
    }
}
