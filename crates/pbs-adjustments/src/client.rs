use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use pbs_errors::PbsError;
use pbs_primitives::relay::RelayId;
use pbs_primitives::Adjustment;
use url::Url;

use crate::record::AdjustmentRecord;

const RETRY_BASE: Duration = Duration::from_secs(1);
const RETRY_CAP: Duration = Duration::from_secs(60);
const RETRY_ATTEMPTS: usize = 5;

/// HTTP client for the one relay that publishes post-hoc bid
/// adjustments. Shaped like [`pbs_relay::RelayClient`] but without a rate
/// limiter of its own — adjustment volume is a small fraction of bid
/// traffic and shares the relay's general-purpose limit at the caller's
/// discretion.
#[derive(Clone)]
pub struct AdjustmentClient {
    relay_id: RelayId,
    base_url: Url,
    http: reqwest::Client,
}

impl AdjustmentClient {
    pub fn new(relay_id: RelayId, base_url: Url) -> Self {
        Self { relay_id, base_url, http: reqwest::Client::new() }
    }

    pub fn relay_id(&self) -> &RelayId {
        &self.relay_id
    }

    /// One page of up to `limit` adjustments, newest-to-oldest from
    /// `cursor` (a slot), and the cursor for the next page.
    pub async fn page(&self, cursor: Option<u64>, limit: u32) -> Result<(Vec<Adjustment>, Option<u64>), PbsError> {
        let records = (|| async { self.request_page(cursor, limit).await })
            .retry(retry_policy())
            .when(|e: &PbsError| e.is_unit_retryable())
            .await?;

        let adjustments =
            records.into_iter().map(|r| r.into_adjustment(self.relay_id.clone())).collect::<Result<Vec<_>, _>>()?;
        let next_cursor = if adjustments.len() as u32 >= limit {
            adjustments.iter().map(|a| a.slot).min().map(|s| s.saturating_sub(1))
        } else {
            None
        };
        Ok((adjustments, next_cursor))
    }

    async fn request_page(&self, cursor: Option<u64>, limit: u32) -> Result<Vec<AdjustmentRecord>, PbsError> {
        let mut url = self
            .base_url
            .join("relay/v1/data/bidtraces/adjustments")
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
        let resp = resp.error_for_status().map_err(|e| PbsError::Transport(e.to_string()))?;
        resp.json::<Vec<AdjustmentRecord>>().await.map_err(|e| PbsError::DataFormat(e.to_string()))
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

    #[tokio::test]
    async fn decodes_a_page_of_adjustments() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/relay/v1/data/bidtraces/adjustments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "slot": "500", "delta_value": "-12345" }
            ])))
            .mount(&server)
            .await;

        let client = AdjustmentClient::new("ultrasound.money".to_string(), Url::parse(&server.uri()).unwrap());
        let (adjustments, next) = client.page(None, 200).await.unwrap();
        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].slot, 500);
        assert!(next.is_none());
    }
}
