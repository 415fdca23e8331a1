//! Batched JSON-RPC reads against the execution layer: block headers by
//! number and account balances at a given height. Every call is chunked
//! into bounded batches, rate-limited by a semaphore across the whole
//! client, and retried with exponential backoff before surfacing a
//! [`pbs_errors::PbsError`].

mod client;
mod header;

pub use client::RpcReadClient;
pub use header::RpcBlockHeader;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_block_headers_preserves_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "jsonrpc": "2.0",
                    "id": 0,
                    "result": block_json(10)
                },
                {
                    "jsonrpc": "2.0",
                    "id": 1,
                    "result": block_json(11)
                }
            ])))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let client = RpcReadClient::new(url, 50, 10, 4);
        let headers = client.get_block_headers(&[10, 11]).await.unwrap();

        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].number, 10);
        assert_eq!(headers[1].number, 11);
    }

    #[tokio::test]
    async fn missing_block_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "jsonrpc": "2.0", "id": 0, "result": null }
            ])))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let client = RpcReadClient::new(url, 50, 10, 4);
        let err = client.get_block_headers(&[999]).await.unwrap_err();
        assert!(matches!(err, pbs_errors::PbsError::NotFound(_)));
    }

    fn block_json(number: u64) -> serde_json::Value {
        json!({
            "number": format!("0x{:x}", number),
            "hash": format!("0x{:064x}", number),
            "parentHash": format!("0x{:064x}", number.saturating_sub(1)),
            "timestamp": "0x656565a0",
            "miner": "0x0000000000000000000000000000000000000001",
            "extraData": "0x",
            "gasUsed": "0x5208",
            "gasLimit": "0x1c9c380",
            "stateRoot": format!("0x{:064x}", 0),
            "size": "0x220"
        })
    }
}
