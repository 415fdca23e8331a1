use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use alloy_rpc_client::{ClientBuilder, RpcClient};
use alloy_transport::TransportError;
use alloy_transport_http::Http;
use backon::{ExponentialBuilder, Retryable};
use pbs_errors::PbsError;
use pbs_primitives::Block;
use reqwest::Client as HttpClient;
use tokio::sync::Semaphore;
use url::Url;

use crate::header::RpcBlockHeader;

const RETRY_BASE: Duration = Duration::from_secs(1);
const RETRY_CAP: Duration = Duration::from_secs(60);
const RETRY_ATTEMPTS: usize = 5;

/// Batched, rate-limited JSON-RPC client for block headers and balance
/// reads, built directly over [`alloy_rpc_client::RpcClient`] rather than
/// a full [`alloy_provider::Provider`] — the pipeline never signs or
/// submits transactions, only reads.
#[derive(Clone)]
pub struct RpcReadClient {
    client: RpcClient<Http<HttpClient>>,
    batch_size: usize,
    balance_batch_size: usize,
    concurrency: Arc<Semaphore>,
}

impl RpcReadClient {
    /// `batch_size` bounds how many calls share one JSON-RPC batch request
    /// for header reads; `balance_batch_size` does the same for balance
    /// reads (§4.2 gives these different defaults, 50 vs. 10);
    /// `concurrency` bounds how many batches may be in flight at once
    /// across the whole client.
    pub fn new(url: Url, batch_size: usize, balance_batch_size: usize, concurrency: usize) -> Self {
        let client = ClientBuilder::default().http(url);
        Self {
            client,
            batch_size: batch_size.max(1),
            balance_batch_size: balance_batch_size.max(1),
            concurrency: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Fetches headers for `numbers`, preserving input order. Missing
    /// blocks surface as [`PbsError::NotFound`]; a batch whose transport
    /// keeps failing after the retry budget surfaces as
    /// [`PbsError::Transport`].
    pub async fn get_block_headers(&self, numbers: &[u64]) -> Result<Vec<Block>, PbsError> {
        let mut out = Vec::with_capacity(numbers.len());
        for chunk in numbers.chunks(self.batch_size) {
            out.extend(self.fetch_header_chunk(chunk).await?);
        }
        Ok(out)
    }

    async fn fetch_header_chunk(&self, chunk: &[u64]) -> Result<Vec<Block>, PbsError> {
        let _permit = self
            .concurrency
            .acquire()
            .await
            .expect("semaphore never closed");

        let raw = (|| async { self.request_header_batch(chunk).await })
            .retry(retry_policy())
            .when(|e: &PbsError| e.is_unit_retryable())
            .await?;

        raw.into_iter()
            .zip(chunk)
            .map(|(maybe, number)| {
                maybe
                    .ok_or_else(|| PbsError::NotFound(format!("block {number} not found")))
                    .and_then(Block::try_from)
            })
            .collect()
    }

    async fn request_header_batch(&self, chunk: &[u64]) -> Result<Vec<Option<RpcBlockHeader>>, PbsError> {
        let mut batch = self.client.new_batch();
        let mut waiters = Vec::with_capacity(chunk.len());
        for number in chunk {
            let tag = format!("0x{number:x}");
            let waiter = batch
                .add_call::<_, Option<RpcBlockHeader>>("eth_getBlockByNumber", &(tag, false))
                .map_err(map_transport_error)?;
            waiters.push(waiter);
        }
        batch.send().await.map_err(map_transport_error)?;

        let mut results = Vec::with_capacity(waiters.len());
        for waiter in waiters {
            results.push(waiter.await.map_err(map_transport_error)?);
        }
        Ok(results)
    }

    /// Fetches `address`'s balance at `at_block`. Batched the same way as
    /// header reads, just with `balance_batch_size` (see
    /// `BALANCE_BATCH_SIZE` in configuration).
    pub async fn get_balances(&self, reads: &[(Address, u64)]) -> Result<Vec<U256>, PbsError> {
        let mut out = Vec::with_capacity(reads.len());
        for chunk in reads.chunks(self.balance_batch_size) {
            out.extend(self.fetch_balance_chunk(chunk).await?);
        }
        Ok(out)
    }

    async fn fetch_balance_chunk(&self, chunk: &[(Address, u64)]) -> Result<Vec<U256>, PbsError> {
        let _permit = self
            .concurrency
            .acquire()
            .await
            .expect("semaphore never closed");

        (|| async { self.request_balance_batch(chunk).await })
            .retry(retry_policy())
            .when(|e: &PbsError| e.is_unit_retryable())
            .await
    }

    async fn request_balance_batch(&self, chunk: &[(Address, u64)]) -> Result<Vec<U256>, PbsError> {
        let mut batch = self.client.new_batch();
        let mut waiters = Vec::with_capacity(chunk.len());
        for (address, at_block) in chunk {
            let tag = format!("0x{at_block:x}");
            let waiter = batch
                .add_call::<_, U256>("eth_getBalance", &(*address, tag))
                .map_err(map_transport_error)?;
            waiters.push(waiter);
        }
        batch.send().await.map_err(map_transport_error)?;

        let mut results = Vec::with_capacity(waiters.len());
        for waiter in waiters {
            results.push(waiter.await.map_err(map_transport_error)?);
        }
        Ok(results)
    }
}

fn retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(RETRY_BASE)
        .with_max_delay(RETRY_CAP)
        .with_max_times(RETRY_ATTEMPTS)
}

fn map_transport_error(err: TransportError) -> PbsError {
    if err.to_string().contains("429") {
        return PbsError::RateLimited { retry_after: None };
    }
    match &err {
        TransportError::Transport(_) => PbsError::Transport(err.to_string()),
        TransportError::ErrorResp(_) => PbsError::ContractViolation(err.to_string()),
        _ => PbsError::DataFormat(err.to_string()),
    }
}
