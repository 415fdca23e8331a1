//! Reader for the date-partitioned block-header archive: one HTTPS GET per
//! date, zstd-decompressed into newline-delimited block records. One date
//! is one atomic unit of work — callers (the block backfiller) never fetch
//! a partial date.

mod record;

use chrono::NaiveDate;
use pbs_errors::PbsError;
use pbs_primitives::Block;
use record::ArchiveBlockRecord;
use url::Url;

/// Reads `<base>/v1.0/eth/blocks/date=YYYY-MM-DD/part-00000.zst`.
///
/// A date that does not exist upstream yet surfaces as
/// [`PbsError::NotFound`] — the caller reports it and leaves the
/// checkpoint where it is so the date is retried on the next run. A date
/// whose body fails to decompress or parse surfaces as
/// [`PbsError::DataFormat`], fatal for that date in the same sense: the
/// checkpoint is not advanced past it.
#[derive(Debug, Clone)]
pub struct ArchiveReader {
    base_url: Url,
    http: reqwest::Client,
}

impl ArchiveReader {
    pub fn new(base_url: Url) -> Self {
        Self { base_url, http: reqwest::Client::new() }
    }

    /// Fetches and decodes every block header recorded for `date`.
    pub async fn read_date(&self, date: NaiveDate) -> Result<Vec<Block>, PbsError> {
        let url = self.part_url(date)?;
        tracing::debug!(%date, %url, "fetching archive partition");

        let resp = self.http.get(url).send().await.map_err(|e| PbsError::Transport(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PbsError::NotFound(format!("no archive partition for date {date}")));
        }
        let resp = resp.error_for_status().map_err(|e| PbsError::Transport(e.to_string()))?;

        let compressed = resp.bytes().await.map_err(|e| PbsError::Transport(e.to_string()))?;
        let raw = zstd::stream::decode_all(compressed.as_ref())
            .map_err(|e| PbsError::DataFormat(format!("date {date}: zstd decode failed: {e}")))?;

        decode_records(&raw).map_err(|e| PbsError::DataFormat(format!("date {date}: {e}")))
    }

    fn part_url(&self, date: NaiveDate) -> Result<Url, PbsError> {
        self.base_url
            .join(&format!("v1.0/eth/blocks/date={date}/part-00000.zst"))
            .map_err(|e| PbsError::DataFormat(format!("invalid archive base url: {e}")))
    }
}

fn decode_records(raw: &[u8]) -> Result<Vec<Block>, String> {
    let mut blocks = Vec::new();
    for line in raw.split(|&b| b == b'\n') {
        if line.is_empty() {
            continue;
        }
        let record: ArchiveBlockRecord = serde_json::from_slice(line).map_err(|e| e.to_string())?;
        blocks.push(Block::try_from(record).map_err(|e| e.to_string())?);
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_ndjson() -> Vec<u8> {
        let row = serde_json::json!({
            "number": 100,
            "hash": format!("0x{:064x}", 1),
            "parent_hash": format!("0x{:064x}", 0),
            "timestamp": 1_700_000_000i64,
            "fee_recipient": "0x0000000000000000000000000000000000000001",
            "extra_data": "0x",
            "gas_used": 21000,
            "gas_limit": 30_000_000u64,
            "state_root": format!("0x{:064x}", 0),
            "size": 550
        });
        format!("{row}\n").into_bytes()
    }

    #[tokio::test]
    async fn reads_and_decodes_a_date_partition() {
        let server = MockServer::start().await;
        let compressed = zstd::stream::encode_all(sample_ndjson().as_slice(), 0).unwrap();
        Mock::given(method("GET"))
            .and(path("/v1.0/eth/blocks/date=2024-01-01/part-00000.zst"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(compressed))
            .mount(&server)
            .await;

        let reader = ArchiveReader::new(Url::parse(&server.uri()).unwrap());
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let blocks = reader.read_date(date).await.unwrap();

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].number, 100);
    }

    #[tokio::test]
    async fn missing_date_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/eth/blocks/date=2024-01-02/part-00000.zst"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let reader = ArchiveReader::new(Url::parse(&server.uri()).unwrap());
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let err = reader.read_date(date).await.unwrap_err();
        assert!(matches!(err, PbsError::NotFound(_)));
    }

    #[tokio::test]
    async fn corrupt_partition_is_data_format_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1.0/eth/blocks/date=2024-01-03/part-00000.zst"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not zstd".to_vec()))
            .mount(&server)
            .await;

        let reader = ArchiveReader::new(Url::parse(&server.uri()).unwrap());
        let date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let err = reader.read_date(date).await.unwrap_err();
        assert!(matches!(err, PbsError::DataFormat(_)));
    }
}
