/// A resumable-ingestion stream identifier, e.g. `"relay:ultrasound"` or
/// `"block-archive"`. Streams are wholly independent: advancing one never
/// blocks, waits on, or observes another.
pub type StreamKey = String;

/// Resume state for one ingestion stream.
///
/// `cursor` is the source-specific pagination token (a relay's opaque
/// cursor, a date string for the archive reader, ...); `last_processed_marker`
/// is the monotonically increasing value (slot, block number, or date
/// ordinal) compared against to decide what is still missing.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Checkpoint {
    pub stream_key: StreamKey,
    pub cursor: Option<String>,
    pub last_processed_marker: i64,
    pub completed: bool,
}

impl Checkpoint {
    pub fn new(stream_key: impl Into<StreamKey>) -> Self {
        Self { stream_key: stream_key.into(), cursor: None, last_processed_marker: 0, completed: false }
    }
}
