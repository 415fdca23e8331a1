//! Error taxonomy shared across the ingestion pipeline.
//!
//! The variants map one-to-one onto the semantic error kinds in the design
//! doc: transient transport, rate-limited, data-format, contract
//! violation, fatal-at-startup, fatal-mid-run. Each leaf crate exposes its
//! own `Result<T>` alias over [`PbsError`] rather than inventing a new
//! error type per crate.

use std::time::Duration;

/// Unified error type for the ingestion pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PbsError {
    /// Network error, 5xx, or timeout. Retried per policy; surfaced here
    /// only once the retry budget is exhausted.
    #[error("transport error after retries: {0}")]
    Transport(String),

    /// 429 or relay-specific throttle response. Does not count against the
    /// retry budget; callers back off against the token bucket instead.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Response body could not be parsed into the expected shape.
    #[error("malformed payload: {0}")]
    DataFormat(String),

    /// The response was well-formed but violated an expected invariant
    /// (e.g. a block header missing after a successful lookup).
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// Requested resource does not exist upstream.
    #[error("not found: {0}")]
    NotFound(String),

    /// Condition that must hold before the process can begin serving
    /// traffic (DB unreachable, required env var missing, schema
    /// mismatch at migration time).
    #[error("fatal at startup: {0}")]
    FatalStartup(String),

    /// Condition discovered mid-run that invalidates continued operation
    /// (schema mismatch, invariant violation during a write).
    #[error("fatal mid-run: {0}")]
    FatalRun(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl PbsError {
    /// True for errors a caller should retry the same unit of work for
    /// later, as opposed to one that should abort the whole run.
    pub const fn is_unit_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::RateLimited { .. } | Self::DataFormat(_) | Self::ContractViolation(_) | Self::NotFound(_)
        )
    }
}

/// Convenience alias used throughout the pipeline crates.
pub type Result<T, E = PbsError> = std::result::Result<T, E>;
