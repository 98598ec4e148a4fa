//! Error taxonomy for the counting engine.
//!
//! Three classes of failure matter here:
//!
//! - **Contract violations** — count or key bytes that fail to decode. These
//!   are fatal for the partition being processed: they indicate systematic
//!   corruption of the serialization contract, not a transient fault, so the
//!   engine never retries locally. The caller (the runtime driving the
//!   partition) decides whether to re-run the partition from scratch.
//! - **Configuration errors** — malformed minimum-count entries or invalid
//!   emit arguments. These fail fast, before any records are processed.
//! - **Sink errors** — I/O failures from filesystem-backed output sinks.
//!
//! Empty runs and groups whose items are all filtered out are *not* errors;
//! they simply produce no output.

use thiserror::Error;

/// Errors raised by the counting engine.
#[derive(Debug, Error)]
pub enum TallyError {
    /// Bytes failed to encode or decode through the [`ByteCodec`](crate::codec::ByteCodec).
    ///
    /// When this surfaces from a partial-count decode it means the
    /// serialization contract was violated upstream; the current partition's
    /// results are unusable and processing aborts.
    #[error("serialization contract violation while {context}: {source}")]
    ContractViolation {
        context: &'static str,
        #[source]
        source: postcard::Error,
    },

    /// A minimum-count policy entry had a threshold below 1.
    #[error("invalid minimum count {value} for group type {group_type}: thresholds must be >= 1")]
    InvalidMinimumCount { group_type: i32, value: u64 },

    /// `emit_times` was called with `times == 0`.
    #[error("emit with times == 0 for group type {group_type}: occurrence batches must be positive")]
    ZeroTimes { group_type: i32 },

    /// A filesystem-backed sink failed to write.
    #[error("output sink I/O error: {0}")]
    Sink(#[from] std::io::Error),

    /// A row failed to serialize into an output sink.
    #[error("output row encoding error: {0}")]
    OutputEncode(#[from] serde_json::Error),
}

impl TallyError {
    pub(crate) fn decode(context: &'static str, source: postcard::Error) -> Self {
        Self::ContractViolation { context, source }
    }
}
