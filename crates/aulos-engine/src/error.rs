//! Engine-side error type.

use thiserror::Error;

/// Errors surfaced by an [`MpegEngine`](crate::MpegEngine) implementation.
///
/// Variants carry the engine's own diagnostic text verbatim; the adapter
/// forwards it upward without interpretation. Malformed compressed input is
/// *not* an error at this boundary — the engine is configured to resync
/// through it and reports `NeedMore` instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("library init failed: {0}")]
    LibraryInit(String),

    #[error("handle allocation failed: {0}")]
    Allocation(String),

    #[error("feed open failed: {0}")]
    OpenFeed(String),

    #[error("feed failed: {0}")]
    Feed(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("format query failed: {0}")]
    Format(String),

    #[error("another engine handle is already live in this process")]
    AlreadyActive,
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
