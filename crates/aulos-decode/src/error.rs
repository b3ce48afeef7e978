//! Adapter error taxonomy.

use aulos_engine::{EngineError, SampleEncoding};
use thiserror::Error;

/// Errors surfaced by a decode session.
///
/// End of stream is not an error; `decode_packet` signals it as `Ok(None)`.
/// Malformed compressed input is not one either — the engine resyncs through
/// it under the tolerant policy and the session keeps going.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Engine library/handle/feed-open failure. Fatal to the session; all
    /// partial state has been released, do not retry on the same session.
    #[error("engine init failed: {0}")]
    EngineInit(#[source] EngineError),

    /// The engine reported an encoding this adapter cannot represent.
    /// Fatal — there is no safe default encoding to assume.
    #[error("unsupported sample encoding: {0:?}")]
    UnsupportedEncoding(SampleEncoding),

    /// The engine failed the current call. Fatal to this `decode_packet`
    /// only; the host may try again with the next packet.
    #[error("engine error: {0}")]
    Engine(#[source] EngineError),

    /// A frame was produced before any format was established, so the
    /// per-sample-frame byte size is unknown.
    #[error("no sample size")]
    NoSampleSize,

    /// Reopening the feed failed during reset. The session stays allocated
    /// but decoding is undefined until a later reset succeeds.
    #[error("feed reopen failed: {0}")]
    ResetFailed(#[source] EngineError),
}

/// Result type for decode operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::init(
        DecodeError::EngineInit(EngineError::LibraryInit("no mem".into())),
        "engine init failed: library init failed: no mem"
    )]
    #[case::unsupported(
        DecodeError::UnsupportedEncoding(SampleEncoding::Float64),
        "unsupported sample encoding: Float64"
    )]
    #[case::engine(
        DecodeError::Engine(EngineError::Decode("out of sync".into())),
        "engine error: decode failed: out of sync"
    )]
    #[case::no_sample_size(DecodeError::NoSampleSize, "no sample size")]
    #[case::reset(
        DecodeError::ResetFailed(EngineError::OpenFeed("bad state".into())),
        "feed reopen failed: feed open failed: bad state"
    )]
    #[test]
    fn test_error_display(#[case] error: DecodeError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DecodeError>();
    }
}
