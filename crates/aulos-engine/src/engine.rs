//! The engine trait the adapter is written against.

use crate::{
    error::EngineResult,
    policy::EnginePolicy,
    types::{DecodeStep, FormatReport, FrameInfo},
};

/// A stateful MPEG audio decoding engine driven in streaming-feed mode.
///
/// The engine owns all bitstream knowledge: frame sync, resynchronization
/// after corrupt input, and the decode itself. The adapter only feeds bytes
/// and drains frames; compressed input never has to align with MPEG frame
/// boundaries.
///
/// # Lifecycle
///
/// [`open_streaming`](Self::open_streaming) performs any process-wide library
/// initialization, allocates a handle, applies the policy and opens the feed;
/// `Drop` undoes all of it. One matched open/drop pair may be in flight per
/// process — implementations guard this and fail a second open with
/// [`EngineError::AlreadyActive`](crate::EngineError::AlreadyActive).
pub trait MpegEngine: Send + 'static {
    /// Open a handle in streaming-feed mode (no backing file, no random
    /// access) under the given policy.
    ///
    /// # Errors
    ///
    /// Fails if library initialization, handle allocation or the feed open
    /// fails; all partial state is released before returning.
    fn open_streaming(policy: &EnginePolicy) -> EngineResult<Self>
    where
        Self: Sized;

    /// Append compressed bytes to the engine's input buffer.
    ///
    /// Feeding never decodes; the engine buffers until
    /// [`decode_frame`](Self::decode_frame) asks for output.
    fn feed(&mut self, data: &[u8]) -> EngineResult<()>;

    /// Decode at most one frame from the buffered input.
    fn decode_frame(&mut self) -> EngineResult<DecodeStep>;

    /// Current output format. Valid after the engine has signalled
    /// [`DecodeStep::FormatChanged`] at least once.
    fn format(&mut self) -> EngineResult<FormatReport>;

    /// Metadata of the most recently decoded frame.
    fn frame_info(&mut self) -> EngineResult<FrameInfo>;

    /// Close and reopen the streaming feed, discarding all buffered input
    /// and pending decode state. Used on stream discontinuities.
    ///
    /// # Errors
    ///
    /// On failure the handle stays allocated but is unusable until a later
    /// `reset_feed` succeeds.
    fn reset_feed(&mut self) -> EngineResult<()>;
}
