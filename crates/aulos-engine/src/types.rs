//! Data types crossing the engine boundary.

use bytes::Bytes;

/// Sample encoding as reported by the engine.
///
/// This is the engine's full menu; the adapter only represents a subset and
/// rejects the rest (there is no safe default to substitute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleEncoding {
    Unsigned8,
    Signed8,
    Unsigned16,
    Signed16,
    Unsigned24,
    Signed24,
    Unsigned32,
    Signed32,
    Float32,
    Float64,
    ALaw8,
    ULaw8,
}

/// Output format as reported by the engine after a new-format event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatReport {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Per-sample encoding of the decoded PCM.
    pub encoding: SampleEncoding,
}

/// MPEG audio version of the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

/// MPEG audio layer of the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegLayer {
    I,
    II,
    III,
}

/// Bitrate mode the stream declares for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitrateMode {
    Cbr,
    Vbr,
    Abr,
}

/// Per-frame metadata queried after a successful decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Instantaneous bitrate in bits per second. Zero when the stream does
    /// not declare one (free-format frames).
    pub bitrate: u32,
    /// Declared bitrate mode.
    pub mode: BitrateMode,
    /// Compressed frame size in bytes, header included.
    pub frame_size: usize,
    /// MPEG version of the frame.
    pub version: MpegVersion,
    /// MPEG layer of the frame.
    pub layer: MpegLayer,
    /// Sample rate of the frame in Hz.
    pub sample_rate: u32,
}

/// Outcome of one `decode_frame` call.
///
/// Decoded PCM is handed over as owned [`Bytes`]; the engine keeps nothing
/// the caller has to return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeStep {
    /// One decoded frame of interleaved PCM.
    Decoded(Bytes),
    /// The engine needs more compressed input before it can emit a frame.
    /// A normal, immediate return — never an error.
    NeedMore,
    /// The output format changed; query it before interpreting further PCM.
    FormatChanged,
    /// The engine reached the declared end of the stream. Any remaining
    /// decoded bytes accompany this step.
    Finished(Bytes),
}

impl DecodeStep {
    /// Decoded PCM bytes carried by this step, if any.
    pub fn pcm(&self) -> Option<&Bytes> {
        match self {
            DecodeStep::Decoded(pcm) | DecodeStep::Finished(pcm) => Some(pcm),
            DecodeStep::NeedMore | DecodeStep::FormatChanged => None,
        }
    }
}
