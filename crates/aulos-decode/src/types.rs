//! Output block types.

use std::time::Duration;

use bytes::Bytes;

/// Largest channel count MPEG audio can carry.
pub const MAX_CHANNELS: u16 = 2;

/// Externally-visible per-sample encoding of decoded PCM.
///
/// The closed set the adapter can represent; anything else the engine offers
/// is rejected at format-resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// 8-bit signed integer.
    S8,
    /// 16-bit signed integer.
    S16,
    /// 32-bit signed integer.
    S32,
    /// 32-bit float.
    F32,
}

impl SampleFormat {
    /// Bytes per single sample of one channel.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::S8 => 1,
            SampleFormat::S16 => 2,
            SampleFormat::S32 | SampleFormat::F32 => 4,
        }
    }
}

/// Resolved output format of a decode session.
///
/// Changes only on an engine new-format event and persists otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpec {
    /// Sample rate in Hz, always positive.
    pub sample_rate: u32,
    /// Interleaved channel count, `1..=MAX_CHANNELS`.
    pub channels: u16,
    /// Per-sample encoding.
    pub format: SampleFormat,
}

impl BlockSpec {
    /// Bytes of one interleaved sample frame (one sample across all
    /// channels). At least 1 for any resolved spec.
    pub fn frame_size(&self) -> usize {
        self.channels as usize * self.format.bytes_per_sample()
    }
}

/// Timing and format metadata attached to a [`PcmBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMeta {
    /// Output format. `None` only on empty blocks emitted before the first
    /// format event.
    pub spec: Option<BlockSpec>,
    /// Presentation timestamp adopted from the last timestamped packet.
    /// `None` until any packet carried one.
    pub timestamp: Option<Duration>,
    /// Samples already emitted since `timestamp`.
    pub frame_offset: u64,
}

impl BlockMeta {
    /// Presentation time of this block's first sample: `timestamp` advanced
    /// by `frame_offset` samples' duration.
    pub fn effective_timestamp(&self) -> Option<Duration> {
        let base = self.timestamp?;
        let spec = self.spec?;
        if spec.sample_rate == 0 {
            return Some(base);
        }
        let offset =
            Duration::from_secs_f64(self.frame_offset as f64 / f64::from(spec.sample_rate));
        Some(base + offset)
    }
}

/// One decode result: zero or more interleaved PCM samples plus metadata.
///
/// Ownership passes to the caller on return; the session keeps nothing.
/// Empty blocks are a valid, expected result while the engine is still
/// filling its input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmBlock {
    /// Format and timing metadata.
    pub meta: BlockMeta,
    /// Interleaved raw sample bytes.
    pub pcm: Bytes,
}

impl PcmBlock {
    /// Number of sample frames in this block (one sample per channel each).
    pub fn samples(&self) -> usize {
        match self.meta.spec {
            Some(spec) => self.pcm.len() / spec.frame_size(),
            None => 0,
        }
    }

    /// True when the block carries no samples.
    pub fn is_empty(&self) -> bool {
        self.pcm.is_empty()
    }
}
