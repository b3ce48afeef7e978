//! Running bitrate estimation.

use aulos_engine::{BitrateMode, FrameInfo, MpegLayer, MpegVersion};
use tracing::trace;

/// Decoded samples per channel in one frame, by MPEG version and layer.
fn samples_per_frame(version: MpegVersion, layer: MpegLayer) -> u32 {
    match (version, layer) {
        (_, MpegLayer::I) => 384,
        (_, MpegLayer::II) => 1152,
        (MpegVersion::Mpeg1, MpegLayer::III) => 1152,
        (MpegVersion::Mpeg2 | MpegVersion::Mpeg25, MpegLayer::III) => 576,
    }
}

/// Bitrate derived from the compressed frame size, for frames that do not
/// declare one (free-format streams).
fn derived_bitrate(info: &FrameInfo) -> u32 {
    let spf = u64::from(samples_per_frame(info.version, info.layer));
    let bits = (info.frame_size as u64 + 4) * 8 * u64::from(info.sample_rate);
    (bits / spf) as u32
}

/// Smoothed externally-visible bitrate over a stream of frames.
///
/// CBR frames publish their rate directly — no smoothing, and the running
/// mean restarts from scratch should the stream later turn VBR. VBR frames
/// jitter rate-to-rate, so the estimator samples one frame in ten and folds
/// it into a count-weighted incremental mean.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BitrateEstimator {
    mean_rate: f64,
    mean_count: u32,
    delay: i16,
    published: u32,
}

impl BitrateEstimator {
    /// Frames between successive folds of the running mean.
    const UPDATE_INTERVAL: i16 = 10;

    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one decoded frame's metadata in and return the bitrate to
    /// publish, in bits per second.
    pub fn update(&mut self, info: &FrameInfo) -> u32 {
        if info.mode == BitrateMode::Cbr {
            self.published = if info.bitrate != 0 {
                info.bitrate
            } else {
                derived_bitrate(info)
            };
            // A later VBR frame must start its mean fresh.
            self.delay = 1;
            self.mean_rate = 0.0;
            self.mean_count = 0;
        } else {
            self.delay -= 1;
            if self.delay < 1 {
                self.mean_count += 1;
                // Saturate by halving instead of wrapping; the mean stays
                // stable and the division below never sees a wrapped count.
                if self.mean_count > u32::MAX / 2 {
                    self.mean_count = u32::MAX / 4;
                }

                self.mean_rate = (f64::from(self.mean_count - 1) * self.mean_rate
                    + f64::from(info.bitrate))
                    / f64::from(self.mean_count);
                self.published = self.mean_rate.round() as u32;
                self.delay = Self::UPDATE_INTERVAL;

                trace!(
                    bitrate = self.published,
                    samples = self.mean_count,
                    "updated mean bitrate"
                );
            }
        }
        self.published
    }

    /// Last published bitrate in bits per second, zero before any frame.
    pub fn published(&self) -> u32 {
        self.published
    }

    /// Discard all accumulated state, as on a stream discontinuity.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[cfg(test)]
    fn with_state(mean_rate: f64, mean_count: u32, delay: i16) -> Self {
        Self {
            mean_rate,
            mean_count,
            delay,
            published: 0,
        }
    }
}
