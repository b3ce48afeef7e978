//! Engine configuration applied at feed-open time.

/// Tolerance and output policy for a streaming engine handle.
///
/// The default is the policy a media-player host wants from a decoder that
/// must never give up on a live stream: no diagnostics on stderr, unlimited
/// resynchronization after corrupt input, and no automatic resampling so one
/// decoded frame never exceeds [`MAX_FRAME_SAMPLES`](crate::MAX_FRAME_SAMPLES)
/// samples per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnginePolicy {
    /// Suppress the engine's own diagnostic output.
    pub quiet: bool,

    /// Resync attempts after malformed input before the engine gives up.
    /// `None` means unlimited.
    pub resync_limit: Option<u32>,

    /// Let the engine resample output internally. Leaving this off keeps the
    /// per-frame sample count bounded by the MPEG frame sizes.
    pub auto_resample: bool,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            quiet: true,
            resync_limit: None,
            auto_resample: false,
        }
    }
}

impl EnginePolicy {
    /// Set diagnostic suppression.
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Bound the engine's resync attempts.
    pub fn with_resync_limit(mut self, limit: Option<u32>) -> Self {
        self.resync_limit = limit;
        self
    }

    /// Allow automatic output resampling.
    pub fn with_auto_resample(mut self, auto_resample: bool) -> Self {
        self.auto_resample = auto_resample;
        self
    }
}
