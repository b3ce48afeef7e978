//! The decode session driving the feed/decode/emit cycle.

use std::time::Duration;

use aulos_engine::{DecodeStep, EnginePolicy, MpegEngine};
use bytes::Bytes;
use tracing::{debug, trace};

use crate::{
    bitrate::BitrateEstimator,
    error::{DecodeError, DecodeResult},
    format::resolve_format,
    packet::PacketSource,
    types::{BlockMeta, BlockSpec, PcmBlock},
};

/// One decoding session over an exclusively-owned engine.
///
/// Opening the session opens the engine (library init, handle, tolerant
/// policy, streaming feed); dropping it releases everything. There is no
/// separate teardown call, and the failure path of [`open`](Self::open)
/// leaves nothing behind either.
///
/// A session is driven by exactly one logical decode thread. Every
/// [`decode_packet`](Self::decode_packet) call is a bounded synchronous
/// computation: pull one packet, feed it, request at most one frame.
/// Backpressure belongs to the caller — "needs more input" comes back as an
/// empty block, immediately.
pub struct DecodeSession<E: MpegEngine> {
    engine: E,
    spec: Option<BlockSpec>,
    timestamp: Option<Duration>,
    frame_offset: u64,
    estimator: BitrateEstimator,
    bitrate: u32,
}

impl<E: MpegEngine> DecodeSession<E> {
    /// Open an engine in streaming-feed mode under `policy` and wrap it in
    /// a fresh session.
    ///
    /// # Errors
    ///
    /// [`DecodeError::EngineInit`] if library initialization, handle
    /// allocation or the feed open fails. All partial engine state has been
    /// released when this returns.
    pub fn open(policy: EnginePolicy) -> DecodeResult<Self> {
        let engine = E::open_streaming(&policy).map_err(DecodeError::EngineInit)?;
        Ok(Self::with_engine(engine))
    }

    /// Wrap an already-opened engine.
    pub fn with_engine(engine: E) -> Self {
        Self {
            engine,
            spec: None,
            timestamp: None,
            frame_offset: 0,
            estimator: BitrateEstimator::new(),
            bitrate: 0,
        }
    }

    /// Pull one packet from `source`, feed it, and drain at most one
    /// decoded frame.
    ///
    /// Returns `Ok(None)` when the source is exhausted. An empty block is a
    /// normal result — the engine buffered the bytes and wants more input
    /// before it can emit a full frame; keep feeding.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Engine`] on an engine failure (fatal to this call
    /// only), [`DecodeError::UnsupportedEncoding`] when a format change
    /// lands on an encoding the adapter cannot represent, and
    /// [`DecodeError::NoSampleSize`] if a frame arrives before any format
    /// was established.
    pub fn decode_packet<S: PacketSource>(
        &mut self,
        source: &mut S,
    ) -> DecodeResult<Option<PcmBlock>> {
        let Some(packet) = source.pull_next_packet() else {
            return Ok(None);
        };

        // Next bytes decode from this presentation time; packets without a
        // timestamp keep accumulating offset from the last one seen. This
        // is what keeps multi-frame packets and sub-frame packets timed.
        if let Some(pts) = packet.pts {
            self.timestamp = Some(pts);
            self.frame_offset = 0;
        }

        // Feed only buffers; decoding happens on demand below. Packet
        // granularity and MPEG frame granularity stay decoupled.
        self.engine
            .feed(&packet.data)
            .map_err(DecodeError::Engine)?;

        let step = self.engine.decode_frame().map_err(DecodeError::Engine)?;
        let pcm = match step {
            DecodeStep::NeedMore => {
                trace!("engine needs more input");
                return Ok(Some(self.empty_block()));
            }
            DecodeStep::FormatChanged => {
                let report = self.engine.format().map_err(DecodeError::Engine)?;
                let spec = resolve_format(&report)?;
                debug!(
                    sample_rate = spec.sample_rate,
                    channels = spec.channels,
                    format = ?spec.format,
                    "stream format changed"
                );
                self.spec = Some(spec);
                Bytes::new()
            }
            DecodeStep::Decoded(pcm) | DecodeStep::Finished(pcm) => pcm,
        };

        let spec = self.spec.ok_or(DecodeError::NoSampleSize)?;
        let samples = pcm.len() / spec.frame_size();
        let block = PcmBlock {
            meta: BlockMeta {
                spec: Some(spec),
                timestamp: self.timestamp,
                frame_offset: self.frame_offset,
            },
            pcm,
        };
        self.frame_offset += samples as u64;

        // Refresh the published bitrate; a failed metadata query is not
        // worth failing the block over.
        match self.engine.frame_info() {
            Ok(info) => self.bitrate = self.estimator.update(&info),
            Err(error) => trace!(%error, "frame info unavailable"),
        }

        Ok(Some(block))
    }

    /// Handle a stream discontinuity (e.g. after a host-side seek): close
    /// and reopen the engine's feed and discard all pending decode state,
    /// leaving the session ready for a fresh stream from byte zero.
    ///
    /// # Errors
    ///
    /// [`DecodeError::ResetFailed`] if the feed could not be reopened. The
    /// session stays allocated, but decoding is undefined until a later
    /// reset succeeds.
    pub fn reset(&mut self) -> DecodeResult<()> {
        self.engine.reset_feed().map_err(DecodeError::ResetFailed)?;
        self.timestamp = None;
        self.frame_offset = 0;
        self.estimator.reset();
        self.bitrate = 0;
        debug!("decode session reset");
        Ok(())
    }

    /// Current published bitrate in bits per second, zero before the first
    /// decoded frame.
    pub fn bitrate(&self) -> u32 {
        self.bitrate
    }

    /// Current output format, `None` until the first format event.
    pub fn spec(&self) -> Option<BlockSpec> {
        self.spec
    }

    /// Get reference to the underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Consume the session and return the engine.
    pub fn into_engine(self) -> E {
        self.engine
    }

    fn empty_block(&self) -> PcmBlock {
        PcmBlock {
            meta: BlockMeta {
                spec: self.spec,
                timestamp: self.timestamp,
                frame_offset: self.frame_offset,
            },
            pcm: Bytes::new(),
        }
    }
}
