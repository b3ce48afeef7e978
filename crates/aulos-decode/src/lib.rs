#![forbid(unsafe_code)]

//! Feed-based MPEG audio decoding adapter.
//!
//! [`DecodeSession`] drives an [`MpegEngine`](aulos_engine::MpegEngine)
//! through the feed/decode/emit cycle: pull one compressed packet from a
//! [`PacketSource`], feed it, drain at most one decoded frame, and hand the
//! PCM back as a [`PcmBlock`] stamped with presentation timing. Along the
//! way the session resolves in-stream format changes and keeps a smoothed
//! bitrate estimate for VBR streams.
//!
//! # Example
//!
//! ```ignore
//! use std::collections::VecDeque;
//!
//! use aulos_decode::{DecodeSession, Packet};
//! use aulos_engine::{EnginePolicy, Mpg123Engine};
//!
//! let mut session = DecodeSession::<Mpg123Engine>::open(EnginePolicy::default())?;
//! let mut packets: VecDeque<Packet> = demuxer_output();
//! while let Some(block) = session.decode_packet(&mut packets)? {
//!     play(block);
//! }
//! ```

mod bitrate;
mod error;
mod format;
mod packet;
mod registry;
mod session;
mod types;

pub use bitrate::BitrateEstimator;
pub use error::{DecodeError, DecodeResult};
pub use format::resolve_format;
pub use packet::{Packet, PacketSource};
pub use registry::{DecoderInfo, MPEG_AUDIO, decoders};
pub use session::DecodeSession;
pub use types::{BlockMeta, BlockSpec, MAX_CHANNELS, PcmBlock, SampleFormat};
