#![deny(unsafe_code)]

//! Decoding-engine interface boundary for the aulos MPEG audio adapter.
//!
//! The adapter in `aulos-decode` never touches MPEG bitstreams itself; it
//! drives an engine through the [`MpegEngine`] trait: open a streaming feed,
//! push compressed bytes in, pull decoded frames out, and query the engine's
//! view of the stream (output format, per-frame bitrate metadata).
//!
//! Two implementations ship with this crate:
//!
//! - [`ScriptedEngine`] (feature `test-utils`, always available in tests) — a
//!   deterministic in-memory engine driven by a pre-recorded script.
//! - `Mpg123Engine` (feature `libmpg123`) — the real thing, linking the
//!   system libmpg123.

mod engine;
mod error;
mod policy;
mod types;

#[cfg(any(test, feature = "test-utils"))]
mod script;

#[cfg(feature = "libmpg123")]
mod mpg123;

pub use engine::MpegEngine;
pub use error::{EngineError, EngineResult};
pub use policy::EnginePolicy;
pub use types::{
    BitrateMode, DecodeStep, FormatReport, FrameInfo, MpegLayer, MpegVersion, SampleEncoding,
};

#[cfg(any(test, feature = "test-utils"))]
pub use script::{CallLog, ScriptedEngine, ScriptedLogs};

#[cfg(feature = "libmpg123")]
pub use mpg123::Mpg123Engine;

/// Upper bound on decoded samples per channel in one frame.
///
/// Holds for every MPEG version/layer combination as long as the engine's
/// automatic resampling stays disabled (see [`EnginePolicy::auto_resample`]);
/// output buffers may rely on it.
pub const MAX_FRAME_SAMPLES: usize = 1152;
