#![forbid(unsafe_code)]

//! # Aulos
//!
//! Facade crate for the streaming MPEG audio decoding adapter.
//!
//! ## Quick start
//!
//! ```ignore
//! use aulos::prelude::*;
//!
//! let mut session = DecodeSession::<Mpg123Engine>::open(EnginePolicy::default())?;
//! while let Some(block) = session.decode_packet(&mut packets)? {
//!     if !block.is_empty() {
//!         play(block);
//!     }
//! }
//! ```

// ── Re-export sub-crates ────────────────────────────────────────────────

pub mod decode {
    pub use aulos_decode::*;
}

pub mod engine {
    pub use aulos_engine::*;
}

/// Everything a host needs to drive a decode session.
pub mod prelude {
    pub use aulos_decode::{
        DecodeError, DecodeResult, DecodeSession, Packet, PacketSource, PcmBlock,
    };
    pub use aulos_engine::{EnginePolicy, MpegEngine};

    #[cfg(feature = "libmpg123")]
    pub use aulos_engine::Mpg123Engine;
}
