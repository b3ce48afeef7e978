//! Compressed input packets and where they come from.

use std::{collections::VecDeque, time::Duration};

use bytes::Bytes;

/// One compressed input packet as delivered by the host's demuxer.
///
/// Packet boundaries carry no meaning to the decoder — MPEG frames need not
/// align with them. A packet may hold a fraction of a frame or several
/// frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Raw compressed bytes.
    pub data: Bytes,
    /// Presentation timestamp of the first sample encoded by this packet,
    /// when the container provides one.
    pub pts: Option<Duration>,
}

impl Packet {
    /// Packet with a presentation timestamp.
    pub fn timestamped(data: impl Into<Bytes>, pts: Duration) -> Self {
        Self {
            data: data.into(),
            pts: Some(pts),
        }
    }

    /// Packet without timing information; its samples continue the previous
    /// timestamp.
    pub fn untimed(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pts: None,
        }
    }
}

/// Supplier of compressed packets, driven by the decode session.
///
/// Ownership of a returned packet transfers to the caller. `None` means the
/// source is exhausted — a normal end-of-stream signal, not an error.
pub trait PacketSource {
    fn pull_next_packet(&mut self) -> Option<Packet>;
}

impl PacketSource for VecDeque<Packet> {
    fn pull_next_packet(&mut self) -> Option<Packet> {
        self.pop_front()
    }
}
