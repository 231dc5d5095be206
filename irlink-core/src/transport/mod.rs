//! UDP video transport with fragmented framing.
//!
//! Compressed frames routinely exceed the datagram size budget, so each
//! frame is split into bounded-size fragments and reassembled on the far
//! side. Delivery is send-and-forget: no acknowledgements, no
//! retransmission. An incomplete frame is simply superseded by the next
//! one — that is the protocol's entire loss-tolerance mechanism.
//!
//! Each session uses a socket pair: a TCP control connection for the
//! handshake (and liveness polling) plus one UDP data channel for
//! fragments. [`server::VideoServer`] owns the sending half,
//! [`client::VideoClient`] the receiving half.
//!
//! ## Wire format
//!
//! **Fragment datagram** (16-byte header + payload, header fields
//! little-endian):
//! ```text
//! frame_id:        u32  (4)
//! fragment_index:  u32  (4)
//! fragment_count:  u32  (4)
//! byte_offset:     u32  (4)
//! payload:         [u8] (variable, ≤ max_payload)
//! ```
//!
//! **Control channel**: client → server, 2-byte UDP receive port
//! (little-endian); server → client, 8-byte format record (fields
//! big-endian, see [`FrameFormat::to_wire`](crate::frame::FrameFormat::to_wire)).

pub mod client;
pub mod server;

pub use client::VideoClient;
pub use server::VideoServer;

use async_trait::async_trait;

use crate::error::IrError;
use crate::frame::{FrameFormat, VideoFrame};

// ── Constants ────────────────────────────────────────────────────

/// Default fragment payload budget: the UDP maximum minus generous room
/// for the fragment header and network-stack overhead.
pub const MAX_FRAGMENT_PAYLOAD: usize = 65_535 - 2_000;

/// Reassembly buffer capacity; bounds the largest representable frame.
pub const MAX_FRAME_SIZE: usize = 1920 * 1080 * 4;

// ── Session traits ───────────────────────────────────────────────

/// Sending half of a video session.
#[async_trait]
pub trait VideoTx {
    /// Record the format advertised during the handshake. Must be called
    /// before [`await_connection`](Self::await_connection).
    fn set_frame_format(&mut self, format: FrameFormat);

    /// Block until a client completes the control-channel handshake.
    async fn await_connection(&mut self) -> Result<(), IrError>;

    /// Non-destructively probe the control connection; `false` means the
    /// client has disconnected. Advisory only.
    async fn poll_client(&mut self) -> Result<bool, IrError>;

    /// Fragment and transmit one frame on the data channel.
    async fn send_frame(&mut self, frame: &VideoFrame) -> Result<(), IrError>;
}

/// Receiving half of a video session.
#[async_trait]
pub trait VideoRx {
    /// Perform the control-channel handshake.
    async fn connect(&mut self) -> Result<(), IrError>;

    /// The format negotiated during [`connect`](Self::connect); fails
    /// with [`IrError::NotConnected`] before the handshake completes.
    fn frame_format(&self) -> Result<FrameFormat, IrError>;

    /// Block until the next complete frame has been reassembled.
    async fn recv_frame(&mut self) -> Result<VideoFrame, IrError>;
}

// ── FragmentHeader ───────────────────────────────────────────────

/// Positional metadata prefixed to every data-channel datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentHeader {
    /// Sender's frame counter; all fragments of one frame share it.
    pub frame_id: u32,
    /// Position of this fragment within the frame, `0..fragment_count`.
    pub fragment_index: u32,
    /// Total fragments the frame was split into.
    pub fragment_count: u32,
    /// Where this fragment's payload lands in the frame buffer.
    pub byte_offset: u32,
}

impl FragmentHeader {
    /// Encoded size on the wire.
    pub const SIZE: usize = 16;

    /// Serialize to bytes (little-endian).
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.frame_id.to_le_bytes());
        buf[4..8].copy_from_slice(&self.fragment_index.to_le_bytes());
        buf[8..12].copy_from_slice(&self.fragment_count.to_le_bytes());
        buf[12..16].copy_from_slice(&self.byte_offset.to_le_bytes());
        buf
    }

    /// Deserialize from bytes.
    pub fn decode(data: &[u8]) -> Result<Self, IrError> {
        if data.len() < Self::SIZE {
            return Err(IrError::TruncatedHeader {
                expected: Self::SIZE,
                actual: data.len(),
            });
        }
        Ok(Self {
            frame_id: u32::from_le_bytes(data[0..4].try_into().unwrap()),
            fragment_index: u32::from_le_bytes(data[4..8].try_into().unwrap()),
            fragment_count: u32::from_le_bytes(data[8..12].try_into().unwrap()),
            byte_offset: u32::from_le_bytes(data[12..16].try_into().unwrap()),
        })
    }
}

// ── Fragmentation ────────────────────────────────────────────────

/// Fragments a frame was split into: `ceil(len / max_payload)`, and one
/// (empty) fragment for a zero-length frame.
pub fn fragment_count(len: usize, max_payload: usize) -> u32 {
    if len == 0 {
        1
    } else {
        len.div_ceil(max_payload) as u32
    }
}

/// Split a frame buffer into `(header, payload)` fragments.
///
/// A zero-length buffer yields exactly one fragment with an empty
/// payload, so even empty frames are announced to the receiver.
pub fn fragments(
    frame_id: u32,
    buffer: &[u8],
    max_payload: usize,
) -> impl Iterator<Item = (FragmentHeader, &[u8])> {
    let count = fragment_count(buffer.len(), max_payload);
    (0..count).map(move |index| {
        let offset = index as usize * max_payload;
        let end = (offset + max_payload).min(buffer.len());
        let header = FragmentHeader {
            frame_id,
            fragment_index: index,
            fragment_count: count,
            byte_offset: offset as u32,
        };
        (header, &buffer[offset..end])
    })
}

// ── Reassembler ──────────────────────────────────────────────────

/// Receiver-side reassembly state machine.
///
/// Tracks at most one frame at a time. A fragment carrying an unknown
/// `frame_id` abandons whatever was accumulating and starts the new
/// frame — stale fragments of the old frame are silently absorbed by the
/// same rule when they straggle in.
///
/// Completion counts fragment *arrivals* against `fragment_count`, not
/// distinct indices, so a duplicated datagram can complete a frame
/// early. Opt in to [`dedup_fragments`](Self::dedup_fragments) to count
/// each index once.
pub struct Reassembler {
    buffer: Vec<u8>,
    current_frame_id: u32,
    expected_fragments: u32,
    received_fragments: u32,
    total_bytes: usize,
    tracking: bool,
    dedup: bool,
    seen: Vec<bool>,
}

impl Reassembler {
    /// A reassembler with a fixed `capacity`-byte frame buffer.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0u8; capacity],
            current_frame_id: 0,
            expected_fragments: 0,
            received_fragments: 0,
            total_bytes: 0,
            tracking: false,
            dedup: false,
            seen: Vec::new(),
        }
    }

    /// Hardened mode: track received fragment indices and ignore
    /// duplicates instead of counting every arrival. Off by default.
    pub fn dedup_fragments(mut self, enable: bool) -> Self {
        self.dedup = enable;
        self
    }

    /// Feed one received fragment. Returns the completed frame's bytes
    /// once enough fragments have arrived, `None` otherwise.
    pub fn push(&mut self, header: &FragmentHeader, payload: &[u8]) -> Option<Vec<u8>> {
        let offset = header.byte_offset as usize;
        let in_bounds = offset
            .checked_add(payload.len())
            .is_some_and(|end| end <= self.buffer.len());
        if !in_bounds {
            // Reported, never undefined behavior: the fragment is
            // dropped and the frame left to be superseded.
            tracing::warn!(
                frame_id = header.frame_id,
                offset,
                len = payload.len(),
                capacity = self.buffer.len(),
                "fragment out of bounds; dropped"
            );
            return None;
        }

        if !self.tracking || header.frame_id != self.current_frame_id {
            if self.tracking {
                tracing::debug!(
                    abandoned = self.current_frame_id,
                    started = header.frame_id,
                    "incomplete frame superseded"
                );
            }
            self.tracking = true;
            self.current_frame_id = header.frame_id;
            self.expected_fragments = header.fragment_count;
            self.received_fragments = 1;
            self.total_bytes = 0;
            if self.dedup {
                self.seen.clear();
                self.seen.resize(header.fragment_count as usize, false);
                if let Some(slot) = self.seen.get_mut(header.fragment_index as usize) {
                    *slot = true;
                }
            }
        } else if self.dedup {
            match self.seen.get_mut(header.fragment_index as usize) {
                Some(slot) if *slot => {
                    tracing::debug!(
                        frame_id = header.frame_id,
                        fragment = header.fragment_index,
                        "duplicate fragment ignored"
                    );
                    return None;
                }
                Some(slot) => {
                    *slot = true;
                    self.received_fragments += 1;
                }
                None => {
                    tracing::debug!(
                        frame_id = header.frame_id,
                        fragment = header.fragment_index,
                        "fragment index out of range; ignored"
                    );
                    return None;
                }
            }
        } else {
            self.received_fragments += 1;
        }

        self.buffer[offset..offset + payload.len()].copy_from_slice(payload);
        self.total_bytes += payload.len();

        if self.received_fragments >= self.expected_fragments {
            self.tracking = false;
            // total_bytes counts arrivals, so duplicate deliveries can
            // push it past the buffer; the frame can never hold more
            // than the buffer does.
            let total = self.total_bytes.min(self.buffer.len());
            return Some(self.buffer[..total].to_vec());
        }
        None
    }

    /// Fragments received toward the frame currently accumulating.
    pub fn received_fragments(&self) -> u32 {
        self.received_fragments
    }

    /// Whether a frame is currently accumulating.
    pub fn in_progress(&self) -> bool {
        self.tracking
    }
}

// ── Tests ────────────────────────────────────────────────────────
