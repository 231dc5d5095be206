//! Display seam for decoded frames.
//!
//! Rendering proper (GPU windowing) is an external collaborator; the
//! trait here is the boundary the receive loop drives. [`StatsDisplay`]
//! is the shipped headless implementation: it logs frame geometry and
//! sample statistics instead of drawing pixels, which is what a
//! recorder deployment wants anyway.

use tracing::info;

use crate::error::IrError;
use crate::frame::{Compression, VideoFrame};

// ── VideoDisplay ─────────────────────────────────────────────────

/// Consumer of decoded frames, polled independently of the transport.
pub trait VideoDisplay {
    /// Prepare the display for frames.
    fn open(&mut self) -> Result<(), IrError>;

    /// Hand the latest decoded frame to the display.
    fn set_frame(&mut self, frame: &VideoFrame);

    /// Advance the display; `false` signals the consumer loop to stop.
    fn update(&mut self) -> bool;
}

// ── StatsDisplay ─────────────────────────────────────────────────

/// Headless display logging per-frame statistics.
pub struct StatsDisplay {
    frames_seen: u64,
    frame_limit: Option<u64>,
    pending: Option<FrameStats>,
}

struct FrameStats {
    width: u16,
    height: u16,
    bytes: usize,
    /// Sample min/max, present for raw single-channel 16-bit frames.
    range: Option<(u16, u16)>,
}

impl StatsDisplay {
    pub fn new() -> Self {
        Self {
            frames_seen: 0,
            frame_limit: None,
            pending: None,
        }
    }

    /// Stop the consumer loop after `limit` frames (useful for bounded
    /// capture runs; unlimited by default).
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// Frames consumed so far.
    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }
}

impl Default for StatsDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoDisplay for StatsDisplay {
    fn open(&mut self) -> Result<(), IrError> {
        Ok(())
    }

    fn set_frame(&mut self, frame: &VideoFrame) {
        let range = if frame.compression == Compression::None
            && frame.format.bits_per_pixel == 16
            && frame.format.num_components == 1
        {
            frame
                .buffer
                .chunks_exact(2)
                .map(|c| u16::from_ne_bytes([c[0], c[1]]))
                .fold(None, |acc: Option<(u16, u16)>, v| match acc {
                    None => Some((v, v)),
                    Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                })
        } else {
            None
        };

        self.pending = Some(FrameStats {
            width: frame.format.width,
            height: frame.format.height,
            bytes: frame.buffer.len(),
            range,
        });
    }

    fn update(&mut self) -> bool {
        if let Some(stats) = self.pending.take() {
            self.frames_seen += 1;
            match stats.range {
                Some((vmin, vmax)) => info!(
                    frame = self.frames_seen,
                    width = stats.width,
                    height = stats.height,
                    bytes = stats.bytes,
                    vmin,
                    vmax,
                    "frame"
                ),
                None => info!(
                    frame = self.frames_seen,
                    width = stats.width,
                    height = stats.height,
                    bytes = stats.bytes,
                    "frame"
                ),
            }
        }

        match self.frame_limit {
            Some(limit) => self.frames_seen < limit,
            None => true,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
