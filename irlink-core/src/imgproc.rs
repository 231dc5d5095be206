//! Contrast enhancement for 16-bit thermal imagery.
//!
//! Radiometric sensors use a narrow slice of the 16-bit range, so raw
//! frames render almost black. [`HistogramStretch`] finds the populated
//! region of the histogram and linearly remaps it to the full range,
//! in place.

use crate::error::IrError;
use crate::frame::{Compression, VideoFrame};
use crate::pipeline::FrameStage;

/// Bins with more samples than this start the stretch window.
const LO_THRESH: u32 = 1000;
/// Bins with more samples than this extend the stretch window.
const HI_THRESH: u32 = 200;

// ── HistogramStretch ─────────────────────────────────────────────

/// Pipeline stage stretching the populated histogram region of a raw
/// single-channel 16-bit frame to the full sample range.
///
/// Mutates the frame in place and returns it; frames whose histogram has
/// no sufficiently populated bin pass through unchanged.
pub struct HistogramStretch {
    num_bins: usize,
    bin_size: usize,
}

impl HistogramStretch {
    /// A stretch stage bucketing samples into `num_bins` bins.
    ///
    /// `num_bins` must be a power of two in `2..=65536` so bins tile the
    /// sample range exactly.
    pub fn new(num_bins: usize) -> Self {
        assert!(
            num_bins.is_power_of_two() && (2..=65536).contains(&num_bins),
            "num_bins must be a power of two in 2..=65536"
        );
        Self {
            num_bins,
            bin_size: 65536 / num_bins,
        }
    }
}

impl Default for HistogramStretch {
    fn default() -> Self {
        Self::new(256)
    }
}

impl FrameStage for HistogramStretch {
    fn process(&mut self, mut frame: VideoFrame) -> Result<VideoFrame, IrError> {
        if frame.compression != Compression::None {
            return Err(IrError::UnexpectedCompression {
                expected: Compression::None,
                actual: frame.compression,
            });
        }
        if frame.format.bits_per_pixel != 16 || frame.format.num_components != 1 {
            return Err(IrError::MalformedFrame(
                "histogram stretch requires single-channel 16-bit samples",
            ));
        }

        let sample_count = frame.format.width as usize * frame.format.height as usize;
        if frame.buffer.len() < sample_count * 2 {
            return Err(IrError::MalformedFrame("buffer shorter than format implies"));
        }

        let samples = &mut frame.buffer[..sample_count * 2];

        // Histogram pass.
        let mut hist = vec![0u32; self.num_bins];
        for chunk in samples.chunks_exact(2) {
            let v = u16::from_ne_bytes([chunk[0], chunk[1]]);
            hist[v as usize / self.bin_size] += 1;
        }

        // Window: first bin above LO_THRESH, extended by any later bin
        // above HI_THRESH.
        let mut lo_bin = None;
        let mut hi_bin = 0usize;
        for (i, &count) in hist.iter().enumerate() {
            if lo_bin.is_none() {
                if count > LO_THRESH {
                    lo_bin = Some(i);
                    hi_bin = i;
                }
            } else if count > HI_THRESH {
                hi_bin = i;
            }
        }

        let Some(lo_bin) = lo_bin else {
            tracing::debug!("histogram has no populated bin; frame unchanged");
            return Ok(frame);
        };

        let vmin = (lo_bin * self.bin_size) as u16;
        let vmax = ((hi_bin + 1) * self.bin_size - 1) as u16;
        let vspan = (vmax - vmin) as u32;
        tracing::debug!(lo_bin, hi_bin, vmin, vmax, "histogram stretch window");

        if vspan == 0 {
            return Ok(frame);
        }

        // Remap pass.
        for chunk in samples.chunks_exact_mut(2) {
            let v = u16::from_ne_bytes([chunk[0], chunk[1]]).clamp(vmin, vmax);
            let stretched = ((v - vmin) as u32 * 65535 / vspan) as u16;
            chunk.copy_from_slice(&stretched.to_ne_bytes());
        }

        Ok(frame)
    }
}

// ── Tests ────────────────────────────────────────────────────────
