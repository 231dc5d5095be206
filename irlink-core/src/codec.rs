//! Lossless frame codec stages backed by zstd.
//!
//! [`ZstdEncoder`] and [`ZstdDecoder`] satisfy the codec contract
//! consumed by the transport: `encode(raw, format) -> compressed` and
//! `decode(compressed) -> raw`, both failing with a typed error on
//! malformed input. Round-tripping a frame through both stages is
//! bit-exact.
//!
//! The [`Compression::JpegLs`] and [`Compression::JpegXl`] tags name
//! encodings written by external producers; frames carrying them are
//! rejected here rather than silently misdecoded.

use crate::error::IrError;
use crate::frame::{Compression, VideoFrame};
use crate::pipeline::FrameStage;

// ── ZstdEncoder ──────────────────────────────────────────────────

/// Pipeline stage compressing raw frames for transmission or storage.
pub struct ZstdEncoder {
    /// zstd compression level (1 = fast, 19 = slow / max compression).
    level: i32,
}

impl ZstdEncoder {
    /// An encoder at the default level (1, favouring speed — the link
    /// is latency-bound, not bandwidth-bound).
    pub fn new() -> Self {
        Self { level: 1 }
    }

    /// Override the compression level.
    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }
}

impl Default for ZstdEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStage for ZstdEncoder {
    fn process(&mut self, frame: VideoFrame) -> Result<VideoFrame, IrError> {
        if frame.compression != Compression::None {
            return Err(IrError::UnexpectedCompression {
                expected: Compression::None,
                actual: frame.compression,
            });
        }

        let compressed = zstd::encode_all(frame.buffer.as_slice(), self.level)
            .map_err(|e| IrError::Codec(format!("zstd encode failed: {e}")))?;

        Ok(VideoFrame {
            buffer: compressed,
            format: frame.format,
            compression: Compression::Zstd,
        })
    }
}

// ── ZstdDecoder ──────────────────────────────────────────────────

/// Pipeline stage restoring raw frames from their compressed form.
#[derive(Debug)]
pub struct ZstdDecoder;

impl ZstdDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ZstdDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStage for ZstdDecoder {
    fn process(&mut self, frame: VideoFrame) -> Result<VideoFrame, IrError> {
        if frame.compression != Compression::Zstd {
            return Err(IrError::UnexpectedCompression {
                expected: Compression::Zstd,
                actual: frame.compression,
            });
        }

        let raw = zstd::decode_all(frame.buffer.as_slice())
            .map_err(|e| IrError::Codec(format!("zstd decode failed: {e}")))?;

        Ok(VideoFrame {
            buffer: raw,
            format: frame.format,
            compression: Compression::None,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameFormat;

    fn test_format() -> FrameFormat {
        FrameFormat {
            width: 64,
            height: 48,
            num_components: 1,
            bits_per_pixel: 16,
        }
    }

    #[test]
    fn encode_decode_is_lossless() {
        let raw: Vec<u8> = (0..test_format().frame_len())
            .map(|i| (i % 251) as u8)
            .collect();
        let frame = VideoFrame::raw(raw.clone(), test_format());

        let encoded = ZstdEncoder::new().process(frame).unwrap();
        assert_eq!(encoded.compression, Compression::Zstd);

        let decoded = ZstdDecoder::new().process(encoded).unwrap();
        assert_eq!(decoded.compression, Compression::None);
        assert_eq!(decoded.buffer, raw);
    }

    #[test]
    fn repetitive_data_compresses() {
        let frame = VideoFrame::raw(vec![0xAB; 10_000], test_format());
        let encoded = ZstdEncoder::new().process(frame).unwrap();
        assert!(encoded.buffer.len() < 10_000);
    }

    #[test]
    fn encoder_rejects_already_compressed_input() {
        let mut frame = VideoFrame::raw(vec![1, 2, 3], test_format());
        frame.compression = Compression::Zstd;

        let err = ZstdEncoder::new().process(frame).unwrap_err();
        assert!(matches!(err, IrError::UnexpectedCompression { .. }));
    }

    #[test]
    fn decoder_rejects_foreign_tags() {
        for tag in [Compression::None, Compression::JpegLs, Compression::JpegXl] {
            let mut frame = VideoFrame::raw(vec![1, 2, 3], test_format());
            frame.compression = tag;

            let err = ZstdDecoder::new().process(frame).unwrap_err();
            assert!(matches!(err, IrError::UnexpectedCompression { .. }));
        }
    }

    #[test]
    fn decoder_rejects_garbage_payload() {
        let mut frame = VideoFrame::raw(vec![0xDE, 0xAD, 0xBE, 0xEF], test_format());
        frame.compression = Compression::Zstd;

        let err = ZstdDecoder::new().process(frame).unwrap_err();
        assert!(matches!(err, IrError::Codec(_)));
    }

    #[test]
    fn empty_buffer_roundtrip() {
        let frame = VideoFrame::raw(Vec::new(), test_format());
        let encoded = ZstdEncoder::new().process(frame).unwrap();
        let decoded = ZstdDecoder::new().process(encoded).unwrap();
        assert!(decoded.buffer.is_empty());
    }
}
