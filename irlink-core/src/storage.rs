//! On-disk video sequence storage.
//!
//! A sequence is a directory of numbered entries (`0`, `1`, `2`, …), one
//! frame each. Every entry starts with the 8-byte format record (the same
//! encoding the handshake uses) followed by the zstd-compressed frame
//! payload, so a sequence is self-describing and replayable without a
//! live session.

use std::fs;
use std::path::PathBuf;

use crate::codec::{ZstdDecoder, ZstdEncoder};
use crate::error::IrError;
use crate::frame::{Compression, FrameFormat, VideoFrame};
use crate::pipeline::FrameStage;

// ── SequenceWriter ───────────────────────────────────────────────

/// Persists raw frames to a sequence directory.
///
/// Doubles as a pass-through pipeline stage: the frame is written and
/// then returned unchanged, so a writer can tap any point of a pipeline.
pub struct SequenceWriter {
    dir: PathBuf,
    write_idx: usize,
    encoder: ZstdEncoder,
}

impl SequenceWriter {
    /// Create the sequence directory (existing directories are reused)
    /// and start numbering entries from 0.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, IrError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_idx: 0,
            encoder: ZstdEncoder::new(),
        })
    }

    /// Compress and persist one raw frame as the next numbered entry.
    pub fn write(&mut self, frame: &VideoFrame) -> Result<(), IrError> {
        let encoded = self.encoder.process(frame.clone())?;

        let mut data = Vec::with_capacity(FrameFormat::WIRE_SIZE + encoded.buffer.len());
        data.extend_from_slice(&encoded.format.to_wire());
        data.extend_from_slice(&encoded.buffer);

        let path = self.dir.join(self.write_idx.to_string());
        fs::write(&path, data)?;
        self.write_idx += 1;
        Ok(())
    }

    /// Number of frames written so far.
    pub fn frames_written(&self) -> usize {
        self.write_idx
    }
}

impl FrameStage for SequenceWriter {
    fn process(&mut self, frame: VideoFrame) -> Result<VideoFrame, IrError> {
        self.write(&frame)?;
        Ok(frame)
    }
}

// ── SequenceReader ───────────────────────────────────────────────

/// Replays a sequence directory, yielding decoded raw frames in
/// numeric entry order.
#[derive(Debug)]
pub struct SequenceReader {
    files: Vec<PathBuf>,
    read_idx: usize,
    decoder: ZstdDecoder,
}

impl SequenceReader {
    /// Enumerate a sequence directory. Entries whose names are not plain
    /// integers are ignored.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, IrError> {
        let dir = dir.into();
        let mut indexed: Vec<(u64, PathBuf)> = fs::read_dir(&dir)?
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                let idx: u64 = path.file_name()?.to_str()?.parse().ok()?;
                Some((idx, path))
            })
            .collect();
        indexed.sort_by_key(|(idx, _)| *idx);

        Ok(Self {
            files: indexed.into_iter().map(|(_, path)| path).collect(),
            read_idx: 0,
            decoder: ZstdDecoder::new(),
        })
    }

    /// Read and decode the next frame; `None` once the sequence is
    /// exhausted.
    pub fn read_frame(&mut self) -> Result<Option<VideoFrame>, IrError> {
        let Some(path) = self.files.get(self.read_idx) else {
            return Ok(None);
        };
        self.read_idx += 1;

        let data = fs::read(path)?;
        if data.len() < FrameFormat::WIRE_SIZE {
            return Err(IrError::InvalidSequenceEntry {
                path: path.display().to_string(),
                reason: "shorter than the format record",
            });
        }

        let format = FrameFormat::from_wire(&data[..FrameFormat::WIRE_SIZE])?;
        let frame = VideoFrame {
            buffer: data[FrameFormat::WIRE_SIZE..].to_vec(),
            format,
            compression: Compression::Zstd,
        };
        Ok(Some(self.decoder.process(frame)?))
    }

    /// Restart replay from the first entry.
    pub fn rewind(&mut self) {
        self.read_idx = 0;
    }

    /// Number of entries in the sequence.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the sequence has no entries.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn test_format() -> FrameFormat {
        FrameFormat {
            width: 8,
            height: 4,
            num_components: 1,
            bits_per_pixel: 16,
        }
    }

    fn numbered_frame(n: u8) -> VideoFrame {
        VideoFrame::raw(vec![n; test_format().frame_len()], test_format())
    }

    #[test]
    fn write_read_roundtrip_in_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SequenceWriter::new(dir.path()).unwrap();

        // 12 entries so "10" and "11" would sort before "2" if the
        // reader ordered entries lexicographically.
        for n in 0..12u8 {
            writer.write(&numbered_frame(n)).unwrap();
        }
        assert_eq!(writer.frames_written(), 12);

        let mut reader = SequenceReader::new(dir.path()).unwrap();
        assert_eq!(reader.len(), 12);
        for n in 0..12u8 {
            let frame = reader.read_frame().unwrap().expect("entry missing");
            assert_eq!(frame.buffer, numbered_frame(n).buffer, "entry {n}");
            assert_eq!(frame.format, test_format());
            assert_eq!(frame.compression, Compression::None);
        }
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn rewind_restarts_replay() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SequenceWriter::new(dir.path()).unwrap();
        writer.write(&numbered_frame(7)).unwrap();

        let mut reader = SequenceReader::new(dir.path()).unwrap();
        let first = reader.read_frame().unwrap().unwrap();
        assert!(reader.read_frame().unwrap().is_none());

        reader.rewind();
        let again = reader.read_frame().unwrap().unwrap();
        assert_eq!(first.buffer, again.buffer);
    }

    #[test]
    fn writer_is_a_pass_through_stage() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SequenceWriter::new(dir.path()).unwrap();

        let frame = numbered_frame(3);
        let out = writer.process(frame.clone()).unwrap();
        assert_eq!(out.buffer, frame.buffer);
        assert_eq!(out.compression, Compression::None);
        assert_eq!(writer.frames_written(), 1);
    }

    #[test]
    fn truncated_entry_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("0"), [0u8; 3]).unwrap();

        let mut reader = SequenceReader::new(dir.path()).unwrap();
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, IrError::InvalidSequenceEntry { .. }));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let err = SequenceReader::new("/nonexistent/sequence/dir").unwrap_err();
        assert!(matches!(err, IrError::Io(_)));
    }

    #[test]
    fn non_numeric_entries_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SequenceWriter::new(dir.path()).unwrap();
        writer.write(&numbered_frame(1)).unwrap();
        fs::write(dir.path().join("README"), b"not a frame").unwrap();

        let reader = SequenceReader::new(dir.path()).unwrap();
        assert_eq!(reader.len(), 1);
    }
}
