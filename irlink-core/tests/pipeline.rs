//! Integration tests — pipeline composition across codec, storage, and
//! enhancement stages.

use irlink_core::{
    Compression, FrameFormat, FramePipeline, FrameStage, HistogramStretch, IrError,
    SequenceReader, SequenceWriter, VideoFrame, ZstdDecoder, ZstdEncoder,
};

fn thermal_format() -> FrameFormat {
    FrameFormat {
        width: 64,
        height: 48,
        num_components: 1,
        bits_per_pixel: 16,
    }
}

fn patterned_frame(format: FrameFormat) -> VideoFrame {
    let buffer = (0..format.frame_len()).map(|i| (i % 253) as u8).collect();
    VideoFrame::raw(buffer, format)
}

#[test]
fn encode_tap_decode_is_bit_identical() {
    // An encode → tap → decode chain must return the input unchanged:
    // ordering and pass-through semantics in one check.
    let dir = tempfile::tempdir().unwrap();
    let format = thermal_format();
    let original = patterned_frame(format);

    let mut pipeline = FramePipeline::new();
    pipeline.add_stage(ZstdEncoder::new());
    // The tap sees compressed frames, so SequenceWriter (which expects
    // raw input) does not fit here; a closure tap captures the
    // intermediate bytes instead.
    let tap_dir = dir.path().to_path_buf();
    pipeline.add_stage(move |frame: VideoFrame| -> Result<VideoFrame, IrError> {
        std::fs::write(tap_dir.join("tapped"), &frame.buffer)?;
        Ok(frame)
    });
    pipeline.add_stage(ZstdDecoder::new());

    let out = pipeline.run(original.clone()).unwrap();
    assert_eq!(out.buffer, original.buffer);
    assert_eq!(out.format, original.format);
    assert_eq!(out.compression, Compression::None);

    // The tap really ran in the middle: it saw the compressed bytes.
    let tapped = std::fs::read(dir.path().join("tapped")).unwrap();
    assert_ne!(tapped, original.buffer);
}

#[test]
fn decode_record_stretch_receive_chain() {
    // The viewer-side chain: decode, persist the raw frame, enhance.
    let dir = tempfile::tempdir().unwrap();
    let format = thermal_format();

    // Samples concentrated in a narrow band so the stretch has work.
    let mut samples = vec![2000u16; 2500];
    samples.extend(std::iter::repeat_n(9000u16, format.frame_len() / 2 - 2500));
    let buffer: Vec<u8> = samples.iter().flat_map(|v| v.to_ne_bytes()).collect();
    let raw = VideoFrame::raw(buffer, format);

    // What arrives off the wire is the encoded form.
    let mut encoder = ZstdEncoder::new();
    let wire = encoder.process(raw.clone()).unwrap();

    let mut pipeline = FramePipeline::new();
    pipeline.add_stage(ZstdDecoder::new());
    pipeline.add_stage(SequenceWriter::new(dir.path()).unwrap());
    pipeline.add_stage(HistogramStretch::new(256));

    let enhanced = pipeline.run(wire).unwrap();
    assert_eq!(enhanced.compression, Compression::None);
    // Stretch happened after the tap: the stored frame is unstretched.
    let mut reader = SequenceReader::new(dir.path()).unwrap();
    let stored = reader.read_frame().unwrap().unwrap();
    assert_eq!(stored.buffer, raw.buffer);
    assert_ne!(enhanced.buffer, raw.buffer);
}

#[test]
fn wrong_tag_surfaces_to_pipeline_caller() {
    let mut pipeline = FramePipeline::new();
    pipeline.add_stage(ZstdDecoder::new());

    // A raw frame reaching the decoder is a tag mismatch.
    let err = pipeline.run(patterned_frame(thermal_format())).unwrap_err();
    assert!(matches!(
        err,
        irlink_core::IrError::UnexpectedCompression { .. }
    ));
}
