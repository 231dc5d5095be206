//! Video sources feeding the send path.
//!
//! A source produces raw frames at its own pace and hands them to a
//! registered callback from a background thread; the transport never
//! sees the source directly. The camera driver itself is an external
//! collaborator — the sources here replay recorded sequences and
//! synthesize test imagery so the sender runs on any machine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::IrError;
use crate::frame::{FrameFormat, VideoFrame};
use crate::storage::SequenceReader;

/// Callback invoked once per produced frame.
pub type FrameHandler = Box<dyn FnMut(VideoFrame) + Send>;

// ── VideoSource ──────────────────────────────────────────────────

/// A producer of raw video frames.
pub trait VideoSource {
    /// Format of the frames this source will produce.
    fn format(&mut self) -> Result<FrameFormat, IrError>;

    /// Register the callback receiving produced frames. Must be called
    /// before [`start`](Self::start).
    fn on_frame(&mut self, handler: FrameHandler);

    /// Begin producing frames on a background thread.
    fn start(&mut self) -> Result<(), IrError>;
}

// ── Pacing helper ────────────────────────────────────────────────

/// Sleep until the next frame deadline and advance it.
fn pace(next_deadline: &mut Instant, interval: Duration) {
    *next_deadline += interval;
    let now = Instant::now();
    if *next_deadline > now {
        std::thread::sleep(*next_deadline - now);
    }
}

// ── RecordingSource ──────────────────────────────────────────────

/// Replays a recorded sequence directory at a fixed frame rate.
///
/// Production stops at the end of the sequence.
pub struct RecordingSource {
    reader: Option<SequenceReader>,
    fps: u32,
    format: Option<FrameFormat>,
    handler: Option<FrameHandler>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl RecordingSource {
    /// Open a sequence directory for replay at `fps` frames per second.
    pub fn new(dir: impl Into<std::path::PathBuf>, fps: u32) -> Result<Self, IrError> {
        if fps == 0 {
            return Err(IrError::Source("fps must be at least 1"));
        }
        let reader = SequenceReader::new(dir)?;
        if reader.is_empty() {
            return Err(IrError::Source("sequence is empty"));
        }
        Ok(Self {
            reader: Some(reader),
            fps,
            format: None,
            handler: None,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        })
    }

    /// Signal the replay thread to stop and wait for it.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl VideoSource for RecordingSource {
    /// Read the first frame to learn the format, then rewind.
    fn format(&mut self) -> Result<FrameFormat, IrError> {
        if let Some(format) = self.format {
            return Ok(format);
        }
        let reader = self
            .reader
            .as_mut()
            .ok_or(IrError::Source("source already started"))?;
        let frame = reader
            .read_frame()?
            .ok_or(IrError::Source("sequence is empty"))?;
        reader.rewind();
        self.format = Some(frame.format);
        Ok(frame.format)
    }

    fn on_frame(&mut self, handler: FrameHandler) {
        self.handler = Some(handler);
    }

    fn start(&mut self) -> Result<(), IrError> {
        if self.reader.is_none() {
            return Err(IrError::Source("source already started"));
        }
        let mut handler = self
            .handler
            .take()
            .ok_or(IrError::Source("no frame handler registered"))?;
        let mut reader = self
            .reader
            .take()
            .ok_or(IrError::Source("source already started"))?;

        let interval = Duration::from_micros(1_000_000 / self.fps as u64);
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::SeqCst);

        self.thread = Some(std::thread::spawn(move || {
            let mut next_deadline = Instant::now();
            while running.load(Ordering::SeqCst) {
                match reader.read_frame() {
                    Ok(Some(frame)) => handler(frame),
                    Ok(None) => {
                        debug!("sequence exhausted");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "sequence replay aborted");
                        break;
                    }
                }
                pace(&mut next_deadline, interval);
            }
            running.store(false, Ordering::SeqCst);
        }));
        Ok(())
    }
}

impl Drop for RecordingSource {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── TestPatternSource ────────────────────────────────────────────

/// Synthesizes a moving diagonal gradient in 16-bit single-channel
/// frames — a stand-in for the thermal camera.
pub struct TestPatternSource {
    format: FrameFormat,
    fps: u32,
    handler: Option<FrameHandler>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl TestPatternSource {
    /// A pattern source producing `width`×`height` frames at `fps`.
    pub fn new(width: u16, height: u16, fps: u32) -> Self {
        Self {
            format: FrameFormat {
                width,
                height,
                num_components: 1,
                bits_per_pixel: 16,
            },
            fps: fps.max(1),
            handler: None,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    /// Signal the generator thread to stop and wait for it.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    /// One synthesized frame at animation step `tick`.
    fn render(format: FrameFormat, tick: u32) -> VideoFrame {
        let (w, h) = (format.width as u32, format.height as u32);
        let mut buffer = Vec::with_capacity(format.frame_len());
        for y in 0..h {
            for x in 0..w {
                let ramp = ((x + y) as u64 * 65_535 / (w + h).max(1) as u64) as u32;
                let v = ramp.wrapping_add(tick.wrapping_mul(1024)) as u16;
                buffer.extend_from_slice(&v.to_ne_bytes());
            }
        }
        VideoFrame::raw(buffer, format)
    }
}

impl VideoSource for TestPatternSource {
    fn format(&mut self) -> Result<FrameFormat, IrError> {
        Ok(self.format)
    }

    fn on_frame(&mut self, handler: FrameHandler) {
        self.handler = Some(handler);
    }

    fn start(&mut self) -> Result<(), IrError> {
        if self.thread.is_some() {
            return Err(IrError::Source("source already started"));
        }
        let mut handler = self
            .handler
            .take()
            .ok_or(IrError::Source("no frame handler registered"))?;

        let format = self.format;
        let interval = Duration::from_micros(1_000_000 / self.fps as u64);
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::SeqCst);

        self.thread = Some(std::thread::spawn(move || {
            let mut next_deadline = Instant::now();
            let mut tick = 0u32;
            while running.load(Ordering::SeqCst) {
                handler(Self::render(format, tick));
                tick = tick.wrapping_add(1);
                pace(&mut next_deadline, interval);
            }
        }));
        Ok(())
    }
}

impl Drop for TestPatternSource {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SequenceWriter;
    use std::sync::mpsc;

    #[test]
    fn pattern_source_produces_frames() {
        let mut source = TestPatternSource::new(8, 4, 200);
        let format = source.format().unwrap();
        assert_eq!(format.bits_per_pixel, 16);

        let (tx, rx) = mpsc::channel();
        source.on_frame(Box::new(move |frame| {
            let _ = tx.send(frame);
        }));
        source.start().unwrap();

        let frame = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        source.stop();

        assert_eq!(frame.buffer.len(), format.frame_len());
        assert_eq!(frame.format, format);
    }

    #[test]
    fn pattern_frames_animate() {
        let format = TestPatternSource::new(8, 4, 1).format;
        let a = TestPatternSource::render(format, 0);
        let b = TestPatternSource::render(format, 1);
        assert_ne!(a.buffer, b.buffer);
    }

    #[test]
    fn start_without_handler_fails() {
        let mut source = TestPatternSource::new(8, 4, 25);
        assert!(matches!(source.start(), Err(IrError::Source(_))));
    }

    #[test]
    fn recording_source_replays_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let format = FrameFormat {
            width: 4,
            height: 2,
            num_components: 1,
            bits_per_pixel: 16,
        };
        let mut writer = SequenceWriter::new(dir.path()).unwrap();
        for n in 0..3u8 {
            writer
                .write(&VideoFrame::raw(vec![n; format.frame_len()], format))
                .unwrap();
        }

        let mut source = RecordingSource::new(dir.path(), 200).unwrap();
        assert_eq!(source.format().unwrap(), format);

        let (tx, rx) = mpsc::channel();
        source.on_frame(Box::new(move |frame| {
            let _ = tx.send(frame);
        }));
        source.start().unwrap();

        for n in 0..3u8 {
            let frame = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            assert_eq!(frame.buffer[0], n);
        }
        // Sequence exhausted: the channel closes with the thread.
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_err());
    }

    #[test]
    fn empty_sequence_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            RecordingSource::new(dir.path(), 25),
            Err(IrError::Source(_))
        ));
    }
}
