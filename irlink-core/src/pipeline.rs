//! Ordered chain of frame transforms.
//!
//! A [`FramePipeline`] owns its stages and threads one frame through each
//! in turn: the previous stage's output becomes the next stage's input.
//! The same abstraction serves both directions of the link — encode
//! before transmit on the sender, decode / enhance / persist after
//! reassembly on the receiver.
//!
//! The pipeline imposes no concurrency: stages run sequentially on the
//! caller's thread, and each invocation owns exactly one in-flight frame.

use crate::error::IrError;
use crate::frame::VideoFrame;

// ── FrameStage ───────────────────────────────────────────────────

/// One transform in the frame-processing chain.
///
/// A stage may be stateful (a codec context, a monotonically increasing
/// output file index) but must be deterministic given its accumulated
/// state and input frame. A stage that cannot process a frame returns an
/// error; the pipeline does not catch or retry.
pub trait FrameStage: Send {
    fn process(&mut self, frame: VideoFrame) -> Result<VideoFrame, IrError>;
}

/// Closures can serve as lightweight stages (taps, test probes).
impl<F> FrameStage for F
where
    F: FnMut(VideoFrame) -> Result<VideoFrame, IrError> + Send,
{
    fn process(&mut self, frame: VideoFrame) -> Result<VideoFrame, IrError> {
        self(frame)
    }
}

// ── FramePipeline ────────────────────────────────────────────────

/// Ordered list of [`FrameStage`]s applied in sequence.
#[derive(Default)]
pub struct FramePipeline {
    stages: Vec<Box<dyn FrameStage>>,
}

impl FramePipeline {
    /// An empty pipeline (passes frames through unchanged).
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage to the end of the chain.
    pub fn add_stage(&mut self, stage: impl FrameStage + 'static) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Number of stages in the chain.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run a frame through every stage in order.
    ///
    /// An error from any stage aborts that frame's processing and is
    /// surfaced to the caller; subsequent frames are unaffected.
    pub fn run(&mut self, mut frame: VideoFrame) -> Result<VideoFrame, IrError> {
        for stage in &mut self.stages {
            frame = stage.process(frame)?;
        }
        Ok(frame)
    }
}

// ── Tests ────────────────────────────────────────────────────────
