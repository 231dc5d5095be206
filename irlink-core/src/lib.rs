//! # irlink-core
//!
//! Core library for the irlink thermal-video link: a low-latency,
//! loss-tolerant protocol streaming compressed single-channel 16-bit
//! imagery over IP.
//!
//! ## Architecture
//!
//! ```text
//! SENDER (irlink-stream)                      VIEWER (irlink-view)
//! ┌─────────────────────────┐                ┌──────────────────────────┐
//! │ VideoSource             │                │ VideoClient::recv_frame  │
//! │   ↓                     │    TCP / UDP   │   ↓                      │
//! │ FramePipeline (encode)  │ ──────────►    │ FramePipeline            │
//! │   ↓                     │                │  (decode, stretch, tap)  │
//! │ VideoServer::send_frame │                │   ↓                      │
//! └─────────────────────────┘                │ VideoDisplay / recorder  │
//!                                            └──────────────────────────┘
//! ```
//!
//! One TCP control connection per session negotiates the data-channel
//! endpoint and the frame format; frames then flow as fragmented UDP
//! datagrams, fire-and-forget.
//!
//! ## Modules
//!
//! | Module      | Purpose                                             |
//! |-------------|-----------------------------------------------------|
//! | `frame`     | Frame buffer + format + compression tag data model  |
//! | `pipeline`  | Ordered chain of frame transform stages             |
//! | `codec`     | zstd encode/decode pipeline stages                  |
//! | `imgproc`   | Histogram stretch for 16-bit thermal frames         |
//! | `storage`   | Numbered on-disk sequence writer / reader           |
//! | `source`    | Recording replay and test-pattern frame sources     |
//! | `display`   | Display seam + headless stats consumer              |
//! | `transport` | Handshake, fragmentation, reassembly (the protocol) |
//! | `error`     | `IrError` — typed, `thiserror`-based error hierarchy|

pub mod codec;
pub mod display;
pub mod error;
pub mod frame;
pub mod imgproc;
pub mod pipeline;
pub mod source;
pub mod storage;
pub mod transport;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{ZstdDecoder, ZstdEncoder};
pub use display::{StatsDisplay, VideoDisplay};
pub use error::IrError;
pub use frame::{Compression, FrameFormat, VideoFrame};
pub use imgproc::HistogramStretch;
pub use pipeline::{FramePipeline, FrameStage};
pub use source::{FrameHandler, RecordingSource, TestPatternSource, VideoSource};
pub use storage::{SequenceReader, SequenceWriter};
pub use transport::{
    FragmentHeader, MAX_FRAGMENT_PAYLOAD, MAX_FRAME_SIZE, Reassembler, VideoClient, VideoRx,
    VideoServer, VideoTx,
};
