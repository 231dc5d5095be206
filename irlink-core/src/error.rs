//! Domain-specific error types for the irlink video protocol.
//!
//! All fallible operations return `Result<T, IrError>`.
//! No panics on invalid input — every error is typed and recoverable.

use thiserror::Error;

use crate::frame::Compression;

/// The canonical error type for the irlink video protocol.
#[derive(Debug, Error)]
pub enum IrError {
    // ── Session Errors ───────────────────────────────────────────
    /// The control-channel handshake failed partway.
    #[error("handshake failed: {0}")]
    Handshake(&'static str),

    /// The frame format was queried before the handshake finished.
    #[error("client not connected")]
    NotConnected,

    /// The server was asked to hand out a format it never received.
    #[error("no frame format set")]
    NoFrameFormat,

    // ── Transport Errors ─────────────────────────────────────────
    /// A datagram was too short to contain a fragment header.
    #[error("fragment header too short: {actual} < {expected} bytes")]
    TruncatedHeader { expected: usize, actual: usize },

    /// A fragment addressed bytes beyond the reassembly buffer.
    #[error("fragment out of bounds: offset {offset} + {len} bytes exceeds capacity {capacity}")]
    FragmentOutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    /// An outbound frame exceeds what the reassembly buffer can hold.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    // ── Pipeline Errors ──────────────────────────────────────────
    /// A stage received a frame whose compression tag it cannot handle.
    #[error("unexpected compression tag: expected {expected}, got {actual}")]
    UnexpectedCompression {
        expected: Compression,
        actual: Compression,
    },

    /// The codec backend rejected its input.
    #[error("codec error: {0}")]
    Codec(String),

    /// A frame's buffer or format fields are inconsistent.
    #[error("malformed frame: {0}")]
    MalformedFrame(&'static str),

    // ── Collaborator Errors ──────────────────────────────────────
    /// A video source could not produce frames.
    #[error("video source error: {0}")]
    Source(&'static str),

    // ── Storage Errors ───────────────────────────────────────────
    /// A stored sequence entry could not be parsed.
    #[error("invalid sequence entry {path}: {reason}")]
    InvalidSequenceEntry { path: String, reason: &'static str },

    // ── I/O ──────────────────────────────────────────────────────
    /// The socket or filesystem layer reported an error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = IrError::FragmentOutOfBounds {
            offset: 8_000_000,
            len: 63_535,
            capacity: 1_000_000,
        };
        assert!(e.to_string().contains("8000000"));
        assert!(e.to_string().contains("1000000"));

        let e = IrError::NotConnected;
        assert!(e.to_string().contains("not connected"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: IrError = io_err.into();
        assert!(matches!(e, IrError::Io(_)));
    }
}
