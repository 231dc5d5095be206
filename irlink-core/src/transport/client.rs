//! Receiver side of a video session.
//!
//! The client connects to the server's control port, binds its UDP data
//! socket on `control_port + 1`, declares that port over the control
//! connection, learns the session's frame format in return, and then
//! reassembles fragment datagrams into complete frames.

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tracing::{debug, info};

use crate::error::IrError;
use crate::frame::{Compression, FrameFormat, VideoFrame};
use crate::transport::{FragmentHeader, MAX_FRAME_SIZE, Reassembler, VideoRx};

// ── VideoClient ──────────────────────────────────────────────────

/// Reassembling frame receiver for one session.
///
/// Owns the session's reassembly state exclusively; receiving takes
/// `&mut self`, so a client instance is confined to one task at a time.
pub struct VideoClient {
    server_addr: SocketAddr,
    control: Option<TcpStream>,
    data: Option<UdpSocket>,
    format: Option<FrameFormat>,
    reassembler: Reassembler,
    /// Compression tag stamped on reassembled frames — whatever the
    /// codec stage downstream expects the wire to carry.
    wire_compression: Compression,
    recv_buf: Vec<u8>,
}

impl VideoClient {
    /// A client that will connect to `server_addr`. Sockets are opened
    /// during [`connect`](VideoRx::connect).
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            control: None,
            data: None,
            format: None,
            reassembler: Reassembler::new(MAX_FRAME_SIZE),
            wire_compression: Compression::Zstd,
            recv_buf: vec![0u8; FragmentHeader::SIZE + 65_535],
        }
    }

    /// Tag reassembled frames with a different wire compression (e.g.
    /// [`Compression::None`] for a sender that streams raw).
    pub fn wire_compression(mut self, compression: Compression) -> Self {
        self.wire_compression = compression;
        self
    }

    /// Hardened reassembly: count each fragment index once instead of
    /// counting arrivals. Off by default (see [`Reassembler`]).
    pub fn dedup_fragments(mut self, enable: bool) -> Self {
        self.reassembler = self.reassembler.dedup_fragments(enable);
        self
    }
}

#[async_trait]
impl VideoRx for VideoClient {
    /// Run the handshake: TCP connect, bind the UDP receive socket on
    /// `control_port + 1`, declare it (2 bytes), read the 8-byte format
    /// record. Any failure is fatal to the session.
    async fn connect(&mut self) -> Result<(), IrError> {
        let mut control = TcpStream::connect(self.server_addr).await?;

        let data_port = self
            .server_addr
            .port()
            .checked_add(1)
            .ok_or(IrError::Handshake("control port leaves no room for a data port"))?;
        let data = UdpSocket::bind(("0.0.0.0", data_port)).await?;

        control.write_all(&data_port.to_le_bytes()).await?;

        let mut format_buf = [0u8; FrameFormat::WIRE_SIZE];
        control
            .read_exact(&mut format_buf)
            .await
            .map_err(|_| IrError::Handshake("control connection closed before the format record"))?;
        let format = FrameFormat::from_wire(&format_buf)?;

        info!(
            width = format.width,
            height = format.height,
            components = format.num_components,
            bpp = format.bits_per_pixel,
            "session format negotiated"
        );
        self.format = Some(format);
        self.control = Some(control);
        self.data = Some(data);
        Ok(())
    }

    fn frame_format(&self) -> Result<FrameFormat, IrError> {
        self.format.ok_or(IrError::NotConnected)
    }

    /// Block until a complete frame has been reassembled.
    ///
    /// Loops over however many datagram reads are necessary: runt and
    /// zero-length reads are discarded, stale or out-of-range fragments
    /// are absorbed by the [`Reassembler`], and an incomplete frame is
    /// silently superseded when the next frame's fragments arrive. No
    /// timeout — if the sender stops, this waits; liveness belongs to
    /// the control channel.
    async fn recv_frame(&mut self) -> Result<VideoFrame, IrError> {
        let format = self.format.ok_or(IrError::NotConnected)?;
        let data = self.data.as_ref().ok_or(IrError::NotConnected)?;

        loop {
            let (len, _) = data.recv_from(&mut self.recv_buf).await?;
            if len == 0 {
                continue;
            }
            if len < FragmentHeader::SIZE {
                debug!(len, "runt datagram discarded");
                continue;
            }

            let header = FragmentHeader::decode(&self.recv_buf[..FragmentHeader::SIZE])?;
            let payload = &self.recv_buf[FragmentHeader::SIZE..len];
            debug!(
                frame_id = header.frame_id,
                fragment = header.fragment_index,
                of = header.fragment_count,
                offset = header.byte_offset,
                len = payload.len(),
                "fragment received"
            );

            if let Some(buffer) = self.reassembler.push(&header, payload) {
                info!(
                    frame_id = header.frame_id,
                    fragments = header.fragment_count,
                    bytes = buffer.len(),
                    "frame reassembled"
                );
                return Ok(VideoFrame {
                    buffer,
                    format,
                    compression: self.wire_compression,
                });
            }
        }
    }
}
