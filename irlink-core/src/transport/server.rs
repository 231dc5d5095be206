//! Sender side of a video session.
//!
//! The server owns the frame format, listens for exactly one viewer on
//! the TCP control port, learns the viewer's UDP receive port during the
//! handshake, and from then on fires fragments at it best-effort.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tracing::{debug, info, warn};

use crate::error::IrError;
use crate::frame::{FrameFormat, VideoFrame};
use crate::transport::{FragmentHeader, MAX_FRAGMENT_PAYLOAD, VideoTx, fragments};

// ── VideoServer ──────────────────────────────────────────────────

/// Fragmenting frame sender for one session.
///
/// Lifecycle: [`bind`](Self::bind) → [`set_frame_format`] →
/// [`await_connection`] → [`send_frame`] per produced frame.
///
/// [`set_frame_format`]: VideoTx::set_frame_format
/// [`await_connection`]: VideoTx::await_connection
/// [`send_frame`]: VideoTx::send_frame
pub struct VideoServer {
    listener: TcpListener,
    data: UdpSocket,
    control: Option<TcpStream>,
    format: Option<FrameFormat>,
    /// Handshake-recorded destination for fragment datagrams.
    client_data_addr: Option<SocketAddr>,
    /// Per-sender frame counter; wraps at `u32::MAX` (accepted).
    frame_id: u32,
    max_payload: usize,
}

impl VideoServer {
    /// Bind the control listener on `listen_addr` and open the data
    /// socket. Setup failures are fatal to the session.
    pub async fn bind(listen_addr: SocketAddr) -> Result<Self, IrError> {
        let listener = TcpListener::bind(listen_addr).await?;
        let data = UdpSocket::bind("0.0.0.0:0").await?;
        Ok(Self {
            listener,
            data,
            control: None,
            format: None,
            client_data_addr: None,
            frame_id: 0,
            max_payload: MAX_FRAGMENT_PAYLOAD,
        })
    }

    /// Override the fragment payload budget (must leave room for the
    /// header within one datagram).
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        assert!(max_payload > 0 && max_payload + FragmentHeader::SIZE <= 65_535);
        self.max_payload = max_payload;
        self
    }

    /// Address the control listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, IrError> {
        Ok(self.listener.local_addr()?)
    }
}

#[async_trait]
impl VideoTx for VideoServer {
    fn set_frame_format(&mut self, format: FrameFormat) {
        self.format = Some(format);
    }

    /// Accept one viewer and run the handshake: read the client's
    /// 2-byte UDP receive port, record client address + port as the
    /// data-channel destination, send the 8-byte format record.
    async fn await_connection(&mut self) -> Result<(), IrError> {
        let format = self.format.ok_or(IrError::NoFrameFormat)?;

        let (mut control, peer) = self.listener.accept().await?;
        debug!(%peer, "viewer connected");

        let mut port_buf = [0u8; 2];
        control.read_exact(&mut port_buf).await.map_err(|_| {
            IrError::Handshake("control connection closed before the receive port arrived")
        })?;
        let data_port = u16::from_le_bytes(port_buf);

        control.write_all(&format.to_wire()).await?;

        let dest = SocketAddr::new(peer.ip(), data_port);
        info!(%dest, "session established");
        self.client_data_addr = Some(dest);
        self.control = Some(control);
        Ok(())
    }

    /// Peek the control connection without consuming. Returns `false`
    /// once the viewer has closed its end; a quiet but open connection
    /// reads as alive.
    async fn poll_client(&mut self) -> Result<bool, IrError> {
        let control = self.control.as_mut().ok_or(IrError::NotConnected)?;

        let mut probe = [0u8; 1];
        match tokio::time::timeout(Duration::from_millis(1), control.peek(&mut probe)).await {
            Ok(Ok(0)) => Ok(false),
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => Err(e.into()),
            // Nothing readable within the probe window: assume alive.
            Err(_) => Ok(true),
        }
    }

    /// Split the frame into fragments and send each as one datagram.
    ///
    /// Fire-and-forget: a failed or short send is logged and the
    /// remaining fragments still go out. The frame counter advances
    /// regardless, so the receiver can always tell frames apart.
    async fn send_frame(&mut self, frame: &VideoFrame) -> Result<(), IrError> {
        let dest = self.client_data_addr.ok_or(IrError::NotConnected)?;

        for (header, payload) in fragments(self.frame_id, &frame.buffer, self.max_payload) {
            let mut datagram = Vec::with_capacity(FragmentHeader::SIZE + payload.len());
            datagram.extend_from_slice(&header.encode());
            datagram.extend_from_slice(payload);

            match self.data.send_to(&datagram, dest).await {
                Ok(sent) if sent < datagram.len() => {
                    warn!(
                        frame_id = header.frame_id,
                        fragment = header.fragment_index,
                        sent,
                        want = datagram.len(),
                        "short fragment send"
                    );
                }
                Ok(_) => {
                    debug!(
                        frame_id = header.frame_id,
                        fragment = header.fragment_index,
                        of = header.fragment_count,
                        len = payload.len(),
                        "fragment sent"
                    );
                }
                Err(e) => {
                    warn!(
                        frame_id = header.frame_id,
                        fragment = header.fragment_index,
                        error = %e,
                        "fragment send failed"
                    );
                }
            }
        }

        self.frame_id = self.frame_id.wrapping_add(1);
        Ok(())
    }
}
